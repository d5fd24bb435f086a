use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;
use voxtimer::app::{
    apply_generate_args, apply_phase_args, init_config, run_generate, run_play_command,
    run_schedule,
};
use voxtimer::cli::{Cli, Commands, ConfigAction};
use voxtimer::config::Config;
use voxtimer::diagnostics::check_dependencies;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);
    tracing::debug!("voxtimer {}", voxtimer::version_string());

    match cli.command {
        Commands::Generate(args) => {
            let mut config = load_config(cli.config.as_deref())?;
            apply_generate_args(&mut config, &args);
            run_generate(&config, args.mock, cli.quiet)?;
        }
        Commands::Schedule { phases, json } => {
            let mut config = load_config(cli.config.as_deref())?;
            apply_phase_args(&mut config, &phases);
            run_schedule(&config, json)?;
        }
        Commands::Run { generate, offset } => {
            let mut config = load_config(cli.config.as_deref())?;
            apply_generate_args(&mut config, &generate);
            run_play_command(config, generate.mock, offset, cli.quiet).await?;
        }
        Commands::Check => {
            let config = load_config(cli.config.as_deref())?;
            if !check_dependencies(&config) {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "voxtimer", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over `-q`/`-v`.
fn init_logging(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("voxtimer={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/voxtimer/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    Ok(config.with_env_overrides()?)
}

/// Handle configuration management commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&std::path::Path>) -> Result<()> {
    let path = custom_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            init_config(&path, force)?;
        }
    }
    Ok(())
}
