//! Command implementations behind the `voxtimer` binary.
//!
//! Wires config, synthesizer, composer and player together and renders
//! results for the terminal.

use crate::cli::{GenerateArgs, PhaseArgs};
use crate::compose::{Composer, GenerationReport, Phase, merge_phases};
use crate::config::Config;
use crate::error::{Result, VoxtimerError};
use crate::playback::{CommandPlayer, TerminalCountdown, format_clock, run_session};
use crate::tts::{CommandSynthesizer, MockSynthesizer, Synthesizer};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

/// Apply `--prep` / `--main` over the loaded configuration.
pub fn apply_phase_args(config: &mut Config, phases: &PhaseArgs) {
    if let Some(prep) = phases.prep {
        config.prep_duration = prep;
    }
    if let Some(main) = phases.main {
        config.main_duration = main;
    }
}

/// Apply generation flags over the loaded configuration.
pub fn apply_generate_args(config: &mut Config, args: &GenerateArgs) {
    apply_phase_args(config, &args.phases);
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if args.best_effort {
        config.compose.best_effort = true;
    }
    if let Some(workers) = args.workers {
        config.compose.workers = Some(workers);
    }
}

fn synthesizer_for(config: &Config, mock: bool) -> Result<Box<dyn Synthesizer>> {
    if mock {
        return Ok(Box::new(MockSynthesizer::new()));
    }
    let synthesizer = CommandSynthesizer::new(&config.tts.program, &config.tts.args);
    if !synthesizer.is_ready() {
        return Err(VoxtimerError::SynthesisUnavailable {
            program: config.tts.program.clone(),
        });
    }
    Ok(Box::new(synthesizer))
}

/// Render the track described by `config`.
pub fn run_generate(config: &Config, mock: bool, quiet: bool) -> Result<GenerationReport> {
    config.validate()?;
    let (prep, main) = config.phase_plans()?;
    let synthesizer = synthesizer_for(config, mock)?;

    if !quiet {
        eprintln!(
            "Rendering {} + {} with {}...",
            format_clock(config.prep_duration),
            format_clock(config.main_duration),
            synthesizer.name()
        );
    }

    let report = Composer::new(synthesizer.as_ref(), config.compose_options()).generate(
        &prep,
        &main,
        &config.output,
    )?;

    if !quiet {
        print_report(&report);
    }
    Ok(report)
}

fn print_report(report: &GenerationReport) {
    println!(
        "{} {} ({} samples, {:.1}s, {} announcements)",
        "✓".green(),
        report.path.display().bold(),
        report.total_samples,
        report.duration().as_secs_f64(),
        report.placed.len()
    );
    for diagnostic in &report.diagnostics {
        let marker = if diagnostic.is_expected() {
            "note:".dimmed().to_string()
        } else {
            "warning:".yellow().to_string()
        };
        println!("  {} {}", marker, diagnostic);
    }
}

/// Print the merged announcement timeline of both phases.
pub fn run_schedule(config: &Config, json: bool) -> Result<()> {
    config.validate()?;
    let (prep, main) = config.phase_plans()?;
    let (timeline, diagnostics) = merge_phases(&prep, &main);

    if json {
        let out = serde_json::json!({
            "prep_duration": config.prep_duration,
            "main_duration": config.main_duration,
            "announcements": timeline,
            "diagnostics": diagnostics,
        });
        let rendered = serde_json::to_string_pretty(&out)
            .map_err(|e| VoxtimerError::Internal(format!("Failed to render JSON: {}", e)))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!(
        "{:>7}  {:<5} {:>9}  {}",
        "at".bold(),
        "phase".bold(),
        "remaining".bold(),
        "text".bold()
    );
    for item in &timeline {
        let phase = match item.phase {
            Phase::Prep => item.phase.to_string().cyan().to_string(),
            Phase::Main => item.phase.to_string().magenta().to_string(),
        };
        println!(
            "{:>7}  {:<5} {:>9}  {}",
            format_clock(item.at_seconds),
            phase,
            format_clock(item.announcement.remaining_seconds),
            item.announcement.text
        );
    }
    for diagnostic in &diagnostics {
        println!("{} {}", "note:".dimmed(), diagnostic);
    }
    Ok(())
}

/// Render the track, then play it next to a terminal clock.
pub async fn run_play_command(
    config: Config,
    mock: bool,
    offset: Option<f64>,
    quiet: bool,
) -> Result<()> {
    let mut config = config;
    if let Some(offset) = offset {
        config.audio_offset = offset;
    }
    config.validate()?;

    let render_config = config.clone();
    let report = tokio::task::spawn_blocking(move || run_generate(&render_config, mock, quiet))
        .await
        .map_err(|e| VoxtimerError::Internal(format!("Rendering task failed: {}", e)))??;

    let player = CommandPlayer::new(&config.playback.program, &config.playback.args);
    let total = Duration::from_secs(config.prep_duration + config.main_duration);
    play(&player, &report.path, config.audio_offset(), total).await
}

async fn play(player: &CommandPlayer, track: &Path, offset: Duration, total: Duration) -> Result<()> {
    tracing::info!("Playing {} with a {:?} offset", track.display(), offset);
    run_session(player, &TerminalCountdown, track, offset, total).await
}

/// Write the default configuration to `path`.
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(VoxtimerError::invalid_value(
            "config",
            format!("{} already exists (use --force to overwrite)", path.display()),
        ));
    }
    Config::default().save(path)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}
