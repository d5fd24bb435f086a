//! Command-line interface for voxtimer
//!
//! Provides argument parsing using clap derive macros.

use crate::config::parse_duration_secs;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Pre-rendered spoken countdown tracks
#[derive(Parser, Debug)]
#[command(name = "voxtimer", version, about = "Pre-rendered spoken countdown tracks")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: progress, -vv: per-announcement detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Phase durations shared by commands that build a schedule.
#[derive(Args, Debug, Clone, Default)]
pub struct PhaseArgs {
    /// Preparation phase length. Examples: 20, 20s, 1m
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_secs)]
    pub prep: Option<u64>,

    /// Main phase length. Examples: 415, 6m55s, 10m
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_secs)]
    pub main: Option<u64>,
}

/// Options for rendering a track.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub phases: PhaseArgs,

    /// Output WAV file (default: timer.wav)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Use the built-in tone synthesizer instead of the speech program
    #[arg(long)]
    pub mock: bool,

    /// Leave failed announcements silent instead of aborting
    #[arg(long)]
    pub best_effort: bool,

    /// Number of synthesis workers (default: one per core, up to 4)
    #[arg(long, short = 'j', value_name = "N")]
    pub workers: Option<usize>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the countdown track to a WAV file
    ///
    /// The track ends exactly when the main phase does, so the closing
    /// "Finished" has no room to play. Set `tail_seconds` under `[compose]`
    /// in the config to append silence for it.
    Generate(GenerateArgs),

    /// Print the announcements of both phases
    Schedule {
        #[command(flatten)]
        phases: PhaseArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the track, then play it with a terminal clock
    Run {
        #[command(flatten)]
        generate: GenerateArgs,

        /// Seconds between starting audio and starting the clock (default: from config)
        #[arg(long, value_name = "SECONDS")]
        offset: Option<f64>,
    },

    /// Check speech and playback dependencies
    Check,

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
