use crate::compose::{ComposeOptions, PhasePlan};
use crate::defaults::{
    MAIN_DURATION_SECS, MAX_TRACK_SECONDS, OUTPUT_FILE, PLAYER_ARGS, PLAYER_PROGRAM,
    PREP_DURATION_SECS, TEXT_PLACEHOLDER, TTS_ARGS, TTS_PROGRAM, TTS_RATE_COUNTDOWN,
    TTS_RATE_NORMAL, worker_count,
};
use crate::error::{Result, VoxtimerError};
use crate::schedule::{OverrideEntry, StageSchedule};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Preparation phase length in seconds. Accepts `20` or `"20s"`.
    #[serde(with = "duration_secs")]
    pub prep_duration: u64,
    /// Main phase length in seconds. Accepts `415` or `"6m55s"`.
    #[serde(with = "duration_secs")]
    pub main_duration: u64,
    /// Seconds between starting the audio and starting the visual countdown.
    pub audio_offset: f64,
    pub output: PathBuf,
    pub tts: TtsConfig,
    pub compose: ComposeConfig,
    pub prep: PhaseConfig,
    pub main: PhaseConfig,
    pub playback: PlaybackConfig,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    pub rate_normal: u32,
    pub rate_countdown: u32,
    pub program: String,
    /// Argument template; `{rate}`, `{text}` and `{output}` are substituted.
    pub args: Vec<String>,
}

/// Composition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ComposeConfig {
    /// Synthesis worker threads. Unset means one per core, up to four.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    pub best_effort: bool,
    pub tail_seconds: u64,
}

/// Announcement plan of one phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PhaseConfig {
    pub stages: StageSchedule,
    /// Explicit announcements replacing the generated schedule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Vec<OverrideEntry>>,
}

/// Audio player configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    pub program: String,
    /// Argument template; `{path}` is replaced with the track path.
    pub args: Vec<String>,
}

fn to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prep_duration: PREP_DURATION_SECS,
            main_duration: MAIN_DURATION_SECS,
            audio_offset: 0.0,
            output: PathBuf::from(OUTPUT_FILE),
            tts: TtsConfig::default(),
            compose: ComposeConfig::default(),
            prep: PhaseConfig::default(),
            main: PhaseConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            rate_normal: TTS_RATE_NORMAL,
            rate_countdown: TTS_RATE_COUNTDOWN,
            program: TTS_PROGRAM.to_string(),
            args: to_strings(TTS_ARGS),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            program: PLAYER_PROGRAM.to_string(),
            args: to_strings(PLAYER_ARGS),
        }
    }
}

impl PhaseConfig {
    fn plan(&self, duration_seconds: u64) -> Result<PhasePlan> {
        match &self.overrides {
            Some(entries) => PhasePlan::from_overrides(entries, duration_seconds),
            None => Ok(PhasePlan::from_schedule(&self.stages, duration_seconds)),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values. Stage lists are validated while
    /// parsing.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoxtimerError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                VoxtimerError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if it doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(VoxtimerError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXTIMER_PREP → prep_duration
    /// - VOXTIMER_MAIN → main_duration
    /// - VOXTIMER_TTS_PROGRAM → tts.program
    /// - VOXTIMER_OUTPUT → output
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(prep) = env_value("VOXTIMER_PREP") {
            self.prep_duration = parse_duration_secs(&prep)
                .map_err(|e| VoxtimerError::invalid_value("VOXTIMER_PREP", e))?;
        }

        if let Some(main) = env_value("VOXTIMER_MAIN") {
            self.main_duration = parse_duration_secs(&main)
                .map_err(|e| VoxtimerError::invalid_value("VOXTIMER_MAIN", e))?;
        }

        if let Some(program) = env_value("VOXTIMER_TTS_PROGRAM") {
            self.tts.program = program;
        }

        if let Some(output) = env_value("VOXTIMER_OUTPUT") {
            self.output = PathBuf::from(output);
        }

        Ok(self)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxtimer/config.toml on Linux, or a path relative
    /// to the working directory when no config directory is known.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxtimer")
            .join("config.toml")
    }

    /// Check values that can't be checked while parsing.
    pub fn validate(&self) -> Result<()> {
        if self.prep_duration == 0 {
            return Err(VoxtimerError::invalid_value(
                "prep_duration",
                "must be greater than 0",
            ));
        }
        if self.main_duration == 0 {
            return Err(VoxtimerError::invalid_value(
                "main_duration",
                "must be greater than 0",
            ));
        }
        let total = self
            .prep_duration
            .saturating_add(self.main_duration)
            .saturating_add(self.compose.tail_seconds);
        if total > MAX_TRACK_SECONDS {
            return Err(VoxtimerError::invalid_value(
                "main_duration",
                format!(
                    "track of {}s is longer than the {}s limit",
                    total, MAX_TRACK_SECONDS
                ),
            ));
        }
        if !self.audio_offset.is_finite() || self.audio_offset < 0.0 {
            return Err(VoxtimerError::invalid_value(
                "audio_offset",
                format!("{} is not a non-negative number of seconds", self.audio_offset),
            ));
        }
        if self.tts.rate_normal == 0 {
            return Err(VoxtimerError::invalid_value(
                "tts.rate_normal",
                "must be greater than 0",
            ));
        }
        if self.tts.rate_countdown == 0 {
            return Err(VoxtimerError::invalid_value(
                "tts.rate_countdown",
                "must be greater than 0",
            ));
        }
        if self.tts.program.trim().is_empty() {
            return Err(VoxtimerError::invalid_value(
                "tts.program",
                "must not be empty",
            ));
        }
        if !self.tts.args.iter().any(|a| a.contains(TEXT_PLACEHOLDER)) {
            return Err(VoxtimerError::invalid_value(
                "tts.args",
                format!("must contain {}", TEXT_PLACEHOLDER),
            ));
        }
        if self.compose.workers == Some(0) {
            return Err(VoxtimerError::invalid_value(
                "compose.workers",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Announcement plans for the prep and main phases.
    pub fn phase_plans(&self) -> Result<(PhasePlan, PhasePlan)> {
        Ok((
            self.prep.plan(self.prep_duration)?,
            self.main.plan(self.main_duration)?,
        ))
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            rate_normal: self.tts.rate_normal,
            rate_countdown: self.tts.rate_countdown,
            workers: self.compose.workers.unwrap_or_else(worker_count),
            best_effort: self.compose.best_effort,
            tail_seconds: self.compose.tail_seconds,
        }
    }

    /// Delay between audio start and visual start.
    pub fn audio_offset(&self) -> Duration {
        Duration::try_from_secs_f64(self.audio_offset).unwrap_or(Duration::ZERO)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| VoxtimerError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Write the configuration, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse a duration string into whole seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`, `2h`), and compound (`6m55s`, `1h 30m`).
pub fn parse_duration_secs(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    let duration = humantime::parse_duration(s).map_err(|e| format!("'{}': {}", s, e))?;
    if duration.subsec_nanos() != 0 {
        return Err(format!("'{}' is not a whole number of seconds", s));
    }
    Ok(duration.as_secs())
}

/// Serde adapter for second counts written as integers or humantime strings.
mod duration_secs {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(secs: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = humantime::format_duration(Duration::from_secs(*secs)).to_string();
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(SecsVisitor)
    }

    struct SecsVisitor;

    impl Visitor<'_> for SecsVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number of seconds or a duration such as \"6m55s\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("duration {} is negative", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            super::parse_duration_secs(v).map_err(E::custom)
        }
    }
}
