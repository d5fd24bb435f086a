//! Synthesis through an external speech program such as `espeak-ng`.
//!
//! The program is described by a name and an argument template. The
//! placeholders `{rate}`, `{text}` and `{output}` are substituted per call.
//! With `{output}` present the program writes a WAV file to a temporary
//! path; otherwise WAV data is read from its stdout.

use crate::audio::wav::decode_clip;
use crate::defaults::{OUTPUT_PLACEHOLDER, RATE_PLACEHOLDER, SAMPLE_RATE, TEXT_PLACEHOLDER};
use crate::error::{Result, VoxtimerError};
use crate::tts::synthesizer::{Clip, Synthesizer};
use std::path::Path;
use std::process::{Command, Stdio};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Trait for running external programs.
///
/// Object-safe, Send + Sync so a synthesizer can be shared by workers.
/// Enables testing without a speech engine installed.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// Production runner using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Synthesizer backed by an external program.
pub struct CommandSynthesizer<R: CommandRunner = SystemCommandRunner> {
    runner: R,
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer<SystemCommandRunner> {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self::with_runner(SystemCommandRunner, program, args)
    }
}

impl<R: CommandRunner> CommandSynthesizer<R> {
    pub fn with_runner(runner: R, program: &str, args: &[String]) -> Self {
        Self {
            runner,
            program: program.to_string(),
            args: args.to_vec(),
        }
    }

    fn expand_args(&self, text: &str, rate: u32, output: Option<&Path>) -> Vec<String> {
        let rate = rate.to_string();
        let output = output
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        // Text last, so announcement text is never re-expanded.
        self.args
            .iter()
            .map(|arg| {
                arg.replace(RATE_PLACEHOLDER, &rate)
                    .replace(OUTPUT_PLACEHOLDER, &output)
                    .replace(TEXT_PLACEHOLDER, text)
            })
            .collect()
    }

    fn writes_file(&self) -> bool {
        self.args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER))
    }

    fn failure(&self, text: &str, message: String) -> VoxtimerError {
        VoxtimerError::Synthesis {
            text: text.to_string(),
            message,
        }
    }
}

impl<R: CommandRunner> Synthesizer for CommandSynthesizer<R> {
    fn synthesize(&self, text: &str, rate: u32) -> Result<Clip> {
        let out_file = if self.writes_file() {
            Some(
                tempfile::Builder::new()
                    .prefix("voxtimer-tts-")
                    .suffix(".wav")
                    .tempfile()?,
            )
        } else {
            None
        };
        let args = self.expand_args(text, rate, out_file.as_ref().map(|f| f.path()));
        tracing::trace!("Running {} {:?}", self.program, args);

        let output = self.runner.run(&self.program, &args).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoxtimerError::SynthesisUnavailable {
                    program: self.program.clone(),
                }
            } else {
                self.failure(text, format!("failed to run {}: {}", self.program, e))
            }
        })?;

        if !output.success {
            return Err(self.failure(
                text,
                format!(
                    "{} exited unsuccessfully: {}",
                    self.program,
                    output.stderr.trim()
                ),
            ));
        }

        let bytes = match &out_file {
            Some(file) => std::fs::read(file.path())?,
            None => output.stdout,
        };
        if bytes.is_empty() {
            return Err(self.failure(text, format!("{} produced no audio", self.program)));
        }

        let clip = decode_clip(&bytes).map_err(|e| self.failure(text, e.to_string()))?;
        Ok(clip.resampled_to(SAMPLE_RATE))
    }

    fn name(&self) -> &str {
        &self.program
    }

    fn is_ready(&self) -> bool {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }
}
