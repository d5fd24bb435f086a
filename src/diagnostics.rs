//! System diagnostics and dependency checking.
//!
//! Verifies that the speech and playback programs are installed and that
//! the countdown rate is fast enough for one-second slots.

use crate::config::Config;
use crate::defaults::{COUNTDOWN_SLOT_SAMPLES, SAMPLE_RATE};
use crate::tts::{CommandSynthesizer, Synthesizer};
use owo_colors::OwoColorize;
use std::process::Command;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working
    Ok,
    /// Tool is not found
    NotFound,
    /// Tool is found but has issues
    Warning(String),
}

/// Check if a command exists and is executable.
fn check_command(command: &str) -> CheckResult {
    match Command::new(command).arg("--version").output() {
        Ok(output) if output.status.success() => CheckResult::Ok,
        Ok(_) => CheckResult::Warning(format!("'{}' found but --version failed", command)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Error checking '{}': {}", command, e)),
    }
}

/// Synthesize every countdown token up to ten and check each fits in a second.
pub fn check_countdown_fit(synthesizer: &dyn Synthesizer, rate: u32) -> CheckResult {
    let mut slowest = (String::new(), 0usize);
    for n in 1..=10u32 {
        let text = n.to_string();
        match synthesizer.synthesize(&text, rate) {
            Ok(clip) if clip.is_empty() => {
                return CheckResult::Warning(format!("'{}' produced no audio", text));
            }
            Ok(clip) => {
                let len = clip.resampled_to(SAMPLE_RATE).len();
                if len > slowest.1 {
                    slowest = (text, len);
                }
            }
            Err(e) => return CheckResult::Warning(e.to_string()),
        }
    }
    if slowest.1 >= COUNTDOWN_SLOT_SAMPLES {
        CheckResult::Warning(format!(
            "'{}' takes {}ms at rate {}, raise tts.rate_countdown",
            slowest.0,
            slowest.1 * 1000 / COUNTDOWN_SLOT_SAMPLES,
            rate
        ))
    } else {
        CheckResult::Ok
    }
}

fn print_result(result: &CheckResult, hint: &str) {
    match result {
        CheckResult::Ok => println!("{}", "✓ OK".green()),
        CheckResult::NotFound => {
            println!("{}", "✗ NOT FOUND".red());
            if !hint.is_empty() {
                println!("  {}", hint);
            }
        }
        CheckResult::Warning(msg) => println!("{} {}", "⚠ WARNING:".yellow(), msg),
    }
}

/// Run all dependency checks and print results.
///
/// Returns true when a track can be generated and played.
pub fn check_dependencies(config: &Config) -> bool {
    println!("Checking system dependencies...\n");

    print!("{} (speech): ", config.tts.program);
    let tts = check_command(&config.tts.program);
    print_result(
        &tts,
        "Install: sudo apt install espeak-ng  (Debian/Ubuntu)\n           sudo pacman -S espeak-ng    (Arch)",
    );

    print!("{} (playback): ", config.playback.program);
    let player = check_command(&config.playback.program);
    print_result(
        &player,
        "Install: sudo apt install alsa-utils  (Debian/Ubuntu)\n           sudo pacman -S alsa-utils    (Arch)",
    );

    let mut fits = CheckResult::NotFound;
    if tts == CheckResult::Ok {
        print!("countdown at rate {}: ", config.tts.rate_countdown);
        let synthesizer = CommandSynthesizer::new(&config.tts.program, &config.tts.args);
        fits = check_countdown_fit(&synthesizer, config.tts.rate_countdown);
        print_result(&fits, "");
    }

    println!();
    let ready = fits == CheckResult::Ok && player == CheckResult::Ok;
    if ready {
        println!("{}", "All dependencies satisfied.".green());
    } else {
        println!("{}", "Some dependencies are missing or misconfigured.".yellow());
    }
    ready
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::MockSynthesizer;
    use std::time::Duration;

    #[test]
    fn test_check_command_missing() {
        assert_eq!(
            check_command("voxtimer-nonexistent-tool-12345"),
            CheckResult::NotFound
        );
    }

    #[test]
    fn test_countdown_fit_with_fast_synthesizer() {
        let synth = MockSynthesizer::new();
        assert_eq!(check_countdown_fit(&synth, 250), CheckResult::Ok);
        assert_eq!(synth.calls(), 10);
    }

    #[test]
    fn test_countdown_fit_with_slow_synthesizer() {
        let synth = MockSynthesizer::new().with_duration(Duration::from_millis(1200));
        match check_countdown_fit(&synth, 250) {
            CheckResult::Warning(msg) => {
                assert!(msg.contains("1200ms"), "got: {}", msg);
                assert!(msg.contains("rate 250"));
            }
            other => panic!("Expected Warning, got {:?}", other),
        }
    }

    #[test]
    fn test_countdown_fit_reports_failure() {
        let synth = MockSynthesizer::new().failing_on("7");
        assert!(matches!(
            check_countdown_fit(&synth, 250),
            CheckResult::Warning(msg) if msg.contains("'7'")
        ));
    }

    #[test]
    fn test_countdown_fit_reports_empty_clip() {
        let synth = MockSynthesizer::new().with_empty_output();
        assert!(matches!(
            check_countdown_fit(&synth, 250),
            CheckResult::Warning(msg) if msg.contains("no audio")
        ));
    }
}
