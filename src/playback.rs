//! Playing a rendered track alongside a visual countdown.
//!
//! Audio starts first, then the configured offset elapses, then the visual
//! countdown begins. The offset absorbs the player's startup latency so the
//! spoken numbers line up with the clock.

use crate::defaults::PATH_PLACEHOLDER;
use crate::error::{Result, VoxtimerError};
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Trait for audio playback backends.
#[async_trait::async_trait]
pub trait Player: Send + Sync {
    /// Begin playing `track`. Returns as soon as playback is under way.
    async fn start(&self, track: &Path) -> Result<()>;

    /// Wait for playback started by [`Player::start`] to end.
    async fn finish(&self) -> Result<()>;
}

/// Trait for the visual side of a session.
#[async_trait::async_trait]
pub trait Countdown: Send + Sync {
    /// Count down from `total` to zero.
    async fn run(&self, total: Duration) -> Result<()>;
}

/// Start audio, wait `offset`, run the countdown, then wait for the audio.
pub async fn run_session(
    player: &dyn Player,
    countdown: &dyn Countdown,
    track: &Path,
    offset: Duration,
    total: Duration,
) -> Result<()> {
    player.start(track).await?;
    tracing::debug!("Playback started, waiting {:?} before countdown", offset);
    tokio::time::sleep(offset).await;
    countdown.run(total).await?;
    player.finish().await
}

/// Player that runs an external program such as `aplay`.
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl CommandPlayer {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
            child: Mutex::new(None),
        }
    }

    fn expand_args(&self, track: &Path) -> Vec<String> {
        let path = track.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
            .collect()
    }
}

#[async_trait::async_trait]
impl Player for CommandPlayer {
    async fn start(&self, track: &Path) -> Result<()> {
        let child = Command::new(&self.program)
            .args(self.expand_args(track))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VoxtimerError::PlayerUnavailable {
                        program: self.program.clone(),
                    }
                } else {
                    VoxtimerError::Playback {
                        message: format!("failed to start {}: {}", self.program, e),
                    }
                }
            })?;
        *self.child.lock().await = Some(child);
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };
        let status = child.wait().await?;
        if !status.success() {
            return Err(VoxtimerError::Playback {
                message: format!("{} exited with {}", self.program, status),
            });
        }
        Ok(())
    }
}

/// One-line `MM:SS` clock on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalCountdown;

/// Format whole seconds as `MM:SS`; minutes grow past two digits if needed.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn draw_clock(remaining: u64) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\r{}", format_clock(remaining))?;
    stdout.flush()
}

#[async_trait::async_trait]
impl Countdown for TerminalCountdown {
    async fn run(&self, total: Duration) -> Result<()> {
        let secs = total.as_secs();
        let started = tokio::time::Instant::now();
        for elapsed in 0..=secs {
            tokio::time::sleep_until(started + Duration::from_secs(elapsed)).await;
            draw_clock(secs - elapsed)?;
        }
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Instant;

    type Log = Arc<StdMutex<Vec<(&'static str, Instant)>>>;

    struct RecordingPlayer {
        log: Log,
        fail_start: bool,
    }

    #[async_trait::async_trait]
    impl Player for RecordingPlayer {
        async fn start(&self, _track: &Path) -> Result<()> {
            if self.fail_start {
                return Err(VoxtimerError::PlayerUnavailable {
                    program: "none".to_string(),
                });
            }
            self.log.lock().unwrap().push(("audio", Instant::now()));
            Ok(())
        }

        async fn finish(&self) -> Result<()> {
            self.log.lock().unwrap().push(("finish", Instant::now()));
            Ok(())
        }
    }

    struct RecordingCountdown {
        log: Log,
    }

    #[async_trait::async_trait]
    impl Countdown for RecordingCountdown {
        async fn run(&self, _total: Duration) -> Result<()> {
            self.log.lock().unwrap().push(("visual", Instant::now()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_audio_starts_before_offset_and_visual() {
        let log: Log = Arc::new(StdMutex::new(Vec::new()));
        let player = RecordingPlayer {
            log: log.clone(),
            fail_start: false,
        };
        let countdown = RecordingCountdown { log: log.clone() };
        let offset = Duration::from_millis(40);

        run_session(
            &player,
            &countdown,
            Path::new("timer.wav"),
            offset,
            Duration::from_secs(435),
        )
        .await
        .unwrap();

        let log = log.lock().unwrap();
        let names: Vec<&str> = log.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["audio", "visual", "finish"]);
        assert!(log[1].1.duration_since(log[0].1) >= offset);
    }

    #[tokio::test]
    async fn test_failed_audio_start_skips_countdown() {
        let log: Log = Arc::new(StdMutex::new(Vec::new()));
        let player = RecordingPlayer {
            log: log.clone(),
            fail_start: true,
        };
        let countdown = RecordingCountdown { log: log.clone() };

        let result = run_session(
            &player,
            &countdown,
            Path::new("timer.wav"),
            Duration::ZERO,
            Duration::from_secs(1),
        )
        .await;

        assert!(result.is_err());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_expand_args_substitutes_path() {
        let player = CommandPlayer::new("aplay", &["-q".to_string(), "{path}".to_string()]);
        assert_eq!(
            player.expand_args(Path::new("/tmp/timer.wav")),
            vec!["-q", "/tmp/timer.wav"]
        );
    }

    #[tokio::test]
    async fn test_missing_player_is_unavailable() {
        let player = CommandPlayer::new("voxtimer-missing-player", &[]);
        match player.start(Path::new("timer.wav")).await {
            Err(VoxtimerError::PlayerUnavailable { program }) => {
                assert_eq!(program, "voxtimer-missing-player");
            }
            other => panic!("Expected PlayerUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_command_player_reports_exit_status() {
        let ok = CommandPlayer::new("true", &[]);
        ok.start(Path::new("timer.wav")).await.unwrap();
        ok.finish().await.unwrap();

        let failing = CommandPlayer::new("false", &[]);
        failing.start(Path::new("timer.wav")).await.unwrap();
        assert!(matches!(
            failing.finish().await,
            Err(VoxtimerError::Playback { .. })
        ));
    }

    #[tokio::test]
    async fn test_finish_without_start_is_noop() {
        let player = CommandPlayer::new("true", &[]);
        assert!(player.finish().await.is_ok());
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(9), "00:09");
        assert_eq!(format_clock(415), "06:55");
        assert_eq!(format_clock(6000), "100:00");
    }

    #[tokio::test]
    async fn test_terminal_countdown_zero() {
        TerminalCountdown.run(Duration::ZERO).await.unwrap();
    }
}
