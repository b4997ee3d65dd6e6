use super::stopped;
use async_trait::async_trait;
use duet_application::{NarrationError, Narrator};
use duet_domain::AgentId;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, warn};

const TEXT_PLACEHOLDER: &str = "{text}";
const SPEAKER_PLACEHOLDER: &str = "{speaker}";

/// Narrator that runs a text-to-speech program once per line
///
/// `{text}` and `{speaker}` in the arguments are replaced by the line and
/// the agent number. Without a `{text}` argument the line is written to
/// the program's stdin instead. Playback ends when the program exits;
/// `stop()` kills it.
pub struct CommandNarrator {
    program: String,
    args: Vec<String>,
    stop: Notify,
}

impl CommandNarrator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stop: Notify::new(),
        }
    }

    fn text_in_args(&self) -> bool {
        self.args.iter().any(|a| a.contains(TEXT_PLACEHOLDER))
    }

    fn command(&self, speaker: AgentId, text: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.args.iter().map(|arg| {
                arg.replace(TEXT_PLACEHOLDER, text)
                    .replace(SPEAKER_PLACEHOLDER, &speaker.get().to_string())
            }))
            .stdin(if self.text_in_args() {
                Stdio::null()
            } else {
                Stdio::piped()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Narrator for CommandNarrator {
    async fn narrate(&self, speaker: AgentId, text: &str) -> Result<(), NarrationError> {
        if text.trim().is_empty() {
            return Err(NarrationError::EmptyAudio);
        }

        let mut child = self.command(speaker, text).spawn().map_err(|e| {
            NarrationError::Unavailable(format!("cannot run '{}': {}", self.program, e))
        })?;
        debug!(agent = %speaker, program = %self.program, "Narration process started");

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()).await {
                warn!("Could not write line to narrator: {}", e);
            }
            // Dropping stdin closes it so the program sees EOF
        }

        let stderr = child.stderr.take();
        let status = tokio::select! {
            status = child.wait() => status,
            _ = stopped(&self.stop) => {
                if let Err(e) = child.kill().await {
                    warn!("Could not kill narrator process: {}", e);
                }
                return Err(NarrationError::Stopped);
            }
        };

        let status = status.map_err(|e| NarrationError::Playback(e.to_string()))?;
        if status.success() {
            return Ok(());
        }

        let mut message = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut message).await;
        }
        let message = message.trim();
        Err(NarrationError::Playback(if message.is_empty() {
            format!("{} exited with {}", self.program, status)
        } else {
            format!("{} exited with {}: {}", self.program, status, message)
        }))
    }

    fn stop(&self) {
        self.stop.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn sh(script: &str) -> CommandNarrator {
        CommandNarrator::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_placeholders_are_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spoken.txt");
        let narrator = CommandNarrator::new(
            "sh",
            vec![
                "-c".to_string(),
                format!("printf '%s|%s' \"$0\" \"$1\" > {}", out.display()),
                "{speaker}".to_string(),
                "{text}".to_string(),
            ],
        );
        narrator.narrate(AgentId::SECOND, "Hello there").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "2|Hello there");
    }

    #[tokio::test]
    async fn test_text_goes_to_stdin_without_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("stdin.txt");
        let narrator = sh(&format!("cat > {}", out.display()));
        narrator.narrate(AgentId::FIRST, "piped line").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "piped line");
    }

    #[tokio::test]
    async fn test_failure_reports_stderr() {
        let narrator = sh("echo 'no voice' >&2; exit 3");
        let err = narrator.narrate(AgentId::FIRST, "x").await.unwrap_err();
        let NarrationError::Playback(message) = err else {
            panic!("expected playback error, got {:?}", err);
        };
        assert!(message.contains("no voice"));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let narrator = CommandNarrator::new("duet-no-such-tts-program", vec![]);
        assert!(matches!(
            narrator.narrate(AgentId::FIRST, "x").await,
            Err(NarrationError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_kills_the_process() {
        let narrator = Arc::new(sh("sleep 5"));
        let started = Instant::now();
        let task = {
            let narrator = narrator.clone();
            tokio::spawn(async move { narrator.narrate(AgentId::FIRST, "long").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        narrator.stop();
        assert_eq!(task.await.unwrap(), Err(NarrationError::Stopped));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
