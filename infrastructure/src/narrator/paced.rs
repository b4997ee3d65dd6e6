use super::stopped;
use async_trait::async_trait;
use duet_application::{NarrationError, Narrator};
use duet_domain::AgentId;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::trace;

/// Narrator that only waits out the speaking time of each line
pub struct PacedNarrator {
    words_per_minute: u32,
    stop: Notify,
}

impl PacedNarrator {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            stop: Notify::new(),
        }
    }

    /// How long `text` takes to read aloud
    pub fn duration_of(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as u64;
        Duration::from_millis(words * 60_000 / u64::from(self.words_per_minute))
    }
}

#[async_trait]
impl Narrator for PacedNarrator {
    async fn narrate(&self, speaker: AgentId, text: &str) -> Result<(), NarrationError> {
        if text.trim().is_empty() {
            return Err(NarrationError::EmptyAudio);
        }
        let duration = self.duration_of(text);
        trace!(agent = %speaker, ?duration, "Pacing line");
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = stopped(&self.stop) => Err(NarrationError::Stopped),
        }
    }

    fn stop(&self) {
        self.stop.notify_waiters();
    }
}
