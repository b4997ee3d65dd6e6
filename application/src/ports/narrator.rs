//! Narrator port
//!
//! Turns text into audio for one speaker and resolves when playback ends.

use async_trait::async_trait;
use duet_domain::AgentId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrationError {
    /// Playback was cut short by [`Narrator::stop`]. Never shown to users.
    #[error("Narration stopped")]
    Stopped,

    #[error("Narrator produced no audio")]
    EmptyAudio,

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Narrator unavailable: {0}")]
    Unavailable(String),
}

impl NarrationError {
    pub fn is_stopped(&self) -> bool {
        matches!(self, NarrationError::Stopped)
    }
}

/// A single audio channel.
///
/// Callers never issue a second `narrate` before the first resolves.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Narrate `text` in `speaker`'s voice, resolving once playback ends.
    async fn narrate(&self, speaker: AgentId, text: &str) -> Result<(), NarrationError>;

    /// Stop current playback. A pending `narrate` resolves with
    /// [`NarrationError::Stopped`]; stopping an idle narrator is a no-op.
    fn stop(&self);
}
