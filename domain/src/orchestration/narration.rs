//! Narration items queued for playback

use crate::agent::entities::AgentId;
use crate::orchestration::epoch::Epoch;
use serde::Serialize;

/// A committed turn waiting to be narrated (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrationItem {
    pub speaker: AgentId,
    pub text: String,
    pub epoch: Epoch,
    /// Whether this item carries a discussion's final summary
    pub is_final_summary: bool,
}

impl NarrationItem {
    pub fn new(speaker: AgentId, text: impl Into<String>, epoch: Epoch) -> Self {
        Self {
            speaker,
            text: text.into(),
            epoch,
            is_final_summary: false,
        }
    }

    pub fn summary(speaker: AgentId, text: impl Into<String>, epoch: Epoch) -> Self {
        Self {
            is_final_summary: true,
            ..Self::new(speaker, text, epoch)
        }
    }
}
