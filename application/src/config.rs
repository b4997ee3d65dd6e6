//! Application-level configuration.
//!
//! Controls how the orchestration use cases behave for a session: which
//! document the agents talk about, how long discussions run, and whether
//! prompts produce podcast episodes.

use duet_domain::TurnLimit;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Id of the document every generation call refers to.
    pub document_id: String,
    /// Total turns of a discussion including the summary.
    pub turn_limit: TurnLimit,
    /// Pause before the summary turn is generated.
    pub summary_pause: Duration,
    /// Start in podcast mode (needs two agents).
    pub podcast_mode: bool,
}

impl OrchestratorConfig {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            turn_limit: TurnLimit::default(),
            summary_pause: Duration::ZERO,
            podcast_mode: false,
        }
    }

    pub fn with_turn_limit(mut self, limit: u32) -> Self {
        self.turn_limit = TurnLimit::new(limit);
        self
    }

    pub fn with_summary_pause_ms(mut self, millis: u64) -> Self {
        self.summary_pause = Duration::from_millis(millis);
        self
    }

    pub fn with_podcast_mode(mut self, enabled: bool) -> Self {
        self.podcast_mode = enabled;
        self
    }
}
