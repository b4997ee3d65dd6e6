//! Progress notification port
//!
//! Defines the interface for reporting orchestration progress.

use duet_domain::{AgentId, AgentStatus, Message, NarrationItem, PlaybackStep, PodcastScript, RouteDecision};

/// Callback for progress updates during a session
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, web UI, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called whenever any agent's status may have changed
    fn on_status_change(&self, statuses: &[(AgentId, AgentStatus)]);

    /// Called when an agent's turn has been committed
    fn on_turn_committed(&self, speaker: AgentId, message: &Message);

    /// Called when a surfaced error replaces the current one
    fn on_error(&self, message: &str);

    fn on_route_decided(&self, _decision: &RouteDecision) {}

    fn on_narration_start(&self, _item: &NarrationItem) {}

    fn on_narration_end(&self, _speaker: AgentId) {}

    fn on_discussion_start(&self, _initiator: AgentId, _turn_limit: u32) {}

    fn on_discussion_finished(&self) {}

    // ==================== Podcast Callbacks ====================

    fn on_podcast_loaded(&self, _script: &PodcastScript) {}

    fn on_side_script_loaded(&self, _script: &PodcastScript, _resume_at: usize) {}

    fn on_podcast_line(&self, _step: &PlaybackStep) {}

    fn on_podcast_resumed(&self, _cursor: usize) {}

    fn on_podcast_finished(&self) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_status_change(&self, _statuses: &[(AgentId, AgentStatus)]) {}
    fn on_turn_committed(&self, _speaker: AgentId, _message: &Message) {}
    fn on_error(&self, _message: &str) {}
}
