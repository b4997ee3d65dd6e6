//! Shared orchestration context.
//!
//! Every use case works against one [`OrchestratorContext`]: the epoch
//! guard, the mutable session state behind a mutex, and the outbound
//! notification ports. State is only mutated through
//! [`OrchestratorContext::commit_if_current`], which checks the caller's
//! epoch under the same lock an interrupt takes to bump it. A result that
//! loses that race is dropped without side effects.
//!
//! Long waits (narration) select on the epoch's [`CancellationToken`]
//! instead, which is cancelled in the same step that moves the epoch on.

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::narrator::NarrationError;
use crate::ports::progress::ProgressNotifier;
use crate::ports::turn_generator::GenerationError;
use duet_domain::{
    ActivitySnapshot, AgentId, AgentRoster, AgentStatus, DiscussionHistory, DomainError, Epoch,
    EpochGuard, OrchestrationMode, TurnLimit,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors returned by orchestrator operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("Busy: {0}")]
    Busy(&'static str),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Narration failed: {0}")]
    Narration(#[from] NarrationError),

    #[error("Context is already reset")]
    AlreadyReset,

    #[error("Podcast mode needs two agents")]
    PodcastNeedsTwoAgents,

    #[error("No interrupted podcast to resume")]
    NothingToResume,
}

impl OrchestratorError {
    /// Whether the error was already reported through the error slot and
    /// [`ProgressNotifier::on_error`]
    pub fn is_surfaced(&self) -> bool {
        match self {
            OrchestratorError::Generation(_)
            | OrchestratorError::Narration(_)
            | OrchestratorError::AlreadyReset => true,
            OrchestratorError::Domain(e) => e.is_parse_error(),
            _ => false,
        }
    }
}

/// Mutable state of one session
#[derive(Debug)]
pub struct SessionState {
    pub roster: AgentRoster,
    pub history: DiscussionHistory,
    pub mode: OrchestrationMode,
    pub turn_limit: TurnLimit,
    pub podcast_enabled: bool,
    pub activity: ActivitySnapshot,
    /// A routing or script call is in flight that no single agent owns
    pub awaiting_backend: bool,
    /// The single, dismissible error slot
    pub error: Option<String>,
}

impl SessionState {
    pub fn new(roster: AgentRoster, turn_limit: TurnLimit) -> Self {
        Self {
            roster,
            history: DiscussionHistory::new(),
            mode: OrchestrationMode::Idle,
            turn_limit,
            podcast_enabled: false,
            activity: ActivitySnapshot::default(),
            awaiting_backend: false,
            error: None,
        }
    }

    /// Whether anything is generating or scheduled
    pub fn is_busy(&self) -> bool {
        self.mode.is_busy() || self.awaiting_backend || !self.activity.thinking.is_empty()
    }

    pub fn statuses(&self) -> Vec<(AgentId, AgentStatus)> {
        self.activity.project(&self.roster.ids())
    }

    /// Drop all in-flight activity markers
    pub(crate) fn clear_activity(&mut self) {
        self.activity.thinking.clear();
        self.activity.speaking = None;
        self.awaiting_backend = false;
    }
}

pub struct OrchestratorContext {
    epoch: EpochGuard,
    /// Cancelled when the epoch it was handed out for ends
    epoch_cancel: Mutex<CancellationToken>,
    state: Mutex<SessionState>,
    document_id: String,
    progress: Arc<dyn ProgressNotifier>,
    logger: Arc<dyn ConversationLogger>,
}

impl OrchestratorContext {
    pub fn new(
        state: SessionState,
        document_id: impl Into<String>,
        progress: Arc<dyn ProgressNotifier>,
        logger: Arc<dyn ConversationLogger>,
    ) -> Self {
        Self {
            epoch: EpochGuard::new(),
            epoch_cancel: Mutex::new(CancellationToken::new()),
            state: Mutex::new(state),
            document_id: document_id.into(),
            progress,
            logger,
        }
    }

    pub fn epoch(&self) -> &EpochGuard {
        &self.epoch
    }

    pub fn current_epoch(&self) -> Epoch {
        self.epoch.current()
    }

    /// Move to a new epoch and cancel the token of the old one.
    ///
    /// Interrupts call this while holding the state lock.
    pub fn advance_epoch(&self) -> Epoch {
        let mut token = self
            .epoch_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let epoch = self.epoch.bump();
        token.cancel();
        *token = CancellationToken::new();
        epoch
    }

    /// Token that fires once `epoch` is no longer current.
    ///
    /// `None` if it already isn't.
    pub fn cancellation(&self, epoch: Epoch) -> Option<CancellationToken> {
        let token = self
            .epoch_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (!self.epoch.is_stale(epoch)).then(|| token.clone())
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn progress(&self) -> &dyn ProgressNotifier {
        self.progress.as_ref()
    }

    /// Lock the session state. Never held across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` only if `epoch` is still current.
    pub fn commit_if_current<R>(
        &self,
        epoch: Epoch,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        let mut state = self.lock();
        if self.epoch.is_stale(epoch) {
            debug!(epoch = %epoch, current = %self.epoch.current(), "Dropping stale result");
            return None;
        }
        Some(f(&mut state))
    }

    /// Push the current status projection to the progress port
    pub fn notify_status(&self) {
        let statuses = self.lock().statuses();
        self.progress.on_status_change(&statuses);
    }

    /// Mark `agent` as thinking. Returns false if `epoch` is stale.
    pub fn begin_thinking(&self, epoch: Epoch, agent: AgentId) -> bool {
        let marked = self
            .commit_if_current(epoch, |s| {
                s.activity.thinking.insert(agent);
            })
            .is_some();
        if marked {
            self.notify_status();
        }
        marked
    }

    /// Put `message` in the error slot if `epoch` is still current
    pub fn surface_error(&self, epoch: Epoch, message: &str) -> bool {
        let surfaced = self
            .commit_if_current(epoch, |s| s.error = Some(message.to_string()))
            .is_some();
        if surfaced {
            self.report_error(message);
        }
        surfaced
    }

    /// End the current discussion or podcast after a failure.
    ///
    /// Work already committed (queued narration) is kept.
    pub fn fail_session(&self, epoch: Epoch, message: &str) -> bool {
        let failed = self
            .commit_if_current(epoch, |s| {
                s.mode = OrchestrationMode::Idle;
                s.activity.thinking.clear();
                s.awaiting_backend = false;
                s.error = Some(message.to_string());
            })
            .is_some();
        if failed {
            warn!(epoch = %epoch, "Session failed: {}", message);
            self.report_error(message);
            self.notify_status();
        }
        failed
    }

    /// Abandon everything stamped with `epoch` after a failure.
    ///
    /// Bumps the epoch so in-flight generation is discarded. The caller
    /// is responsible for flushing queued narration.
    pub fn abort_current(&self, epoch: Epoch, message: &str) -> bool {
        let aborted = self
            .commit_if_current(epoch, |s| {
                self.advance_epoch();
                s.mode = OrchestrationMode::Idle;
                s.clear_activity();
                s.error = Some(message.to_string());
            })
            .is_some();
        if aborted {
            warn!(epoch = %epoch, "Session aborted: {}", message);
            self.report_error(message);
            self.notify_status();
        }
        aborted
    }

    pub fn log(&self, event_type: &'static str, payload: Value) {
        self.logger.log(ConversationEvent::new(event_type, payload));
    }

    fn report_error(&self, message: &str) {
        self.progress.on_error(message);
        self.log("error", json!({ "message": message }));
    }
}
