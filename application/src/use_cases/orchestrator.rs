//! Orchestrator facade
//!
//! The single entry point the presentation layer talks to. Every user
//! action goes through the interrupt coordinator first, then hands control
//! to the discussion scheduler, the podcast runner or a direct turn.
//!
//! `submit_prompt` runs until the work it started is done or superseded.
//! Callers that need to interrupt it (a REPL reading the next line) should
//! hold the orchestrator in an `Arc` and spawn the call.

use crate::config::OrchestratorConfig;
use crate::ports::conversation_logger::ConversationLogger;
use crate::ports::narrator::Narrator;
use crate::ports::progress::ProgressNotifier;
use crate::ports::turn_generator::{RouteRequest, TurnGenerator};
use crate::use_cases::discussion::DiscussionScheduler;
use crate::use_cases::interrupt::{InterruptCoordinator, InterruptKind, InterruptOutcome};
use crate::use_cases::narration_queue::NarrationQueue;
use crate::use_cases::podcast::PodcastRunner;
use crate::use_cases::shared::{OrchestratorContext, OrchestratorError, SessionState};
use crate::use_cases::turn::TurnRunner;
use duet_domain::{
    AgentId, AgentRoster, AgentStatus, Epoch, Message, ModelKind, OrchestrationMode, RoutePlan,
    TurnLimit,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct Orchestrator {
    ctx: Arc<OrchestratorContext>,
    runner: TurnRunner,
    interrupts: InterruptCoordinator,
    queue: Arc<NarrationQueue>,
    summary_pause: Duration,
}

impl Orchestrator {
    /// Build the orchestrator and spawn its narration consumer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: OrchestratorConfig,
        roster: AgentRoster,
        generator: Arc<dyn TurnGenerator>,
        narrator: Arc<dyn Narrator>,
        progress: Arc<dyn ProgressNotifier>,
        logger: Arc<dyn ConversationLogger>,
        shutdown: CancellationToken,
    ) -> Result<Self, OrchestratorError> {
        if config.podcast_mode && roster.len() < 2 {
            return Err(OrchestratorError::PodcastNeedsTwoAgents);
        }

        let mut state = SessionState::new(roster, config.turn_limit);
        state.podcast_enabled = config.podcast_mode;
        let ctx = Arc::new(OrchestratorContext::new(
            state,
            config.document_id,
            progress,
            logger,
        ));
        let queue = Arc::new(NarrationQueue::spawn(
            ctx.clone(),
            narrator.clone(),
            shutdown,
        ));

        Ok(Self {
            runner: TurnRunner::new(ctx.clone(), generator, queue.clone()),
            interrupts: InterruptCoordinator::new(ctx.clone(), narrator, queue.clone()),
            ctx,
            queue,
            summary_pause: config.summary_pause,
        })
    }

    // ==================== User actions ====================

    /// Handle a new user prompt.
    ///
    /// Cancels whatever was running (keeping an interrupted podcast), then
    /// answers the prompt as a podcast episode, a side answer, a discussion
    /// or direct turns.
    pub async fn submit_prompt(&self, prompt: &str) -> Result<(), OrchestratorError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(());
        }

        let epoch = self.interrupt_soft()?;
        let Some((podcast, answer_podcast, agents)) = self.ctx.commit_if_current(epoch, |s| {
            s.error = None;
            s.history.push_user(prompt);
            s.roster.broadcast(Message::user(prompt));
            let interrupted = s.mode.podcast().is_some_and(|p| p.is_interrupted());
            (s.podcast_enabled, interrupted, s.roster.ids())
        }) else {
            return Ok(());
        };

        info!(epoch = %epoch, podcast, "User prompt");
        self.ctx
            .log("user_prompt", json!({ "epoch": epoch, "text": prompt }));

        if podcast {
            let podcast = PodcastRunner::new(&self.runner);
            return if answer_podcast {
                podcast.answer_interrupt(epoch, prompt).await
            } else {
                podcast.start_episode(epoch, prompt).await
            };
        }

        if agents.len() < 2 {
            return self
                .runner
                .run_direct(epoch, vec![(AgentId::FIRST, prompt.to_string())])
                .await;
        }

        self.route(epoch, prompt, agents).await
    }

    /// Soft interrupt and show the listening status
    pub fn start_listening(&self) -> Result<(), OrchestratorError> {
        self.interrupt_soft()?;
        self.ctx.lock().activity.listening = true;
        self.ctx.notify_status();
        Ok(())
    }

    /// Leave the listening status and submit `transcript` if it has text
    pub async fn stop_listening(&self, transcript: &str) -> Result<(), OrchestratorError> {
        self.ctx.lock().activity.listening = false;
        self.ctx.notify_status();
        self.submit_prompt(transcript).await
    }

    /// Strict interrupt: stop everything and discard podcast progress
    pub fn stop(&self) {
        self.interrupts.interrupt(InterruptKind::Strict);
        self.ctx.lock().activity.listening = false;
        self.ctx.notify_status();
    }

    /// Continue an interrupted podcast without asking anything
    pub async fn resume_podcast(&self) -> Result<(), OrchestratorError> {
        if self.ctx.lock().awaiting_backend {
            return Err(OrchestratorError::Busy("a side answer is being prepared"));
        }
        let epoch = self.ctx.current_epoch();
        PodcastRunner::new(&self.runner).resume(epoch).await
    }

    // ==================== Session settings ====================

    pub fn add_agent(&self, kind: ModelKind) -> Result<AgentId, OrchestratorError> {
        self.ensure_idle()?;
        let id = self.ctx.lock().roster.add(kind)?;
        info!(agent = %id, kind = %kind, "Agent added");
        self.ctx.notify_status();
        Ok(id)
    }

    /// Remove an agent from the pair. The survivor becomes agent 1 and
    /// podcast mode is switched off.
    pub fn remove_agent(&self, id: AgentId) -> Result<(), OrchestratorError> {
        self.ensure_idle()?;
        {
            let mut state = self.ctx.lock();
            state.roster.remove(id)?;
            state.podcast_enabled = false;
            state.mode = OrchestrationMode::Idle;
        }
        info!(agent = %id, "Agent removed");
        self.ctx.notify_status();
        Ok(())
    }

    pub fn set_model(&self, id: AgentId, kind: ModelKind) -> Result<(), OrchestratorError> {
        self.ensure_idle()?;
        self.ctx.lock().roster.set_model(id, kind)?;
        info!(agent = %id, kind = %kind, "Model changed");
        Ok(())
    }

    /// Set the discussion length; returns the normalised limit
    pub fn set_turn_limit(&self, requested: u32) -> Result<TurnLimit, OrchestratorError> {
        self.ensure_idle()?;
        let limit = TurnLimit::new(requested);
        self.ctx.lock().turn_limit = limit;
        debug!(requested, turn_limit = %limit, "Turn limit set");
        Ok(limit)
    }

    pub fn set_podcast_mode(&self, enabled: bool) -> Result<(), OrchestratorError> {
        if enabled {
            let state = self.ctx.lock();
            if state.roster.len() < 2 {
                return Err(OrchestratorError::PodcastNeedsTwoAgents);
            }
            if state.is_busy() {
                return Err(OrchestratorError::Busy("finish or stop the current session first"));
            }
        } else if self.ctx.lock().mode.podcast().is_some() {
            self.interrupts.interrupt(InterruptKind::Strict);
        }
        self.ctx.lock().podcast_enabled = enabled;
        info!(enabled, "Podcast mode");
        Ok(())
    }

    /// Clear the shared history and every agent transcript
    pub fn reset_context(&self) -> Result<(), OrchestratorError> {
        self.ensure_idle()?;
        let cleared = {
            let mut state = self.ctx.lock();
            let had_context = !state.history.is_empty() || state.roster.has_messages();
            state.history.clear();
            state.roster.clear_transcripts();
            had_context
        };
        if !cleared {
            let e = OrchestratorError::AlreadyReset;
            self.ctx.surface_error(self.ctx.current_epoch(), &e.to_string());
            return Err(e);
        }
        info!("Context reset");
        self.ctx.log("context_reset", json!({}));
        Ok(())
    }

    pub fn dismiss_error(&self) {
        self.ctx.lock().error = None;
    }

    /// Stop playback and the narration consumer
    pub fn shutdown(&self) {
        self.interrupts.interrupt(InterruptKind::Strict);
        self.queue.shutdown();
    }

    // ==================== Queries ====================

    pub fn statuses(&self) -> Vec<(AgentId, AgentStatus)> {
        self.ctx.lock().statuses()
    }

    pub fn agents(&self) -> Vec<(AgentId, ModelKind)> {
        self.ctx
            .lock()
            .roster
            .agents()
            .iter()
            .map(|a| (a.id(), a.model_kind()))
            .collect()
    }

    pub fn history(&self) -> Vec<String> {
        self.ctx.lock().history.lines().to_vec()
    }

    pub fn mode_label(&self) -> String {
        self.ctx.lock().mode.to_string()
    }

    pub fn turn_limit(&self) -> TurnLimit {
        self.ctx.lock().turn_limit
    }

    pub fn podcast_enabled(&self) -> bool {
        self.ctx.lock().podcast_enabled
    }

    pub fn error(&self) -> Option<String> {
        self.ctx.lock().error.clone()
    }

    /// Whether generation, a session or narration is in progress
    pub fn is_busy(&self) -> bool {
        self.ctx.lock().is_busy() || !self.queue.is_idle()
    }

    /// Wait until all queued narration has played
    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    // ==================== Internals ====================

    fn interrupt_soft(&self) -> Result<Epoch, OrchestratorError> {
        match self.interrupts.interrupt(InterruptKind::Soft) {
            InterruptOutcome::Interrupted { epoch, .. } => Ok(epoch),
            InterruptOutcome::Deferred => Err(OrchestratorError::Busy("a side answer is playing")),
        }
    }

    fn ensure_idle(&self) -> Result<(), OrchestratorError> {
        if self.is_busy() {
            return Err(OrchestratorError::Busy("wait for the current session to finish"));
        }
        Ok(())
    }

    async fn route(
        &self,
        epoch: Epoch,
        prompt: &str,
        agents: Vec<AgentId>,
    ) -> Result<(), OrchestratorError> {
        if self
            .ctx
            .commit_if_current(epoch, |s| s.awaiting_backend = true)
            .is_none()
        {
            return Ok(());
        }
        self.ctx.notify_status();

        let request = RouteRequest {
            document_id: self.ctx.document_id().to_string(),
            prompt: prompt.to_string(),
            agents: agents.clone(),
        };
        let result = self.runner.generator().route(&request).await;

        if self
            .ctx
            .commit_if_current(epoch, |s| s.awaiting_backend = false)
            .is_none()
        {
            return Ok(());
        }
        self.ctx.notify_status();

        let decision = match result {
            Ok(decision) => decision,
            Err(e) => {
                self.ctx.fail_session(epoch, &e.to_string());
                return Err(e.into());
            }
        };

        debug!(discussion = decision.discussion_required, "Route decided");
        self.ctx.progress().on_route_decided(&decision);
        self.ctx.log(
            "route_decision",
            json!({ "epoch": epoch, "decision": decision }),
        );

        match decision.plan(prompt, &agents) {
            RoutePlan::Discussion { initiator, topic } => {
                DiscussionScheduler::new(&self.runner, self.summary_pause)
                    .start(epoch, initiator, &topic)
                    .await
            }
            RoutePlan::Individual(turns) => self.runner.run_direct(epoch, turns).await,
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.queue.shutdown();
    }
}
