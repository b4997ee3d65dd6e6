//! Scripted port implementations shared by the use case tests.

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::narrator::{NarrationError, Narrator};
use crate::ports::progress::ProgressNotifier;
use crate::ports::turn_generator::{
    GenerationError, RouteRequest, TurnGenerator, TurnRequest, TurnResponse,
};
use crate::use_cases::interrupt::{InterruptCoordinator, InterruptKind};
use crate::use_cases::shared::{OrchestratorContext, SessionState};
use async_trait::async_trait;
use duet_domain::{
    AgentId, AgentRoster, AgentStatus, Message, ModelKind, NarrationItem, RouteDecision,
    TurnLimit,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::{Notify, Semaphore, watch};

pub(crate) fn test_context() -> OrchestratorContext {
    context_with(single_roster(), Arc::new(RecordingProgress::default()))
}

pub(crate) fn pair_context() -> OrchestratorContext {
    context_with(pair_roster(), Arc::new(RecordingProgress::default()))
}

pub(crate) fn single_roster() -> AgentRoster {
    AgentRoster::new(ModelKind::Critical)
}

pub(crate) fn pair_roster() -> AgentRoster {
    AgentRoster::from_kinds(&[ModelKind::Critical, ModelKind::Creative]).unwrap()
}

pub(crate) fn context_with(
    roster: AgentRoster,
    progress: Arc<dyn ProgressNotifier>,
) -> OrchestratorContext {
    OrchestratorContext::new(
        SessionState::new(roster, TurnLimit::default()),
        "doc-1",
        progress,
        Arc::new(RecordingLogger::default()),
    )
}

// ==================== Narrator ====================

/// Narrator that records every call.
///
/// `instant` narrators finish immediately; `gated` ones hold each narration
/// until [`ScriptedNarrator::release`] hands out a permit or `stop` is
/// called.
pub(crate) struct ScriptedNarrator {
    gate: Option<Semaphore>,
    stop_signal: Notify,
    fail_on: Option<String>,
    started: Mutex<Vec<(AgentId, String)>>,
    completed: Mutex<Vec<(AgentId, String)>>,
    started_count: watch::Sender<usize>,
}

impl ScriptedNarrator {
    pub fn instant() -> Self {
        Self::build(None)
    }

    pub fn gated() -> Self {
        Self::build(Some(Semaphore::new(0)))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        Self {
            gate,
            stop_signal: Notify::new(),
            fail_on: None,
            started: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            started_count: watch::channel(0).0,
        }
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub async fn wait_started(&self, count: usize) {
        let mut rx = self.started_count.subscribe();
        rx.wait_for(|n| *n >= count).await.unwrap();
    }

    pub fn started_texts(&self) -> Vec<String> {
        self.started.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn started_speakers(&self) -> Vec<AgentId> {
        self.started.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    pub fn completed_texts(&self) -> Vec<String> {
        self.completed.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl Narrator for ScriptedNarrator {
    async fn narrate(&self, speaker: AgentId, text: &str) -> Result<(), NarrationError> {
        let stopped = self.stop_signal.notified();
        tokio::pin!(stopped);
        stopped.as_mut().enable();

        self.started.lock().unwrap().push((speaker, text.to_string()));
        self.started_count.send_modify(|n| *n += 1);

        if self.fail_on.as_deref() == Some(text) {
            return Err(NarrationError::Playback("device unplugged".to_string()));
        }

        match &self.gate {
            None => tokio::task::yield_now().await,
            Some(gate) => {
                tokio::select! {
                    permit = gate.acquire() => permit.unwrap().forget(),
                    _ = &mut stopped => return Err(NarrationError::Stopped),
                }
            }
        }

        self.completed.lock().unwrap().push((speaker, text.to_string()));
        Ok(())
    }

    fn stop(&self) {
        self.stop_signal.notify_waiters();
    }
}

// ==================== Generator ====================

/// Generator answering from canned queues.
///
/// Empty queues fall back to a direct route to agent 1 and a numbered
/// reply. A gated generator holds every `generate` call until
/// [`ScriptedGenerator::release`].
pub(crate) struct ScriptedGenerator {
    routes: Mutex<VecDeque<Result<RouteDecision, GenerationError>>>,
    turns: Mutex<VecDeque<Result<TurnResponse, GenerationError>>>,
    requests: Mutex<Vec<TurnRequest>>,
    gate: Option<Semaphore>,
    calls: watch::Sender<usize>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn gated() -> Self {
        Self::build(Some(Semaphore::new(0)))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        Self {
            routes: Mutex::new(VecDeque::new()),
            turns: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate,
            calls: watch::channel(0).0,
        }
    }

    pub fn with_route(self, route: Result<RouteDecision, GenerationError>) -> Self {
        self.routes.lock().unwrap().push_back(route);
        self
    }

    pub fn with_turn(self, turn: Result<TurnResponse, GenerationError>) -> Self {
        self.turns.lock().unwrap().push_back(turn);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.with_turn(Ok(TurnResponse::turn(text, None)))
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub async fn wait_calls(&self, count: usize) {
        let mut rx = self.calls.subscribe();
        rx.wait_for(|n| *n >= count).await.unwrap();
    }

    pub fn requests(&self) -> Vec<TurnRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TurnGenerator for ScriptedGenerator {
    async fn route(&self, request: &RouteRequest) -> Result<RouteDecision, GenerationError> {
        self.routes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RouteDecision::direct(AgentId::FIRST, request.prompt.clone())))
    }

    async fn generate(&self, request: &TurnRequest) -> Result<TurnResponse, GenerationError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        self.calls.send_replace(call);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let canned = self.turns.lock().unwrap().pop_front();
        canned.unwrap_or_else(|| {
            Ok(TurnResponse::turn(
                format!("reply {} from {}", call, request.speaker),
                None,
            ))
        })
    }
}

// ==================== Progress / Logger ====================

#[derive(Default)]
pub(crate) struct RecordingProgress {
    pub errors: Mutex<Vec<String>>,
    pub committed: Mutex<Vec<(AgentId, Message)>>,
    pub statuses: Mutex<Vec<Vec<(AgentId, AgentStatus)>>>,
}

impl ProgressNotifier for RecordingProgress {
    fn on_status_change(&self, statuses: &[(AgentId, AgentStatus)]) {
        self.statuses.lock().unwrap().push(statuses.to_vec());
    }

    fn on_turn_committed(&self, speaker: AgentId, message: &Message) {
        self.committed.lock().unwrap().push((speaker, message.clone()));
    }

    fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub(crate) struct RecordingLogger {
    pub events: Mutex<Vec<&'static str>>,
}

impl ConversationLogger for RecordingLogger {
    fn log(&self, event: ConversationEvent) {
        self.events.lock().unwrap().push(event.event_type);
    }
}

/// When [`InterruptOnNarration`] fires
pub(crate) enum NarrationTrigger {
    /// As soon as the queue announces a line, before playback
    Start,
    /// Right after the n-th line (1-based) finished playing
    End(usize),
}

/// Progress hook that soft-interrupts from inside the narration consumer
pub(crate) struct InterruptOnNarration {
    trigger: NarrationTrigger,
    ended: AtomicUsize,
    coordinator: OnceLock<InterruptCoordinator>,
}

impl InterruptOnNarration {
    pub fn new(trigger: NarrationTrigger) -> Self {
        Self {
            trigger,
            ended: AtomicUsize::new(0),
            coordinator: OnceLock::new(),
        }
    }

    pub fn attach(&self, coordinator: InterruptCoordinator) {
        let _ = self.coordinator.set(coordinator);
    }

    fn fire(&self) {
        if let Some(coordinator) = self.coordinator.get() {
            coordinator.interrupt(InterruptKind::Soft);
        }
    }
}

impl ProgressNotifier for InterruptOnNarration {
    fn on_status_change(&self, _statuses: &[(AgentId, AgentStatus)]) {}
    fn on_turn_committed(&self, _speaker: AgentId, _message: &Message) {}
    fn on_error(&self, _message: &str) {}

    fn on_narration_start(&self, _item: &NarrationItem) {
        if matches!(self.trigger, NarrationTrigger::Start) {
            self.fire();
        }
    }

    fn on_narration_end(&self, _speaker: AgentId) {
        let ended = self.ended.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.trigger, NarrationTrigger::End(n) if n == ended) {
            self.fire();
        }
    }
}
