//! Narration queue
//!
//! A FIFO of committed turns with a single consumer task. Producers enqueue
//! as soon as a turn's text is committed and move on; the consumer narrates
//! one item at a time, so playback order always equals enqueue order and at
//! most one narration is in flight.
//!
//! Items carry the epoch they were committed under. The consumer re-checks
//! it before playback starts and after it ends, and races playback against
//! the epoch's cancellation token, so anything queued before an interrupt
//! is dropped silently and never reaches the narrator.

use crate::ports::narrator::{NarrationError, Narrator};
use crate::use_cases::shared::{OrchestratorContext, SessionState};
use duet_domain::NarrationItem;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of narrating one item, as seen by a waiting producer
pub type NarrationOutcome = Result<(), NarrationError>;

/// Runs under the state lock in the same step that records a line as
/// finished, before any interrupt can move the epoch on
pub type FinishHook = Box<dyn FnOnce(&mut SessionState) + Send>;

struct Pending {
    item: NarrationItem,
    done: Option<oneshot::Sender<NarrationOutcome>>,
    on_finished: Option<FinishHook>,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<Pending>,
    in_flight: bool,
}

impl QueueState {
    fn pending(&self) -> usize {
        self.items.len() + usize::from(self.in_flight)
    }
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Notify,
    /// Queued plus in-flight item count
    pending: watch::Sender<usize>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &QueueState) {
        self.pending.send_replace(state.pending());
    }

    fn clear(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.items.len();
        state.items.clear();
        self.publish(&state);
        dropped
    }
}

pub struct NarrationQueue {
    shared: Arc<Shared>,
    shutdown: CancellationToken,
}

impl NarrationQueue {
    /// Create the queue and spawn its consumer on the current runtime
    pub fn spawn(
        ctx: Arc<OrchestratorContext>,
        narrator: Arc<dyn Narrator>,
        shutdown: CancellationToken,
    ) -> Self {
        let (pending, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
            pending,
        });
        tokio::spawn(consume(
            Arc::clone(&shared),
            ctx,
            narrator,
            shutdown.clone(),
        ));
        Self { shared, shutdown }
    }

    /// Queue an item; nobody waits for it
    pub fn enqueue(&self, item: NarrationItem) {
        self.push(Pending {
            item,
            done: None,
            on_finished: None,
        });
    }

    /// Queue an item and get notified once it has been narrated.
    ///
    /// The receiver errors if the item is flushed before playback.
    pub fn enqueue_with_completion(
        &self,
        item: NarrationItem,
    ) -> oneshot::Receiver<NarrationOutcome> {
        self.enqueue_with_hook(item, None)
    }

    /// Like [`Self::enqueue_with_completion`], with `on_finished` applied to
    /// the session state only if the item plays to the end while its epoch
    /// is still current
    pub fn enqueue_with_hook(
        &self,
        item: NarrationItem,
        on_finished: Option<FinishHook>,
    ) -> oneshot::Receiver<NarrationOutcome> {
        let (tx, rx) = oneshot::channel();
        self.push(Pending {
            item,
            done: Some(tx),
            on_finished,
        });
        rx
    }

    /// Drop everything not yet playing. Returns the number of items dropped.
    pub fn flush(&self) -> usize {
        let dropped = self.shared.clear();
        if dropped > 0 {
            debug!(dropped, "Flushed narration queue");
        }
        dropped
    }

    /// Queued plus in-flight items
    pub fn pending(&self) -> usize {
        *self.shared.pending.borrow()
    }

    pub fn is_narrating(&self) -> bool {
        self.shared.lock().in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Wait until nothing is queued or playing
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.pending.subscribe();
        // The sender lives as long as `self`, so this only ends on idle
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.shared.wake.notify_one();
    }

    fn push(&self, pending: Pending) {
        {
            let mut state = self.shared.lock();
            state.items.push_back(pending);
            self.shared.publish(&state);
        }
        self.shared.wake.notify_one();
    }
}

impl Drop for NarrationQueue {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn consume(
    shared: Arc<Shared>,
    ctx: Arc<OrchestratorContext>,
    narrator: Arc<dyn Narrator>,
    shutdown: CancellationToken,
) {
    debug!("Narration consumer started");
    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let next = {
            let mut state = shared.lock();
            let next = state.items.pop_front();
            state.in_flight = next.is_some();
            shared.publish(&state);
            next
        };

        let Some(Pending {
            item,
            done,
            on_finished,
        }) = next
        else {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = shared.wake.notified() => continue,
            }
        };

        let outcome = play(&ctx, narrator.as_ref(), &item, on_finished).await;

        if let Err(e) = &outcome
            && !e.is_stopped()
            && ctx.abort_current(item.epoch, &e.to_string())
        {
            let dropped = shared.clear();
            info!(speaker = %item.speaker, dropped, "Narration failed, queue flushed");
        }

        if let Some(done) = done {
            // The producer may have given up waiting
            let _ = done.send(outcome);
        }

        let state = {
            let mut state = shared.lock();
            state.in_flight = false;
            state.pending()
        };
        shared.pending.send_replace(state);
    }
    debug!("Narration consumer stopped");
}

/// Narrate one item, re-checking its epoch before and after playback
async fn play(
    ctx: &OrchestratorContext,
    narrator: &dyn Narrator,
    item: &NarrationItem,
    on_finished: Option<FinishHook>,
) -> NarrationOutcome {
    let cancel = ctx
        .commit_if_current(item.epoch, |s| {
            s.activity.speaking = Some(item.speaker);
            ctx.cancellation(item.epoch)
        })
        .flatten();
    let Some(cancel) = cancel else {
        debug!(speaker = %item.speaker, epoch = %item.epoch, "Discarding stale narration");
        return Err(NarrationError::Stopped);
    };

    ctx.notify_status();
    ctx.progress().on_narration_start(item);
    ctx.log(
        "narration_started",
        json!({ "speaker": item.speaker, "epoch": item.epoch, "chars": item.text.len() }),
    );

    // An interrupt may land at any point after the check above; its token
    // is already cancelled then, and the narrator is never polled.
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(NarrationError::Stopped),
        result = narrator.narrate(item.speaker, &item.text) => result,
    };

    let current = ctx
        .commit_if_current(item.epoch, |s| {
            if s.activity.speaking == Some(item.speaker) {
                s.activity.speaking = None;
            }
            if result.is_ok()
                && let Some(hook) = on_finished
            {
                hook(s);
            }
        })
        .is_some();
    if !current {
        return Err(NarrationError::Stopped);
    }

    ctx.notify_status();
    if result.is_ok() {
        ctx.progress().on_narration_end(item.speaker);
        ctx.log(
            "narration_finished",
            json!({ "speaker": item.speaker, "epoch": item.epoch }),
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::interrupt::InterruptCoordinator;
    use crate::use_cases::test_support::{
        InterruptOnNarration, NarrationTrigger, ScriptedNarrator, context_with, single_roster,
        test_context,
    };
    use duet_domain::AgentId;

    fn item(ctx: &OrchestratorContext, speaker: AgentId, text: &str) -> NarrationItem {
        NarrationItem::new(speaker, text, ctx.current_epoch())
    }

    #[tokio::test]
    async fn test_plays_in_enqueue_order() {
        let ctx = Arc::new(test_context());
        let narrator = Arc::new(ScriptedNarrator::instant());
        let queue = NarrationQueue::spawn(ctx.clone(), narrator.clone(), CancellationToken::new());

        queue.enqueue(item(&ctx, AgentId::FIRST, "a1"));
        queue.enqueue(item(&ctx, AgentId::SECOND, "b1"));
        queue.enqueue(item(&ctx, AgentId::FIRST, "a2"));
        queue.wait_idle().await;

        assert_eq!(narrator.completed_texts(), vec!["a1", "b1", "a2"]);
    }

    #[tokio::test]
    async fn test_one_narration_in_flight() {
        let ctx = Arc::new(test_context());
        let narrator = Arc::new(ScriptedNarrator::gated());
        let queue = NarrationQueue::spawn(ctx.clone(), narrator.clone(), CancellationToken::new());

        queue.enqueue(item(&ctx, AgentId::FIRST, "first"));
        queue.enqueue(item(&ctx, AgentId::SECOND, "second"));
        narrator.wait_started(1).await;
        assert_eq!(narrator.started_texts(), vec!["first"]);
        assert_eq!(queue.pending(), 2);
        assert_eq!(ctx.lock().activity.speaking, Some(AgentId::FIRST));

        narrator.release(1);
        narrator.wait_started(2).await;
        assert_eq!(narrator.started_texts(), vec!["first", "second"]);
        narrator.release(1);
        queue.wait_idle().await;
        assert_eq!(ctx.lock().activity.speaking, None);
    }

    #[tokio::test]
    async fn test_stale_items_are_discarded() {
        let ctx = Arc::new(test_context());
        let narrator = Arc::new(ScriptedNarrator::instant());
        let queue = NarrationQueue::spawn(ctx.clone(), narrator.clone(), CancellationToken::new());

        let stale = item(&ctx, AgentId::FIRST, "old");
        ctx.advance_epoch();
        queue.enqueue(stale);
        queue.enqueue(item(&ctx, AgentId::SECOND, "new"));
        queue.wait_idle().await;

        assert_eq!(narrator.started_texts(), vec!["new"]);
    }

    #[tokio::test]
    async fn test_flush_drops_waiting_items() {
        let ctx = Arc::new(test_context());
        let narrator = Arc::new(ScriptedNarrator::gated());
        let queue = NarrationQueue::spawn(ctx.clone(), narrator.clone(), CancellationToken::new());

        queue.enqueue(item(&ctx, AgentId::FIRST, "playing"));
        let waiting = queue.enqueue_with_completion(item(&ctx, AgentId::SECOND, "waiting"));
        narrator.wait_started(1).await;

        assert_eq!(queue.flush(), 1);
        assert!(waiting.await.is_err());
        narrator.release(1);
        queue.wait_idle().await;
        assert_eq!(narrator.started_texts(), vec!["playing"]);
    }

    #[tokio::test]
    async fn test_completion_reports_outcome() {
        let ctx = Arc::new(test_context());
        let narrator = Arc::new(ScriptedNarrator::instant());
        let queue = NarrationQueue::spawn(ctx.clone(), narrator.clone(), CancellationToken::new());

        let done = queue.enqueue_with_completion(item(&ctx, AgentId::FIRST, "hello"));
        assert_eq!(done.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_interrupt_right_before_playback_keeps_narrator_silent() {
        let progress = Arc::new(InterruptOnNarration::new(NarrationTrigger::Start));
        let ctx = Arc::new(context_with(single_roster(), progress.clone()));
        let narrator = Arc::new(ScriptedNarrator::gated());
        let queue = Arc::new(NarrationQueue::spawn(
            ctx.clone(),
            narrator.clone(),
            CancellationToken::new(),
        ));
        progress.attach(InterruptCoordinator::new(
            ctx.clone(),
            narrator.clone(),
            queue.clone(),
        ));

        let epoch = ctx.current_epoch();
        let done = queue.enqueue_with_completion(item(&ctx, AgentId::FIRST, "stale line"));
        assert_eq!(done.await.unwrap(), Err(NarrationError::Stopped));
        queue.wait_idle().await;

        assert!(ctx.epoch().is_stale(epoch));
        assert!(narrator.started_texts().is_empty());
        assert_eq!(ctx.lock().activity.speaking, None);
        assert!(!queue.is_narrating());
    }

    #[tokio::test]
    async fn test_finish_hook_runs_only_for_completed_lines() {
        let ctx = Arc::new(test_context());
        let narrator = Arc::new(ScriptedNarrator::gated());
        let queue = NarrationQueue::spawn(ctx.clone(), narrator.clone(), CancellationToken::new());

        let finished = queue.enqueue_with_hook(
            item(&ctx, AgentId::FIRST, "played"),
            Some(Box::new(|s: &mut SessionState| s.history.push_user("played"))),
        );
        let cut = queue.enqueue_with_hook(
            item(&ctx, AgentId::FIRST, "cut"),
            Some(Box::new(|s: &mut SessionState| s.history.push_user("cut"))),
        );
        narrator.release(1);
        assert_eq!(finished.await.unwrap(), Ok(()));
        narrator.wait_started(2).await;
        narrator.stop();
        assert_eq!(cut.await.unwrap(), Err(NarrationError::Stopped));

        assert_eq!(ctx.lock().history.lines(), &["User: played".to_string()]);
    }

    #[tokio::test]
    async fn test_playback_error_aborts_and_surfaces() {
        let ctx = Arc::new(test_context());
        let narrator = Arc::new(ScriptedNarrator::instant().failing_on("broken"));
        let queue = NarrationQueue::spawn(ctx.clone(), narrator.clone(), CancellationToken::new());

        let epoch = ctx.current_epoch();
        queue.enqueue(item(&ctx, AgentId::FIRST, "broken"));
        queue.enqueue(item(&ctx, AgentId::SECOND, "never"));
        queue.wait_idle().await;

        assert!(ctx.epoch().is_stale(epoch));
        assert!(ctx.lock().error.as_deref().unwrap().contains("Playback error"));
        assert_eq!(narrator.completed_texts(), Vec::<String>::new());
        assert_eq!(narrator.started_texts(), vec!["broken"]);
    }
}
