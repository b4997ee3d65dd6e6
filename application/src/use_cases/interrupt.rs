//! Interrupt coordinator
//!
//! Two cancellation strengths share one sequence: bump the epoch and
//! reshape the mode under the state lock, then stop the narrator and flush
//! the queue. Anything still in flight sees a stale epoch when it returns.
//!
//! - **Soft** (a new prompt, starting to listen) keeps an interrupted
//!   podcast so the episode can resume after the question is answered.
//! - **Strict** (explicit stop) discards the podcast as well.

use crate::ports::narrator::Narrator;
use crate::use_cases::narration_queue::NarrationQueue;
use crate::use_cases::shared::OrchestratorContext;
use duet_domain::{Epoch, OrchestrationMode, PodcastPlayer};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptKind {
    Soft,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// The epoch moved on; `podcast_saved` tells whether an episode is
    /// waiting to resume.
    Interrupted { epoch: Epoch, podcast_saved: bool },
    /// A side script is playing and was left alone
    Deferred,
}

pub(crate) struct InterruptCoordinator {
    ctx: Arc<OrchestratorContext>,
    narrator: Arc<dyn Narrator>,
    queue: Arc<NarrationQueue>,
}

impl InterruptCoordinator {
    pub fn new(
        ctx: Arc<OrchestratorContext>,
        narrator: Arc<dyn Narrator>,
        queue: Arc<NarrationQueue>,
    ) -> Self {
        Self {
            ctx,
            narrator,
            queue,
        }
    }

    pub fn interrupt(&self, kind: InterruptKind) -> InterruptOutcome {
        let (epoch, podcast_saved) = {
            let mut state = self.ctx.lock();
            let side_narrating = state
                .mode
                .podcast()
                .is_some_and(|p| p.is_side_narrating());
            if kind == InterruptKind::Soft && side_narrating {
                debug!("Side script playing, soft interrupt deferred");
                return InterruptOutcome::Deferred;
            }

            let epoch = self.ctx.advance_epoch();
            let podcast_saved = match kind {
                InterruptKind::Soft => {
                    let saved = state
                        .mode
                        .podcast_mut()
                        .is_some_and(PodcastPlayer::soft_interrupt);
                    if !saved {
                        state.mode = OrchestrationMode::Idle;
                    }
                    saved
                }
                InterruptKind::Strict => {
                    state.mode = OrchestrationMode::Idle;
                    false
                }
            };
            state.clear_activity();
            (epoch, podcast_saved)
        };

        self.narrator.stop();
        let dropped = self.queue.flush();

        info!(kind = ?kind, epoch = %epoch, dropped, podcast_saved, "Interrupted");
        self.ctx.log(
            "interrupt",
            json!({ "kind": kind, "epoch": epoch, "dropped": dropped, "podcast_saved": podcast_saved }),
        );
        self.ctx.notify_status();
        InterruptOutcome::Interrupted {
            epoch,
            podcast_saved,
        }
    }
}
