//! Discussion scheduler
//!
//! Drives a [`DiscussionSession`] to completion: the initiator opens on the
//! user's topic, the agents alternate for the ordinary turns, and the
//! initiator closes with one summary. Each turn is enqueued for narration
//! as soon as it commits, so generation of turn `n + 1` overlaps playback
//! of turn `n`.

use crate::ports::turn_generator::TurnRequest;
use crate::use_cases::shared::{OrchestratorContext, OrchestratorError};
use crate::use_cases::turn::{TurnOutcome, TurnRunner};
use duet_domain::{
    AgentId, DiscussionPhase, DiscussionSession, DomainError, Epoch, OrchestrationMode,
};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

pub(crate) struct DiscussionScheduler<'a> {
    runner: &'a TurnRunner,
    summary_pause: Duration,
}

impl<'a> DiscussionScheduler<'a> {
    pub fn new(runner: &'a TurnRunner, summary_pause: Duration) -> Self {
        Self {
            runner,
            summary_pause,
        }
    }

    fn ctx(&self) -> &OrchestratorContext {
        self.runner.ctx()
    }

    /// Start a discussion opened by `initiator` and run it to the end.
    pub async fn start(
        &self,
        epoch: Epoch,
        initiator: AgentId,
        topic: &str,
    ) -> Result<(), OrchestratorError> {
        let started = self.ctx().commit_if_current(epoch, |s| {
            let session =
                DiscussionSession::start(initiator, &s.roster.ids(), s.turn_limit, topic)?;
            let limit = session.turn_limit();
            s.mode = OrchestrationMode::Discussion(session);
            Ok::<_, DomainError>(limit)
        });
        let limit = match started {
            None => return Ok(()),
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(limit)) => limit,
        };

        info!(initiator = %initiator, turn_limit = %limit, "Discussion started");
        self.ctx().progress().on_discussion_start(initiator, limit.get());
        self.ctx().log(
            "discussion_started",
            json!({ "initiator": initiator, "turn_limit": limit.get(), "topic": topic }),
        );

        self.run(epoch).await
    }

    /// Generate turns until the session finishes or `epoch` goes stale.
    pub async fn run(&self, epoch: Epoch) -> Result<(), OrchestratorError> {
        loop {
            let Some(Some((request, is_summary))) = self.ctx().commit_if_current(epoch, |s| {
                let session = s.mode.discussion()?;
                let slot = session.current_slot()?;
                let kind = s.roster.model_kind(slot.speaker).ok()?;
                let instruction = if slot.is_opening() {
                    session.topic().to_string()
                } else {
                    format!(
                        "Continue the discussion. The current conversation is:\n{}",
                        s.history.lines().join("\n")
                    )
                };
                let mut request =
                    TurnRequest::new(self.ctx().document_id(), instruction, slot.speaker, kind)
                        .with_history(s.history.lines());
                if slot.is_final_summary {
                    request = request.summary(session.initiator()?);
                }
                Some((request, slot.is_final_summary))
            }) else {
                debug!(epoch = %epoch, "Discussion loop ended");
                return Ok(());
            };

            if is_summary && !self.summary_pause.is_zero() {
                tokio::time::sleep(self.summary_pause).await;
            }

            let speaker = request.speaker;
            let outcome = self
                .runner
                .run(epoch, request, Some(speaker), |s| {
                    let phase = s
                        .mode
                        .discussion_mut()
                        .map(DiscussionSession::commit_turn);
                    if let Some(Ok(DiscussionPhase::Finished)) = phase {
                        s.mode = OrchestrationMode::Idle;
                    }
                    phase
                })
                .await;

            match outcome {
                Ok(TurnOutcome::Stale) => return Ok(()),
                Ok(TurnOutcome::Committed { extra, .. }) => match extra {
                    Some(Ok(DiscussionPhase::Finished)) => {
                        info!("Discussion finished");
                        self.ctx().progress().on_discussion_finished();
                        self.ctx().log("discussion_finished", json!({ "epoch": epoch }));
                        self.ctx().notify_status();
                        return Ok(());
                    }
                    Some(Ok(phase)) => {
                        debug!(phase = ?phase, "Discussion advanced");
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                },
                Err(e) => {
                    self.ctx().fail_session(epoch, &e.to_string());
                    return Err(e.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::turn_generator::GenerationError;
    use crate::use_cases::narration_queue::NarrationQueue;
    use crate::use_cases::test_support::{ScriptedGenerator, ScriptedNarrator, pair_context};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        runner: TurnRunner,
        generator: Arc<ScriptedGenerator>,
        narrator: Arc<ScriptedNarrator>,
    }

    fn fixture(generator: ScriptedGenerator, narrator: ScriptedNarrator) -> Fixture {
        let ctx = Arc::new(pair_context());
        let generator = Arc::new(generator);
        let narrator = Arc::new(narrator);
        let queue = Arc::new(NarrationQueue::spawn(
            ctx.clone(),
            narrator.clone(),
            CancellationToken::new(),
        ));
        Fixture {
            runner: TurnRunner::new(ctx, generator.clone(), queue),
            generator,
            narrator,
        }
    }

    #[tokio::test]
    async fn test_five_turn_discussion_ends_with_initiator_summary() {
        let f = fixture(ScriptedGenerator::new(), ScriptedNarrator::instant());
        let epoch = f.runner.ctx().current_epoch();
        DiscussionScheduler::new(&f.runner, Duration::ZERO)
            .start(epoch, AgentId::SECOND, "Summarise the risks")
            .await
            .unwrap();
        f.runner.queue().wait_idle().await;

        let requests = f.generator.requests();
        let speakers: Vec<AgentId> = requests.iter().map(|r| r.speaker).collect();
        assert_eq!(
            speakers,
            vec![
                AgentId::SECOND,
                AgentId::FIRST,
                AgentId::SECOND,
                AgentId::FIRST,
                AgentId::SECOND
            ]
        );
        assert_eq!(requests[0].instruction, "Summarise the risks");
        assert!(requests[1].instruction.starts_with("Continue the discussion."));
        assert!(requests[..4].iter().all(|r| !r.is_final_summary));
        assert!(requests[4].is_final_summary && requests[4].is_last_turn);
        assert_eq!(requests[4].master_agent, AgentId::SECOND);

        // Narration follows generation order
        assert_eq!(f.narrator.started_speakers(), speakers);
        let state = f.runner.ctx().lock();
        assert!(state.mode.is_idle());
        assert_eq!(state.history.len(), 5);
        assert!(state.history.lines()[0].starts_with("Agent 2: reply 1"));
    }

    #[tokio::test]
    async fn test_generation_overlaps_narration() {
        let f = fixture(ScriptedGenerator::new(), ScriptedNarrator::gated());
        let runner = Arc::new(f.runner);
        let epoch = runner.ctx().current_epoch();

        let task = {
            let runner = runner.clone();
            tokio::spawn(async move {
                DiscussionScheduler::new(&runner, Duration::ZERO)
                    .start(epoch, AgentId::FIRST, "topic")
                    .await
            })
        };

        // The first line is still playing while later turns are generated
        f.narrator.wait_started(1).await;
        f.generator.wait_calls(3).await;
        assert_eq!(f.narrator.started_texts().len(), 1);

        f.narrator.release(5);
        task.await.unwrap().unwrap();
        runner.queue().wait_idle().await;
        assert_eq!(f.narrator.completed_texts().len(), 5);
    }

    #[tokio::test]
    async fn test_generation_failure_ends_discussion() {
        let f = fixture(
            ScriptedGenerator::new()
                .with_text("opening")
                .with_turn(Err(GenerationError::Connection("refused".to_string()))),
            ScriptedNarrator::instant(),
        );
        let epoch = f.runner.ctx().current_epoch();
        let result = DiscussionScheduler::new(&f.runner, Duration::ZERO)
            .start(epoch, AgentId::FIRST, "topic")
            .await;
        assert!(matches!(result, Err(OrchestratorError::Generation(_))));

        f.runner.queue().wait_idle().await;
        // The committed opening turn is still narrated
        assert_eq!(f.narrator.completed_texts(), vec!["opening"]);
        let state = f.runner.ctx().lock();
        assert!(state.mode.is_idle());
        assert!(state.error.as_deref().unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_interrupt_stops_scheduling() {
        let f = fixture(ScriptedGenerator::gated(), ScriptedNarrator::instant());
        let runner = Arc::new(f.runner);
        let epoch = runner.ctx().current_epoch();

        let task = {
            let runner = runner.clone();
            tokio::spawn(async move {
                DiscussionScheduler::new(&runner, Duration::ZERO)
                    .start(epoch, AgentId::FIRST, "topic")
                    .await
            })
        };
        f.generator.wait_calls(1).await;
        f.generator.release(1);
        f.generator.wait_calls(2).await;
        runner.ctx().advance_epoch();
        f.generator.release(10);

        task.await.unwrap().unwrap();
        assert_eq!(f.generator.requests().len(), 2);
        assert_eq!(runner.ctx().lock().history.len(), 1);
    }

    #[tokio::test]
    async fn test_single_agent_cannot_start_discussion() {
        let ctx = Arc::new(crate::use_cases::test_support::test_context());
        let queue = Arc::new(NarrationQueue::spawn(
            ctx.clone(),
            Arc::new(ScriptedNarrator::instant()),
            CancellationToken::new(),
        ));
        let runner = TurnRunner::new(ctx.clone(), Arc::new(ScriptedGenerator::new()), queue);
        let result = DiscussionScheduler::new(&runner, Duration::ZERO)
            .start(ctx.current_epoch(), AgentId::FIRST, "topic")
            .await;
        assert_eq!(
            result,
            Err(OrchestratorError::Domain(DomainError::SingleAgentDiscussion))
        );
    }
}
