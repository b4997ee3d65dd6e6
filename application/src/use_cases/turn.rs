//! Single-turn generation
//!
//! Runs one Turn Generator call under an epoch and commits the result:
//! transcript, history line, narration item and any driver-specific state,
//! all in one critical section. Direct answers (one or more agents each
//! answering once) are built on top of it.

use crate::ports::turn_generator::{GenerationError, TurnGenerator, TurnRequest};
use crate::use_cases::narration_queue::NarrationQueue;
use crate::use_cases::shared::{OrchestratorContext, OrchestratorError, SessionState};
use duet_domain::{
    AgentId, Epoch, Message, NarrationItem, format_for_speech, heuristic_confidence,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one generation attempt
#[derive(Debug)]
pub(crate) enum TurnOutcome<R> {
    Committed { message: Message, extra: R },
    Stale,
}

pub(crate) struct TurnRunner {
    ctx: Arc<OrchestratorContext>,
    generator: Arc<dyn TurnGenerator>,
    queue: Arc<NarrationQueue>,
}

impl TurnRunner {
    pub fn new(
        ctx: Arc<OrchestratorContext>,
        generator: Arc<dyn TurnGenerator>,
        queue: Arc<NarrationQueue>,
    ) -> Self {
        Self {
            ctx,
            generator,
            queue,
        }
    }

    pub fn ctx(&self) -> &OrchestratorContext {
        &self.ctx
    }

    pub fn generator(&self) -> &dyn TurnGenerator {
        self.generator.as_ref()
    }

    pub fn queue(&self) -> &NarrationQueue {
        &self.queue
    }

    /// Generate `request` and commit it if `epoch` is still current.
    ///
    /// `history_speaker` is `None` for the single-agent history form.
    /// `after_commit` runs inside the same critical section as the commit.
    pub async fn run<R>(
        &self,
        epoch: Epoch,
        request: TurnRequest,
        history_speaker: Option<AgentId>,
        after_commit: impl FnOnce(&mut SessionState) -> R,
    ) -> Result<TurnOutcome<R>, GenerationError> {
        let speaker = request.speaker;
        if !self.ctx.begin_thinking(epoch, speaker) {
            return Ok(TurnOutcome::Stale);
        }

        debug!(agent = %speaker, epoch = %epoch, summary = request.is_final_summary, "Requesting turn");
        let result = self.generator.generate(&request).await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let current = self
                    .ctx
                    .commit_if_current(epoch, |s| {
                        s.activity.thinking.remove(&speaker);
                    })
                    .is_some();
                if !current {
                    return Ok(TurnOutcome::Stale);
                }
                warn!(agent = %speaker, "Turn generation failed: {}", e);
                return Err(e);
            }
        };

        let text = format_for_speech(&response.text);
        let confidence = response
            .confidence
            .unwrap_or_else(|| heuristic_confidence(&response.text));
        let message = if request.is_final_summary {
            Message::summary(text.clone(), Some(confidence))
        } else {
            Message::agent(text.clone(), Some(confidence))
        };

        let committed = self.ctx.commit_if_current(epoch, |s| {
            s.activity.thinking.remove(&speaker);
            if !text.is_empty() {
                if let Err(e) = s.roster.append(speaker, message.clone()) {
                    warn!(agent = %speaker, "Could not record turn: {}", e);
                }
                s.history.push_agent(history_speaker, &text);
                let item = if request.is_final_summary {
                    NarrationItem::summary(speaker, text.clone(), epoch)
                } else {
                    NarrationItem::new(speaker, text.clone(), epoch)
                };
                self.queue.enqueue(item);
            }
            after_commit(s)
        });

        let Some(extra) = committed else {
            return Ok(TurnOutcome::Stale);
        };

        self.ctx.notify_status();
        self.ctx.progress().on_turn_committed(speaker, &message);
        self.ctx.log(
            "turn_committed",
            json!({
                "agent": speaker,
                "epoch": epoch,
                "text": message.text,
                "confidence": message.confidence,
                "is_final_summary": message.is_final_summary,
            }),
        );
        Ok(TurnOutcome::Committed { message, extra })
    }

    /// Let each agent answer its instruction once, in order.
    pub async fn run_direct(
        &self,
        epoch: Epoch,
        turns: Vec<(AgentId, String)>,
    ) -> Result<(), OrchestratorError> {
        for (agent, instruction) in turns {
            let prepared = self.ctx.commit_if_current(epoch, |s| {
                let kind = s.roster.model_kind(agent)?;
                let single = s.roster.is_single();
                let request = TurnRequest::new(self.ctx.document_id(), instruction, agent, kind)
                    .with_history(s.history.lines())
                    .single_agent(single);
                Ok::<_, duet_domain::DomainError>((request, (!single).then_some(agent)))
            });
            let (request, history_speaker) = match prepared {
                None => return Ok(()),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(prepared)) => prepared,
            };

            info!(agent = %agent, "Direct turn");
            match self.run(epoch, request, history_speaker, |_| ()).await {
                Ok(TurnOutcome::Committed { .. }) => {}
                Ok(TurnOutcome::Stale) => return Ok(()),
                Err(e) => {
                    self.ctx.fail_session(epoch, &e.to_string());
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}
