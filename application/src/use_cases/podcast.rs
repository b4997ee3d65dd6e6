//! Podcast playback
//!
//! Generates an episode script, parses it into speaker-tagged lines and
//! plays it one line at a time through the narration queue. A question
//! asked mid-episode produces a side script; once that has played the main
//! script picks up at the line that was cut off.

use crate::ports::turn_generator::{PodcastInterrupt, TurnRequest};
use crate::use_cases::shared::{OrchestratorContext, OrchestratorError, SessionState};
use crate::use_cases::turn::TurnRunner;
use duet_domain::{
    Advance, AgentId, Epoch, NarrationItem, OrchestrationMode, PodcastPlayer, PodcastScript,
};
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub(crate) struct PodcastRunner<'a> {
    runner: &'a TurnRunner,
}

impl<'a> PodcastRunner<'a> {
    pub fn new(runner: &'a TurnRunner) -> Self {
        Self { runner }
    }

    fn ctx(&self) -> &OrchestratorContext {
        self.runner.ctx()
    }

    /// Generate a fresh episode about `topic` and play it from line 0.
    pub async fn start_episode(&self, epoch: Epoch, topic: &str) -> Result<(), OrchestratorError> {
        let prepared = self.ctx().commit_if_current(epoch, |s| {
            let kind = s.roster.model_kind(AgentId::FIRST)?;
            s.awaiting_backend = true;
            Ok::<_, duet_domain::DomainError>(
                TurnRequest::new(self.ctx().document_id(), topic, AgentId::FIRST, kind)
                    .with_history(s.history.lines())
                    .podcast(None),
            )
        });
        let request = match prepared {
            None => return Ok(()),
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(request)) => request,
        };
        self.ctx().notify_status();

        info!(epoch = %epoch, "Generating podcast episode");
        let Some(script) = self.fetch_script(epoch, &request, true).await? else {
            return Ok(());
        };

        let loaded = self
            .ctx()
            .commit_if_current(epoch, |s| s.mode.ensure_podcast().load(script.clone()))
            .is_some();
        if !loaded {
            return Ok(());
        }

        info!(lines = script.len(), "Podcast episode loaded");
        self.ctx().progress().on_podcast_loaded(&script);
        self.ctx().log(
            "podcast_script",
            json!({ "epoch": epoch, "lines": script.len(), "text": script.raw_text() }),
        );
        self.play(epoch).await
    }

    /// Answer a question asked while the episode was interrupted.
    ///
    /// On failure the episode stays interrupted and can still be resumed.
    pub async fn answer_interrupt(
        &self,
        epoch: Epoch,
        question: &str,
    ) -> Result<(), OrchestratorError> {
        let prepared = self.ctx().commit_if_current(epoch, |s| {
            let player = s.mode.podcast().filter(|p| p.is_interrupted());
            let Some(script) = player.and_then(PodcastPlayer::script) else {
                return Err(OrchestratorError::NothingToResume);
            };
            let interrupt = PodcastInterrupt {
                main_script: script.raw_text().to_string(),
                resume_index: s.mode.podcast().map_or(0, PodcastPlayer::cursor),
            };
            let kind = s.roster.model_kind(AgentId::FIRST)?;
            s.awaiting_backend = true;
            Ok(
                TurnRequest::new(self.ctx().document_id(), question, AgentId::FIRST, kind)
                    .with_history(s.history.lines())
                    .podcast(Some(interrupt)),
            )
        });
        let request = match prepared {
            None => return Ok(()),
            Some(result) => result?,
        };
        self.ctx().notify_status();

        let resume_at = request
            .podcast_interrupt
            .as_ref()
            .map_or(0, |i| i.resume_index);
        info!(epoch = %epoch, cursor = resume_at, "Generating side script");
        let Some(side) = self.fetch_script(epoch, &request, false).await? else {
            return Ok(());
        };

        let begun = self.ctx().commit_if_current(epoch, |s| match s.mode.podcast_mut() {
            Some(player) => player.begin_side(side.clone()),
            None => Err(duet_domain::DomainError::InvalidTransition(
                "podcast was stopped",
            )),
        });
        match begun {
            None => return Ok(()),
            Some(Err(e)) => {
                debug!("Side script dropped: {}", e);
                return Ok(());
            }
            Some(Ok(())) => {}
        }

        self.ctx().progress().on_side_script_loaded(&side, resume_at);
        self.ctx().log(
            "side_script",
            json!({ "epoch": epoch, "lines": side.len(), "resume_at": resume_at }),
        );
        self.play(epoch).await
    }

    /// Resume an interrupted episode at its saved line
    pub async fn resume(&self, epoch: Epoch) -> Result<(), OrchestratorError> {
        let advanced = self.ctx().commit_if_current(epoch, |s| {
            let advance = s
                .mode
                .podcast_mut()
                .ok_or(OrchestratorError::NothingToResume)?
                .resume()
                .map_err(|_| OrchestratorError::NothingToResume)?;
            if advance == Advance::Finished {
                s.mode = OrchestrationMode::Idle;
            }
            Ok(advance)
        });
        match advanced {
            None => Ok(()),
            Some(Err(e)) => Err(e),
            Some(Ok(Advance::Finished)) => {
                self.finished(epoch);
                Ok(())
            }
            Some(Ok(Advance::Resumed { cursor })) => {
                self.ctx().progress().on_podcast_resumed(cursor);
                self.play(epoch).await
            }
            Some(Ok(Advance::Continue)) => self.play(epoch).await,
        }
    }

    /// Generate and parse a script.
    ///
    /// A main-script failure ends the podcast; a side-script failure only
    /// surfaces the error. Returns `None` when `epoch` went stale.
    async fn fetch_script(
        &self,
        epoch: Epoch,
        request: &TurnRequest,
        is_main: bool,
    ) -> Result<Option<PodcastScript>, OrchestratorError> {
        let result = self.runner.generator().generate(request).await;

        let current = self
            .ctx()
            .commit_if_current(epoch, |s| s.awaiting_backend = false)
            .is_some();
        if !current {
            return Ok(None);
        }
        self.ctx().notify_status();

        let script = result
            .map_err(OrchestratorError::from)
            .and_then(|response| PodcastScript::parse(&response.text).map_err(Into::into));

        match script {
            Ok(script) => Ok(Some(script)),
            Err(e) => {
                warn!(main = is_main, "Podcast script unusable: {}", e);
                if is_main {
                    self.ctx().fail_session(epoch, &e.to_string());
                } else {
                    self.ctx().surface_error(epoch, &e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Play lines until the episode ends or `epoch` goes stale
    async fn play(&self, epoch: Epoch) -> Result<(), OrchestratorError> {
        loop {
            let Some(Some(step)) = self
                .ctx()
                .commit_if_current(epoch, |s| s.mode.podcast().and_then(PodcastPlayer::current_step))
            else {
                return Ok(());
            };

            debug!(source = ?step.source, cursor = step.index, agent = %step.line.speaker, "Podcast line");
            self.ctx().progress().on_podcast_line(&step);

            // The cursor moves in the queue's own commit, so an interrupt
            // arriving after the line has played saves the next line.
            let (advanced_tx, advanced_rx) = oneshot::channel();
            let (speaker, text) = (step.line.speaker, step.line.text.clone());
            let done = self.runner.queue().enqueue_with_hook(
                NarrationItem::new(speaker, text.clone(), epoch),
                Some(Box::new(move |s: &mut SessionState| {
                    s.history.push_agent(Some(speaker), &text);
                    let advance = s
                        .mode
                        .podcast_mut()
                        .and_then(|p| p.line_finished().ok());
                    if advance == Some(Advance::Finished) {
                        s.mode = OrchestrationMode::Idle;
                    }
                    let _ = advanced_tx.send(advance);
                })),
            );

            match done.await {
                // Flushed by an interrupt
                Err(_) => return Ok(()),
                Ok(Err(e)) if e.is_stopped() => return Ok(()),
                // The queue has already aborted the session and surfaced it
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(())) => {}
            }

            // The hook has run or been dropped by now; dropped means stale
            match advanced_rx.await.ok().flatten() {
                None => return Ok(()),
                Some(Advance::Continue) => {}
                Some(Advance::Resumed { cursor }) => {
                    info!(cursor, "Side script done, resuming episode");
                    self.ctx().progress().on_podcast_resumed(cursor);
                }
                Some(Advance::Finished) => {
                    self.finished(epoch);
                    return Ok(());
                }
            }
        }
    }

    fn finished(&self, epoch: Epoch) {
        info!(epoch = %epoch, "Podcast episode finished");
        self.ctx().progress().on_podcast_finished();
        self.ctx().notify_status();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::narrator::Narrator;
    use crate::ports::turn_generator::GenerationError;
    use crate::use_cases::narration_queue::NarrationQueue;
    use crate::use_cases::interrupt::InterruptCoordinator;
    use crate::use_cases::test_support::{
        InterruptOnNarration, NarrationTrigger, ScriptedGenerator, ScriptedNarrator,
        context_with, pair_context, pair_roster,
    };
    use duet_domain::{DomainError, PodcastState};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    const EPISODE: &str = "Intro music\n\
        Agent 1: Welcome to the show.\n\
        Agent 2: Today we read the report.\n\
        Agent 1: Revenue grew.\n\
        Agent 2: Costs grew faster.";

    const SIDE: &str = "Agent 2: Good question.\nAgent 1: It was in chapter two.";

    struct Fixture {
        runner: Arc<TurnRunner>,
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
            runner: Arc::new(TurnRunner::new(ctx, generator.clone(), queue)),
            generator,
            narrator,
        }
    }

    /// Soft interrupt the way the coordinator does it
    fn soft_interrupt(runner: &TurnRunner) -> Epoch {
        let epoch = {
            let mut state = runner.ctx().lock();
            let epoch = runner.ctx().advance_epoch();
            if let Some(player) = state.mode.podcast_mut() {
                player.soft_interrupt();
            }
            state.clear_activity();
            epoch
        };
        runner.queue().flush();
        epoch
    }

    #[tokio::test]
    async fn test_episode_plays_every_line_in_order() {
        let f = fixture(ScriptedGenerator::new().with_text(EPISODE), ScriptedNarrator::instant());
        let epoch = f.runner.ctx().current_epoch();
        PodcastRunner::new(&f.runner)
            .start_episode(epoch, "the report")
            .await
            .unwrap();

        assert_eq!(
            f.narrator.completed_texts(),
            vec![
                "Welcome to the show.",
                "Today we read the report.",
                "Revenue grew.",
                "Costs grew faster."
            ]
        );
        assert_eq!(
            f.narrator.started_speakers(),
            vec![AgentId::FIRST, AgentId::SECOND, AgentId::FIRST, AgentId::SECOND]
        );
        let requests = f.generator.requests();
        assert!(requests[0].is_podcast_mode);
        assert!(requests[0].podcast_interrupt.is_none());
        let state = f.runner.ctx().lock();
        assert!(state.mode.is_idle());
        assert!(!state.awaiting_backend);
    }

    #[tokio::test]
    async fn test_unparseable_script_starts_no_playback() {
        let f = fixture(
            ScriptedGenerator::new().with_text("Sorry, I cannot do that."),
            ScriptedNarrator::instant(),
        );
        let epoch = f.runner.ctx().current_epoch();
        let result = PodcastRunner::new(&f.runner)
            .start_episode(epoch, "the report")
            .await;

        assert_eq!(
            result,
            Err(OrchestratorError::Domain(DomainError::NoSpeakerLines))
        );
        assert!(f.narrator.started_texts().is_empty());
        let state = f.runner.ctx().lock();
        assert!(state.mode.is_idle());
        assert!(state.error.is_some());
        assert!(!state.is_busy());
    }

    #[tokio::test]
    async fn test_interrupt_side_script_then_resume_at_cut_line() {
        let f = fixture(
            ScriptedGenerator::new().with_text(EPISODE).with_text(SIDE),
            ScriptedNarrator::gated(),
        );
        let epoch = f.runner.ctx().current_epoch();
        let episode = {
            let runner = f.runner.clone();
            tokio::spawn(async move { PodcastRunner::new(&runner).start_episode(epoch, "t").await })
        };

        // Lines 0 and 1 finish, line 2 is cut off
        f.narrator.release(2);
        f.narrator.wait_started(3).await;
        let epoch = soft_interrupt(&f.runner);
        f.narrator.stop();
        episode.await.unwrap().unwrap();
        assert_eq!(
            f.runner.ctx().lock().mode.podcast().unwrap().state(),
            PodcastState::Interrupted { saved_cursor: 2 }
        );

        f.narrator.release(10);
        PodcastRunner::new(&f.runner)
            .answer_interrupt(epoch, "Where was that?")
            .await
            .unwrap();

        let request = &f.generator.requests()[1];
        let interrupt = request.podcast_interrupt.as_ref().unwrap();
        assert_eq!(interrupt.resume_index, 2);
        assert!(interrupt.main_script.contains("Revenue grew."));

        assert_eq!(
            f.narrator.completed_texts(),
            vec![
                "Welcome to the show.",
                "Today we read the report.",
                "Good question.",
                "It was in chapter two.",
                "Revenue grew.",
                "Costs grew faster."
            ]
        );
        assert!(f.runner.ctx().lock().mode.is_idle());
    }

    #[tokio::test]
    async fn test_interrupt_after_line_finished_resumes_at_next_line() {
        let progress = Arc::new(InterruptOnNarration::new(NarrationTrigger::End(2)));
        let ctx = Arc::new(context_with(pair_roster(), progress.clone()));
        let narrator = Arc::new(ScriptedNarrator::instant());
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
        let generator = ScriptedGenerator::new().with_text("Agent 1: A\nAgent 2: B\nAgent 1: C");
        let runner = TurnRunner::new(ctx.clone(), Arc::new(generator), queue);

        PodcastRunner::new(&runner)
            .start_episode(ctx.current_epoch(), "t")
            .await
            .unwrap();
        assert_eq!(narrator.completed_texts(), vec!["A", "B"]);
        assert_eq!(
            ctx.lock().mode.podcast().unwrap().state(),
            PodcastState::Interrupted { saved_cursor: 2 }
        );

        PodcastRunner::new(&runner)
            .resume(ctx.current_epoch())
            .await
            .unwrap();
        assert_eq!(narrator.completed_texts(), vec!["A", "B", "C"]);
        let state = ctx.lock();
        assert!(state.mode.is_idle());
        assert_eq!(
            state.history.lines(),
            &["Agent 1: A".to_string(), "Agent 2: B".to_string(), "Agent 1: C".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_side_script_keeps_episode_resumable() {
        let f = fixture(
            ScriptedGenerator::new()
                .with_text(EPISODE)
                .with_turn(Err(GenerationError::Timeout)),
            ScriptedNarrator::gated(),
        );
        let epoch = f.runner.ctx().current_epoch();
        let episode = {
            let runner = f.runner.clone();
            tokio::spawn(async move { PodcastRunner::new(&runner).start_episode(epoch, "t").await })
        };
        f.narrator.release(1);
        f.narrator.wait_started(2).await;
        let epoch = soft_interrupt(&f.runner);
        f.narrator.stop();
        episode.await.unwrap().unwrap();

        let podcast = PodcastRunner::new(&f.runner);
        let result = podcast.answer_interrupt(epoch, "why?").await;
        assert!(matches!(result, Err(OrchestratorError::Generation(_))));
        assert!(f.runner.ctx().lock().mode.podcast().unwrap().is_interrupted());

        f.narrator.release(10);
        podcast.resume(epoch).await.unwrap();
        assert_eq!(
            f.narrator.completed_texts(),
            vec![
                "Welcome to the show.",
                "Today we read the report.",
                "Revenue grew.",
                "Costs grew faster."
            ]
        );
    }

    #[tokio::test]
    async fn test_answer_without_interrupted_episode() {
        let f = fixture(ScriptedGenerator::new(), ScriptedNarrator::instant());
        let epoch = f.runner.ctx().current_epoch();
        assert_eq!(
            PodcastRunner::new(&f.runner).answer_interrupt(epoch, "q").await,
            Err(OrchestratorError::NothingToResume)
        );
        assert_eq!(
            PodcastRunner::new(&f.runner).resume(epoch).await,
            Err(OrchestratorError::NothingToResume)
        );
    }
}
