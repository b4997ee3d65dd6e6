//! Podcast player state machine
//!
//! ```text
//! Idle -> Narrating(cursor) -> Interrupted(saved) -> SideNarrating(saved)
//!      -> Narrating(saved) -> ... -> Idle
//! ```
//!
//! The cursor always points at the line being played (or about to be
//! played); it only moves once that line has finished. A soft interrupt
//! therefore resumes the line that was cut off. A strict stop is the only
//! transition that throws the episode away.

use crate::core::error::DomainError;
use crate::podcast::script::{PodcastScript, ScriptLine};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PodcastState {
    Idle,
    Narrating { cursor: usize },
    Interrupted { saved_cursor: usize },
    SideNarrating { saved_cursor: usize, side_cursor: usize },
}

/// Which script a line comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptSource {
    Main,
    Side,
}

/// The line to narrate next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackStep {
    pub source: ScriptSource,
    pub index: usize,
    pub line: ScriptLine,
}

/// What happened after a line finished playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// More lines follow in the same script
    Continue,
    /// The side script ended and the main script resumes at `cursor`
    Resumed { cursor: usize },
    /// Nothing left to play
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodcastPlayer {
    script: Option<PodcastScript>,
    side: Option<PodcastScript>,
    state: PodcastState,
}

impl Default for PodcastPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PodcastPlayer {
    pub fn new() -> Self {
        Self {
            script: None,
            side: None,
            state: PodcastState::Idle,
        }
    }

    pub fn state(&self) -> PodcastState {
        self.state
    }

    pub fn script(&self) -> Option<&PodcastScript> {
        self.script.as_ref()
    }

    pub fn side_script(&self) -> Option<&PodcastScript> {
        self.side.as_ref()
    }

    /// Whether an episode is loaded and not yet finished
    pub fn in_progress(&self) -> bool {
        self.script.is_some()
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.state, PodcastState::Interrupted { .. })
    }

    pub fn is_side_narrating(&self) -> bool {
        matches!(self.state, PodcastState::SideNarrating { .. })
    }

    /// Main-script position to resume from or continue at
    pub fn cursor(&self) -> usize {
        match self.state {
            PodcastState::Idle => 0,
            PodcastState::Narrating { cursor } => cursor,
            PodcastState::Interrupted { saved_cursor }
            | PodcastState::SideNarrating { saved_cursor, .. } => saved_cursor,
        }
    }

    /// Start a fresh episode at line 0, replacing anything loaded
    pub fn load(&mut self, script: PodcastScript) {
        self.script = Some(script);
        self.side = None;
        self.state = PodcastState::Narrating { cursor: 0 };
    }

    /// The line that should be playing now
    pub fn current_step(&self) -> Option<PlaybackStep> {
        match self.state {
            PodcastState::Narrating { cursor } => {
                let line = self.script.as_ref()?.line(cursor)?;
                Some(PlaybackStep {
                    source: ScriptSource::Main,
                    index: cursor,
                    line: line.clone(),
                })
            }
            PodcastState::SideNarrating { side_cursor, .. } => {
                let line = self.side.as_ref()?.line(side_cursor)?;
                Some(PlaybackStep {
                    source: ScriptSource::Side,
                    index: side_cursor,
                    line: line.clone(),
                })
            }
            PodcastState::Idle | PodcastState::Interrupted { .. } => None,
        }
    }

    /// Mark the current line as fully played and move on.
    pub fn line_finished(&mut self) -> Result<Advance, DomainError> {
        match self.state {
            PodcastState::Narrating { cursor } => {
                let len = self.script.as_ref().map_or(0, PodcastScript::len);
                let next = cursor + 1;
                if next >= len {
                    self.finish();
                    Ok(Advance::Finished)
                } else {
                    self.state = PodcastState::Narrating { cursor: next };
                    Ok(Advance::Continue)
                }
            }
            PodcastState::SideNarrating {
                saved_cursor,
                side_cursor,
            } => {
                let side_len = self.side.as_ref().map_or(0, PodcastScript::len);
                let next = side_cursor + 1;
                if next < side_len {
                    self.state = PodcastState::SideNarrating {
                        saved_cursor,
                        side_cursor: next,
                    };
                    return Ok(Advance::Continue);
                }
                self.side = None;
                Ok(self.resume_at(saved_cursor))
            }
            PodcastState::Idle | PodcastState::Interrupted { .. } => Err(
                DomainError::InvalidTransition("no podcast line is playing"),
            ),
        }
    }

    /// Suspend the main script, keeping its cursor.
    ///
    /// Returns `true` when progress was saved. A side script is not
    /// interruptible and keeps playing.
    pub fn soft_interrupt(&mut self) -> bool {
        match self.state {
            PodcastState::Narrating { cursor } => {
                self.state = PodcastState::Interrupted {
                    saved_cursor: cursor,
                };
                true
            }
            PodcastState::Interrupted { .. } => true,
            PodcastState::SideNarrating { .. } | PodcastState::Idle => false,
        }
    }

    /// Play a side script, then come back to the saved cursor
    pub fn begin_side(&mut self, side: PodcastScript) -> Result<(), DomainError> {
        let PodcastState::Interrupted { saved_cursor } = self.state else {
            return Err(DomainError::InvalidTransition(
                "a side script needs an interrupted podcast",
            ));
        };
        self.side = Some(side);
        self.state = PodcastState::SideNarrating {
            saved_cursor,
            side_cursor: 0,
        };
        Ok(())
    }

    /// Resume an interrupted episode without a side script
    pub fn resume(&mut self) -> Result<Advance, DomainError> {
        let PodcastState::Interrupted { saved_cursor } = self.state else {
            return Err(DomainError::InvalidTransition("podcast is not interrupted"));
        };
        Ok(self.resume_at(saved_cursor))
    }

    /// Discard the episode and any side script
    pub fn stop(&mut self) {
        self.finish();
    }

    fn resume_at(&mut self, saved_cursor: usize) -> Advance {
        let len = self.script.as_ref().map_or(0, PodcastScript::len);
        if len == 0 || saved_cursor >= len {
            self.finish();
            return Advance::Finished;
        }
        let cursor = saved_cursor.min(len - 1);
        self.state = PodcastState::Narrating { cursor };
        Advance::Resumed { cursor }
    }

    fn finish(&mut self) {
        self.script = None;
        self.side = None;
        self.state = PodcastState::Idle;
    }
}
