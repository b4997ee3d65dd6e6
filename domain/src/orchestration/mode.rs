//! Orchestration mode
//!
//! A discussion and a podcast never run at the same time. Holding them in
//! one enum makes that structural: entering one mode replaces the other.

use crate::orchestration::discussion::DiscussionSession;
use crate::podcast::player::PodcastPlayer;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OrchestrationMode {
    #[default]
    Idle,
    Discussion(DiscussionSession),
    Podcast(PodcastPlayer),
}

impl OrchestrationMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, OrchestrationMode::Idle)
    }

    pub fn discussion(&self) -> Option<&DiscussionSession> {
        match self {
            OrchestrationMode::Discussion(session) => Some(session),
            _ => None,
        }
    }

    pub fn discussion_mut(&mut self) -> Option<&mut DiscussionSession> {
        match self {
            OrchestrationMode::Discussion(session) => Some(session),
            _ => None,
        }
    }

    pub fn podcast(&self) -> Option<&PodcastPlayer> {
        match self {
            OrchestrationMode::Podcast(player) => Some(player),
            _ => None,
        }
    }

    pub fn podcast_mut(&mut self) -> Option<&mut PodcastPlayer> {
        match self {
            OrchestrationMode::Podcast(player) => Some(player),
            _ => None,
        }
    }

    /// The podcast player, switching into podcast mode if needed
    pub fn ensure_podcast(&mut self) -> &mut PodcastPlayer {
        if !matches!(self, OrchestrationMode::Podcast(_)) {
            *self = OrchestrationMode::Podcast(PodcastPlayer::new());
        }
        match self {
            OrchestrationMode::Podcast(player) => player,
            _ => unreachable!("mode was just set to podcast"),
        }
    }

    /// Whether a discussion is running or a podcast episode is loaded
    pub fn is_busy(&self) -> bool {
        match self {
            OrchestrationMode::Idle => false,
            OrchestrationMode::Discussion(session) => session.is_active(),
            OrchestrationMode::Podcast(player) => player.in_progress(),
        }
    }
}

impl fmt::Display for OrchestrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationMode::Idle => write!(f, "idle"),
            OrchestrationMode::Discussion(session) => write!(
                f,
                "discussion (turn {}/{})",
                session.turn_index() + 1,
                session.turn_limit()
            ),
            OrchestrationMode::Podcast(player) => match player.script() {
                Some(script) => write!(f, "podcast (line {}/{})", player.cursor() + 1, script.len()),
                None => write!(f, "podcast"),
            },
        }
    }
}
