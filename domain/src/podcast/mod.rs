//! Podcast domain
//!
//! Script parsing and the resumable player state machine.

pub mod player;
pub mod script;

pub use player::{Advance, PlaybackStep, PodcastPlayer, PodcastState, ScriptSource};
pub use script::{PodcastScript, ScriptLine};
