//! Domain layer for duet
//!
//! This crate contains the pure state machines and value objects behind a
//! narrated two-agent conversation. It performs no I/O and knows nothing
//! about text-generation or speech backends.
//!
//! # Core Concepts
//!
//! ## Epoch
//!
//! Every asynchronous operation captures the current [`Epoch`] before it
//! starts. An interruption bumps the epoch, and any result stamped with an
//! older value is dropped without touching state.
//!
//! ## Discussion
//!
//! A [`DiscussionSession`] alternates two agents for `turn_limit - 1`
//! ordinary turns, then the initiator closes with one summary.
//!
//! ## Podcast
//!
//! A [`PodcastPlayer`] plays a parsed [`PodcastScript`] line by line. A
//! soft interrupt suspends it, a side script answers the interruption, and
//! the episode resumes at the line that was cut off.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod core;
pub mod orchestration;
pub mod podcast;
pub mod routing;

// Re-export commonly used types
pub use agent::{
    entities::{Agent, AgentId, Message, Role},
    model_kind::{ModelKind, SamplingParams},
    roster::{AgentRoster, MAX_AGENTS},
};
pub use config::{ConfigIssue, ConfigIssueCode, Severity};
pub use conversation::DiscussionHistory;
pub use core::{
    error::DomainError,
    text::{format_for_speech, heuristic_confidence, parse_agent_mentions},
};
pub use orchestration::{
    discussion::{DiscussionPhase, DiscussionSession, TurnSlot},
    epoch::{Epoch, EpochGuard},
    mode::OrchestrationMode,
    narration::NarrationItem,
    status::{ActivitySnapshot, AgentStatus},
    turn_limit::TurnLimit,
};
pub use podcast::{Advance, PlaybackStep, PodcastPlayer, PodcastScript, PodcastState, ScriptLine, ScriptSource};
pub use routing::{RevisedPrompt, RouteDecision, RoutePlan, parse_route_decision};
