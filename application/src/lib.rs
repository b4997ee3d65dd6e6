//! Application layer for duet
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::OrchestratorConfig;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    narrator::{NarrationError, Narrator},
    progress::{NoProgress, ProgressNotifier},
    turn_generator::{
        GenerationError, PayloadKind, PodcastInterrupt, RouteRequest, TurnGenerator, TurnRequest,
        TurnResponse,
    },
};
pub use use_cases::interrupt::{InterruptKind, InterruptOutcome};
pub use use_cases::narration_queue::{NarrationOutcome, NarrationQueue};
pub use use_cases::orchestrator::Orchestrator;
pub use use_cases::shared::{OrchestratorContext, OrchestratorError, SessionState};
