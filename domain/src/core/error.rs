//! Domain error types

use crate::agent::entities::AgentId;
use crate::agent::model_kind::ModelKind;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid agent id: {0} (agents are numbered 1 or 2)")]
    InvalidAgentId(u8),

    #[error("Invalid model kind: {0}")]
    InvalidModelKind(String),

    #[error("Model kind '{0}' is already used by another agent")]
    DuplicateModelKind(ModelKind),

    #[error("At most two agents can take part")]
    RosterFull,

    #[error("The last remaining agent cannot be removed")]
    LastAgent,

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("A discussion needs two agents")]
    SingleAgentDiscussion,

    #[error("No valid agent turns found in script")]
    NoSpeakerLines,

    #[error("Invalid routing decision: {0}")]
    InvalidRoute(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(&'static str),
}

impl DomainError {
    /// Check if this error came from parsing generated text
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            DomainError::NoSpeakerLines | DomainError::InvalidRoute(_)
        )
    }
}
