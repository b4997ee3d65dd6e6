//! Agent entities: identity, messages and per-agent transcripts

use crate::agent::model_kind::ModelKind;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Identifier of an agent (Value Object)
///
/// Ids are dense: a roster holds agent 1, or agents 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AgentId(u8);

impl AgentId {
    pub const FIRST: AgentId = AgentId(1);
    pub const SECOND: AgentId = AgentId(2);

    pub fn new(id: u8) -> Result<Self, DomainError> {
        match id {
            1 | 2 => Ok(Self(id)),
            other => Err(DomainError::InvalidAgentId(other)),
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// The speaker label used in scripts and history lines ("Agent 1")
    pub fn label(&self) -> String {
        format!("Agent {}", self.0)
    }
}

impl TryFrom<u8> for AgentId {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        AgentId::new(value)
    }
}

impl From<AgentId> for u8 {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Agent {}", self.0)
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// A single transcript entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub confidence: Option<f32>,
    pub is_final_summary: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            confidence: None,
            is_final_summary: false,
        }
    }

    pub fn agent(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            role: Role::Agent,
            text: text.into(),
            confidence,
            is_final_summary: false,
        }
    }

    pub fn summary(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            is_final_summary: true,
            ..Self::agent(text, confidence)
        }
    }
}

/// A conversational agent (Entity)
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    id: AgentId,
    model_kind: ModelKind,
    transcript: Vec<Message>,
}

impl Agent {
    pub fn new(id: AgentId, model_kind: ModelKind) -> Self {
        Self {
            id,
            model_kind,
            transcript: Vec::new(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model_kind
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub(crate) fn set_id(&mut self, id: AgentId) {
        self.id = id;
    }

    pub(crate) fn set_model_kind(&mut self, kind: ModelKind) {
        self.model_kind = kind;
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.transcript.push(message);
    }

    pub(crate) fn clear_transcript(&mut self) {
        self.transcript.clear();
    }
}
