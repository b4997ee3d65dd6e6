//! Turn Generator port
//!
//! Defines the interface to the text-generation backend: one call routes a
//! user prompt, the other produces a single agent turn (or a whole podcast
//! script).

use async_trait::async_trait;
use duet_domain::{AgentId, DomainError, ModelKind, RouteDecision};
use thiserror::Error;

/// Errors that can occur while generating text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Timeout")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl From<DomainError> for GenerationError {
    fn from(e: DomainError) -> Self {
        GenerationError::InvalidResponse(e.to_string())
    }
}

/// Context for a mid-podcast question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodcastInterrupt {
    /// The main episode's script text
    pub main_script: String,
    /// Line the episode will resume from
    pub resume_index: usize,
}

/// Everything the backend needs to produce one turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub document_id: String,
    pub instruction: String,
    pub speaker: AgentId,
    pub model_kind: ModelKind,
    pub history: Vec<String>,
    pub is_single_agent: bool,
    pub is_final_summary: bool,
    pub is_last_turn: bool,
    pub master_agent: AgentId,
    pub is_podcast_mode: bool,
    pub podcast_interrupt: Option<PodcastInterrupt>,
}

impl TurnRequest {
    pub fn new(
        document_id: impl Into<String>,
        instruction: impl Into<String>,
        speaker: AgentId,
        model_kind: ModelKind,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            instruction: instruction.into(),
            speaker,
            model_kind,
            history: Vec::new(),
            is_single_agent: false,
            is_final_summary: false,
            is_last_turn: false,
            master_agent: speaker,
            is_podcast_mode: false,
            podcast_interrupt: None,
        }
    }

    pub fn with_history(mut self, history: &[String]) -> Self {
        self.history = history.to_vec();
        self
    }

    pub fn single_agent(mut self, single: bool) -> Self {
        self.is_single_agent = single;
        self
    }

    pub fn summary(mut self, master: AgentId) -> Self {
        self.is_final_summary = true;
        self.is_last_turn = true;
        self.master_agent = master;
        self
    }

    pub fn podcast(mut self, interrupt: Option<PodcastInterrupt>) -> Self {
        self.is_podcast_mode = true;
        self.podcast_interrupt = interrupt;
        self
    }
}

/// What kind of payload a response carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// An ordinary agent turn
    Turn,
    /// A full podcast episode to be parsed into lines
    PodcastScript,
    /// A short Q&A script answering a mid-podcast question
    SideScript,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnResponse {
    pub text: String,
    pub confidence: Option<f32>,
    pub payload: PayloadKind,
}

impl TurnResponse {
    pub fn turn(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            confidence,
            payload: PayloadKind::Turn,
        }
    }
}

/// Prompt routing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub document_id: String,
    pub prompt: String,
    pub agents: Vec<AgentId>,
}

/// Gateway to the text-generation backend
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait TurnGenerator: Send + Sync {
    /// Decide how a user prompt should be handled
    async fn route(&self, request: &RouteRequest) -> Result<RouteDecision, GenerationError>;

    /// Produce one turn
    async fn generate(&self, request: &TurnRequest) -> Result<TurnResponse, GenerationError>;
}
