//! Infrastructure layer for duet
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the Ollama-backed Turn Generator, the narrators, the
//! JSONL conversation logger, plus document and configuration loading.

pub mod config;
pub mod document;
pub mod logging;
pub mod narrator;
pub mod ollama;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileAgentsConfig, FileConfig, FileDiscussionConfig,
    FileGeneratorConfig, FileLoggingConfig, FileNarratorConfig, NarratorBackend,
};
pub use document::{Document, DocumentError, DocumentLibrary};
pub use logging::JsonlConversationLogger;
pub use narrator::{CommandNarrator, PacedNarrator};
pub use ollama::{OllamaClient, OllamaTurnGenerator};
