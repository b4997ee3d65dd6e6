//! Ollama-backed Turn Generator
//!
//! Talks to an Ollama server's `/chat` endpoint (non-streaming). Prompt
//! construction lives in [`prompts`]; [`OllamaTurnGenerator`] picks the
//! prompt for each request and maps transport failures onto
//! [`GenerationError`](duet_application::GenerationError).

pub mod client;
mod generator;
pub mod prompts;

pub use client::{ChatMessage, ChatRole, OllamaClient};
pub use generator::OllamaTurnGenerator;
