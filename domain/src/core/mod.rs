//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`text`]: normalising generated text for display and narration

pub mod error;
pub mod text;
