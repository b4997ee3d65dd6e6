//! Configuration value objects for the domain layer
//!
//! Shared by the loaders in infrastructure and the start-up code in the
//! binary.

pub mod validation;

pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
