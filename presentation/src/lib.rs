//! Presentation layer for duet
//!
//! This crate contains the CLI definition, console formatting, the
//! progress renderer, and the interactive REPL.

pub mod cli;
pub mod output;
pub mod progress;
pub mod repl;

// Re-export commonly used types
pub use cli::commands::{Cli, NarratorChoice};
pub use output::console::ConsoleFormatter;
pub use progress::console::ConsoleProgress;
pub use repl::{Repl, ReplCommand};
