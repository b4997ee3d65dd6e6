//! Source documents
//!
//! Every generation call names the document it should draw on. The
//! [`DocumentLibrary`] holds the loaded texts by id; adapters look them up
//! and cut excerpts to the configured character budget.

mod library;

pub use library::{Document, DocumentError, DocumentLibrary};
