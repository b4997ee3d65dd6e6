//! Conversation domain
//!
//! The history shared by every agent in a session.

pub mod history;

pub use history::DiscussionHistory;
