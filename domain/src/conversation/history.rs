//! Discussion history (Entity)
//!
//! The shared, append-only context threaded into every generation call.
//! Lines read `"User: ..."` or `"Agent N: ..."` (`"Agent: ..."` when only one
//! agent takes part).

use crate::agent::entities::AgentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionHistory {
    lines: Vec<String>,
}

impl DiscussionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: &str) {
        self.lines.push(format!("User: {}", text));
    }

    /// Append an agent line. `None` means the single-agent form without an id.
    pub fn push_agent(&mut self, speaker: Option<AgentId>, text: &str) {
        let line = match speaker {
            Some(id) => format!("{}: {}", id.label(), text),
            None => format!("Agent: {}", text),
        };
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The most recent user prompt, if any
    pub fn last_user_prompt(&self) -> Option<&str> {
        self.lines
            .iter()
            .rev()
            .find_map(|line| line.strip_prefix("User:").map(str::trim))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
