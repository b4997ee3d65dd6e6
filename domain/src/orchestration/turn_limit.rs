//! Turn limit value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Total number of turns in a discussion, including the summary turn.
///
/// Always odd and at least 3: even values are rounded up, smaller values
/// become 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct TurnLimit(u32);

impl TurnLimit {
    pub const MIN: u32 = 3;

    pub fn new(requested: u32) -> Self {
        let limit = requested.max(Self::MIN);
        if limit % 2 == 0 {
            Self(limit.saturating_add(1))
        } else {
            Self(limit)
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Index of the last ordinary turn; the summary follows its commit.
    pub fn last_ordinary_index(&self) -> usize {
        (self.0 - 2) as usize
    }

    /// Number of ordinary (non-summary) turns
    pub fn ordinary_turns(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl Default for TurnLimit {
    fn default() -> Self {
        Self(5)
    }
}

impl From<u32> for TurnLimit {
    fn from(value: u32) -> Self {
        TurnLimit::new(value)
    }
}

impl From<TurnLimit> for u32 {
    fn from(limit: TurnLimit) -> Self {
        limit.0
    }
}

impl fmt::Display for TurnLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
