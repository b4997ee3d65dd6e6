//! Discussion configuration from TOML (`[discussion]` section)

use duet_domain::{ConfigIssue, ConfigIssueCode, TurnLimit};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw discussion configuration from TOML
///
/// # Example
///
/// ```toml
/// [discussion]
/// turn_limit = 5        # odd, at least 3; other values are adjusted
/// summary_pause_ms = 0  # delay before the closing summary is generated
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDiscussionConfig {
    pub turn_limit: u32,
    pub summary_pause_ms: u64,
}

impl Default for FileDiscussionConfig {
    fn default() -> Self {
        Self {
            turn_limit: TurnLimit::default().get(),
            summary_pause_ms: 0,
        }
    }
}

impl FileDiscussionConfig {
    /// Normalise the configured turn limit, warning when it changes.
    pub fn turn_limit(&self) -> (TurnLimit, Vec<ConfigIssue>) {
        let limit = TurnLimit::new(self.turn_limit);
        if limit.get() == self.turn_limit {
            return (limit, vec![]);
        }
        let issue = ConfigIssue::warning(
            ConfigIssueCode::TurnLimitAdjusted,
            format!(
                "discussion.turn_limit: {} adjusted to {} (must be odd and at least {})",
                self.turn_limit,
                limit,
                TurnLimit::MIN
            ),
        );
        (limit, vec![issue])
    }

    pub fn summary_pause(&self) -> Duration {
        Duration::from_millis(self.summary_pause_ms)
    }
}
