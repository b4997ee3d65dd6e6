//! Raw TOML configuration data types
//!
//! These structs mirror the config file section by section. Each section
//! parses its own strings into domain types and reports problems as
//! [`ConfigIssue`]s instead of failing on the first one.

mod agents;
mod discussion;
mod generator;
mod logging;
mod narrator;

pub use agents::FileAgentsConfig;
pub use discussion::FileDiscussionConfig;
pub use generator::FileGeneratorConfig;
pub use logging::FileLoggingConfig;
pub use narrator::{FileNarratorConfig, NarratorBackend};

use duet_domain::ConfigIssue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("invalid configuration:\n{}", render_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn render_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Agent roster
    pub agents: FileAgentsConfig,
    /// Discussion length and pacing
    pub discussion: FileDiscussionConfig,
    /// Text-generation backend
    pub generator: FileGeneratorConfig,
    /// Speech output
    pub narrator: FileNarratorConfig,
    /// Structured conversation log
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.agents.parse_models().1);
        issues.extend(self.discussion.turn_limit().1);
        issues.extend(self.generator.validate());
        issues.extend(self.narrator.parse_backend().1);
        issues
    }

    /// Split issues into warnings to print and a hard failure.
    ///
    /// Returns the warnings when no issue is an error.
    pub fn check(&self) -> Result<Vec<ConfigIssue>, ConfigValidationError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            self.validate().into_iter().partition(ConfigIssue::is_error);
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigValidationError::Invalid(errors))
        }
    }
}
