//! Text-generation backend configuration from TOML (`[generator]` section)

use duet_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw generator configuration from TOML
///
/// # Example
///
/// ```toml
/// [generator]
/// base_url = "http://localhost:11434/api"
/// model = "llama3"
/// document_char_limit = 8000   # document excerpt sent with each turn
/// router_char_limit = 4000     # document excerpt sent to the router
/// request_timeout_secs = 120
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub document_char_limit: usize,
    pub router_char_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for FileGeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/api".to_string(),
            model: "llama3".to_string(),
            document_char_limit: 8000,
            router_char_limit: 4000,
            request_timeout_secs: 120,
        }
    }
}

impl FileGeneratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for (field, value) in [
            ("document_char_limit", self.document_char_limit),
            ("router_char_limit", self.router_char_limit),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroCharLimit,
                    format!("generator.{}: must be greater than 0", field),
                ));
            }
        }
        issues
    }
}
