//! Agent roster configuration from TOML (`[agents]` section)

use duet_domain::{ConfigIssue, ConfigIssueCode, MAX_AGENTS, ModelKind};
use serde::{Deserialize, Serialize};

/// Raw roster configuration from TOML
///
/// # Example
///
/// ```toml
/// [agents]
/// models = ["critical", "analytical"]   # one or two distinct kinds
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentsConfig {
    /// Model kind of each agent, in id order
    pub models: Vec<String>,
}

impl Default for FileAgentsConfig {
    fn default() -> Self {
        Self {
            models: vec!["critical".to_string(), "analytical".to_string()],
        }
    }
}

impl FileAgentsConfig {
    /// Parse the configured kinds, dropping unknown names and duplicates.
    pub fn parse_models(&self) -> (Vec<ModelKind>, Vec<ConfigIssue>) {
        let mut kinds: Vec<ModelKind> = Vec::new();
        let mut issues = Vec::new();

        for name in &self.models {
            match name.parse::<ModelKind>() {
                Ok(kind) if kinds.contains(&kind) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateModelKind,
                    format!("agents.models: '{}' is configured twice", kind),
                )),
                Ok(kind) => kinds.push(kind),
                Err(_) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnknownModelKind,
                    format!(
                        "agents.models: unknown kind '{}' (expected one of: {})",
                        name,
                        ModelKind::ALL.map(|k| k.as_str()).join(", ")
                    ),
                )),
            }
        }

        if kinds.len() > MAX_AGENTS {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::TooManyAgents,
                format!(
                    "agents.models: {} agents configured, at most {} are supported",
                    kinds.len(),
                    MAX_AGENTS
                ),
            ));
            kinds.truncate(MAX_AGENTS);
        }
        if self.models.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::NoAgents,
                "agents.models: at least one agent is required",
            ));
        }

        (kinds, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(models: &[&str]) -> FileAgentsConfig {
        FileAgentsConfig {
            models: models.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_pair() {
        let (kinds, issues) = FileAgentsConfig::default().parse_models();
        assert_eq!(kinds, vec![ModelKind::Critical, ModelKind::Analytical]);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let (kinds, issues) = config(&["Creative"]).parse_models();
        assert_eq!(kinds, vec![ModelKind::Creative]);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_unknown_and_duplicate_kinds() {
        let (kinds, issues) = config(&["critical", "poetic", "critical"]).parse_models();
        assert_eq!(kinds, vec![ModelKind::Critical]);
        let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                ConfigIssueCode::UnknownModelKind,
                ConfigIssueCode::DuplicateModelKind
            ]
        );
        assert!(issues.iter().all(ConfigIssue::is_error));
    }

    #[test]
    fn test_too_many_and_none() {
        let (kinds, issues) = config(&["critical", "creative", "practical"]).parse_models();
        assert_eq!(kinds.len(), 2);
        assert_eq!(issues[0].code, ConfigIssueCode::TooManyAgents);

        let (kinds, issues) = config(&[]).parse_models();
        assert!(kinds.is_empty());
        assert_eq!(issues[0].code, ConfigIssueCode::NoAgents);
    }
}
