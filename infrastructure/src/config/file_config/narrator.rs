//! Narrator configuration from TOML (`[narrator]` section)

use duet_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which narrator adapter speaks the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarratorBackend {
    /// Prints each line and waits as long as reading it aloud would take
    #[default]
    Paced,
    /// Runs an external text-to-speech command per line
    Command,
}

impl NarratorBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarratorBackend::Paced => "paced",
            NarratorBackend::Command => "command",
        }
    }
}

impl fmt::Display for NarratorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NarratorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paced" | "text" => Ok(NarratorBackend::Paced),
            "command" | "cmd" => Ok(NarratorBackend::Command),
            other => Err(format!("unknown narrator backend: {}", other)),
        }
    }
}

/// Raw narrator configuration from TOML
///
/// # Example
///
/// ```toml
/// [narrator]
/// backend = "command"
/// command = "espeak"
/// args = ["-v", "en", "{text}"]   # {text} and {speaker} are substituted
/// words_per_minute = 180          # speaking rate of the paced backend
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNarratorConfig {
    pub backend: String,
    pub command: String,
    pub args: Vec<String>,
    pub words_per_minute: u32,
}

impl Default for FileNarratorConfig {
    fn default() -> Self {
        Self {
            backend: NarratorBackend::Paced.to_string(),
            command: "espeak".to_string(),
            args: Vec::new(),
            words_per_minute: 180,
        }
    }
}

impl FileNarratorConfig {
    /// Parse the backend name. Unknown names are errors.
    pub fn parse_backend(&self) -> (NarratorBackend, Vec<ConfigIssue>) {
        let backend = match self.backend.parse::<NarratorBackend>() {
            Ok(backend) => backend,
            Err(_) => {
                let issue = ConfigIssue::error(
                    ConfigIssueCode::UnknownNarratorBackend,
                    format!(
                        "narrator.backend: unknown value '{}' (expected 'paced' or 'command')",
                        self.backend
                    ),
                );
                return (NarratorBackend::default(), vec![issue]);
            }
        };

        if backend == NarratorBackend::Command && self.command.trim().is_empty() {
            let issue = ConfigIssue::error(
                ConfigIssueCode::EmptyNarratorCommand,
                "narrator.command: the command backend needs a program to run",
            );
            return (backend, vec![issue]);
        }
        (backend, vec![])
    }
}
