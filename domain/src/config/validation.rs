//! Configuration issue reporting.
//!
//! Loaders collect every problem they find instead of stopping at the first
//! one. Errors abort start-up; warnings are printed and the value is
//! corrected.

use std::fmt;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the value was adjusted or ignored.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A model kind name that is not one of the four personas.
    UnknownModelKind,
    /// Two agents configured with the same model kind.
    DuplicateModelKind,
    /// More than two agents configured.
    TooManyAgents,
    /// No agent configured at all.
    NoAgents,
    /// Turn limit was even or below 3 and will be normalised.
    TurnLimitAdjusted,
    /// Narrator backend name not recognised.
    UnknownNarratorBackend,
    /// Command narrator without a command to run.
    EmptyNarratorCommand,
    /// A character limit of zero would send no document at all.
    ZeroCharLimit,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}
