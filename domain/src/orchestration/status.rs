//! Per-agent status projection
//!
//! Derived, read-only view for presentation. Priority, highest first:
//! listening (system-wide), speaking, thinking, idle.

use crate::agent::entities::AgentId;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Listening,
    Thinking,
    Speaking,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentStatus::Idle => "Idle",
            AgentStatus::Listening => "Listening",
            AgentStatus::Thinking => "Thinking",
            AgentStatus::Speaking => "Speaking",
        };
        write!(f, "{}", label)
    }
}

/// Activity flags the status is derived from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub listening: bool,
    pub speaking: Option<AgentId>,
    pub thinking: BTreeSet<AgentId>,
}

impl ActivitySnapshot {
    pub fn status_of(&self, agent: AgentId) -> AgentStatus {
        if self.listening {
            AgentStatus::Listening
        } else if self.speaking == Some(agent) {
            AgentStatus::Speaking
        } else if self.thinking.contains(&agent) {
            AgentStatus::Thinking
        } else {
            AgentStatus::Idle
        }
    }

    /// Status of every listed agent, in order
    pub fn project(&self, agents: &[AgentId]) -> Vec<(AgentId, AgentStatus)> {
        agents
            .iter()
            .map(|id| (*id, self.status_of(*id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listening_overrides_everything() {
        let snapshot = ActivitySnapshot {
            listening: true,
            speaking: Some(AgentId::FIRST),
            thinking: BTreeSet::from([AgentId::SECOND]),
        };
        assert_eq!(snapshot.status_of(AgentId::FIRST), AgentStatus::Listening);
        assert_eq!(snapshot.status_of(AgentId::SECOND), AgentStatus::Listening);
    }

    #[test]
    fn test_speaking_and_thinking() {
        let snapshot = ActivitySnapshot {
            listening: false,
            speaking: Some(AgentId::FIRST),
            thinking: BTreeSet::from([AgentId::FIRST, AgentId::SECOND]),
        };
        assert_eq!(
            snapshot.project(&[AgentId::FIRST, AgentId::SECOND]),
            vec![
                (AgentId::FIRST, AgentStatus::Speaking),
                (AgentId::SECOND, AgentStatus::Thinking)
            ]
        );
    }

    #[test]
    fn test_default_is_idle() {
        assert_eq!(
            ActivitySnapshot::default().status_of(AgentId::SECOND),
            AgentStatus::Idle
        );
    }
}
