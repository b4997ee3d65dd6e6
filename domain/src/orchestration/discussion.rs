//! Discussion session (Aggregate)
//!
//! A bounded exchange between two agents:
//!
//! ```text
//! Active(0) -> Active(1) -> ... -> Active(limit - 2) -> Summarizing -> Finished
//! ```
//!
//! The initiator opens at turn 0, speakers alternate by rotating the
//! participant order, and once the turn at index `limit - 2` has been
//! committed the initiator gives exactly one final summary.

use crate::agent::entities::AgentId;
use crate::core::error::DomainError;
use crate::orchestration::turn_limit::TurnLimit;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionPhase {
    Active,
    Summarizing,
    Finished,
}

/// The turn a session expects next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnSlot {
    pub speaker: AgentId,
    pub turn_index: usize,
    pub is_final_summary: bool,
    pub is_last_turn: bool,
}

impl TurnSlot {
    /// Whether this is the opening turn that answers the user directly
    pub fn is_opening(&self) -> bool {
        self.turn_index == 0 && !self.is_final_summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionSession {
    participants: Vec<AgentId>,
    turn_index: usize,
    turn_limit: TurnLimit,
    phase: DiscussionPhase,
    topic: String,
}

impl DiscussionSession {
    /// Start a discussion opened by `initiator`.
    ///
    /// `agents` is the full roster; it is rotated so the initiator comes
    /// first.
    pub fn start(
        initiator: AgentId,
        agents: &[AgentId],
        turn_limit: TurnLimit,
        topic: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if agents.len() < 2 {
            return Err(DomainError::SingleAgentDiscussion);
        }
        let pivot = agents
            .iter()
            .position(|id| *id == initiator)
            .ok_or(DomainError::UnknownAgent(initiator))?;
        let mut participants = agents.to_vec();
        participants.rotate_left(pivot);

        Ok(Self {
            participants,
            turn_index: 0,
            turn_limit,
            phase: DiscussionPhase::Active,
            topic: topic.into(),
        })
    }

    /// The agent that opened the discussion; `None` once aborted
    pub fn initiator(&self) -> Option<AgentId> {
        self.participants.first().copied()
    }

    pub fn participants(&self) -> &[AgentId] {
        &self.participants
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    pub fn turn_limit(&self) -> TurnLimit {
        self.turn_limit
    }

    pub fn phase(&self) -> DiscussionPhase {
        self.phase
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_active(&self) -> bool {
        self.phase != DiscussionPhase::Finished
    }

    /// The next turn to generate, or `None` once the summary has committed
    pub fn current_slot(&self) -> Option<TurnSlot> {
        match self.phase {
            DiscussionPhase::Active => Some(TurnSlot {
                speaker: self.participants[self.turn_index % self.participants.len()],
                turn_index: self.turn_index,
                is_final_summary: false,
                is_last_turn: false,
            }),
            DiscussionPhase::Summarizing => Some(TurnSlot {
                speaker: self.initiator()?,
                turn_index: self.turn_index + 1,
                is_final_summary: true,
                is_last_turn: true,
            }),
            DiscussionPhase::Finished => None,
        }
    }

    /// Record that the current slot's text was committed and advance.
    pub fn commit_turn(&mut self) -> Result<DiscussionPhase, DomainError> {
        self.phase = match self.phase {
            DiscussionPhase::Active if self.turn_index >= self.turn_limit.last_ordinary_index() => {
                DiscussionPhase::Summarizing
            }
            DiscussionPhase::Active => {
                self.turn_index += 1;
                DiscussionPhase::Active
            }
            DiscussionPhase::Summarizing => DiscussionPhase::Finished,
            DiscussionPhase::Finished => {
                return Err(DomainError::InvalidTransition(
                    "discussion already finished",
                ));
            }
        };
        Ok(self.phase)
    }

    /// Abort on failure or interrupt. The session keeps no participants.
    pub fn abort(&mut self) {
        self.phase = DiscussionPhase::Finished;
        self.turn_index = 0;
        self.participants.clear();
    }
}
