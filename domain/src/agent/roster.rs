//! Agent roster (Aggregate)
//!
//! Holds one or two agents with dense ids starting at 1. Removing an agent
//! from a pair renumbers the survivor to agent 1.

use crate::agent::entities::{Agent, AgentId, Message};
use crate::agent::model_kind::ModelKind;
use crate::core::error::DomainError;

/// Maximum number of agents taking part in a conversation
pub const MAX_AGENTS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentRoster {
    agents: Vec<Agent>,
}

impl AgentRoster {
    /// Create a roster with a single agent of the given kind
    pub fn new(kind: ModelKind) -> Self {
        Self {
            agents: vec![Agent::new(AgentId::FIRST, kind)],
        }
    }

    /// Create a roster from a list of kinds (1 or 2, distinct)
    pub fn from_kinds(kinds: &[ModelKind]) -> Result<Self, DomainError> {
        let (first, rest) = kinds
            .split_first()
            .ok_or(DomainError::InvalidTransition("a roster needs at least one agent"))?;
        let mut roster = Self::new(*first);
        for kind in rest {
            roster.add(*kind)?;
        }
        Ok(roster)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(Agent::id).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.agents.len() == 1
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id() == id)
    }

    pub fn model_kind(&self, id: AgentId) -> Result<ModelKind, DomainError> {
        self.get(id)
            .map(Agent::model_kind)
            .ok_or(DomainError::UnknownAgent(id))
    }

    /// Add a second agent. Its kind must differ from the first agent's.
    pub fn add(&mut self, kind: ModelKind) -> Result<AgentId, DomainError> {
        if self.agents.len() >= MAX_AGENTS {
            return Err(DomainError::RosterFull);
        }
        if self.agents.iter().any(|a| a.model_kind() == kind) {
            return Err(DomainError::DuplicateModelKind(kind));
        }
        let id = AgentId::new(self.agents.len() as u8 + 1)?;
        self.agents.push(Agent::new(id, kind));
        Ok(id)
    }

    /// Remove an agent from a pair; the survivor becomes agent 1.
    pub fn remove(&mut self, id: AgentId) -> Result<(), DomainError> {
        if self.agents.len() <= 1 {
            return Err(DomainError::LastAgent);
        }
        let index = self
            .agents
            .iter()
            .position(|a| a.id() == id)
            .ok_or(DomainError::UnknownAgent(id))?;
        self.agents.remove(index);
        for (i, agent) in self.agents.iter_mut().enumerate() {
            agent.set_id(AgentId::new(i as u8 + 1)?);
        }
        Ok(())
    }

    /// Change an agent's kind; the other agent must not already use it.
    pub fn set_model(&mut self, id: AgentId, kind: ModelKind) -> Result<(), DomainError> {
        if self
            .agents
            .iter()
            .any(|a| a.id() != id && a.model_kind() == kind)
        {
            return Err(DomainError::DuplicateModelKind(kind));
        }
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or(DomainError::UnknownAgent(id))?;
        agent.set_model_kind(kind);
        Ok(())
    }

    pub fn append(&mut self, id: AgentId, message: Message) -> Result<(), DomainError> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or(DomainError::UnknownAgent(id))?;
        agent.push(message);
        Ok(())
    }

    /// Append a message to every agent's transcript
    pub fn broadcast(&mut self, message: Message) {
        for agent in &mut self.agents {
            agent.push(message.clone());
        }
    }

    pub fn clear_transcripts(&mut self) {
        for agent in &mut self.agents {
            agent.clear_transcript();
        }
    }

    pub fn has_messages(&self) -> bool {
        self.agents.iter().any(|a| !a.transcript().is_empty())
    }
}
