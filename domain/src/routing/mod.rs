//! Prompt routing
//!
//! Before a non-podcast turn the backend is asked how a prompt should be
//! handled: as a discussion, as separate per-agent instructions, or as a
//! direct question. The reply is loosely formatted JSON embedded in free
//! text; [`parse_route_decision`] extracts and validates it and
//! [`RouteDecision::plan`] turns it into something the orchestrator can run.

use crate::agent::entities::AgentId;
use crate::core::error::DomainError;
use crate::core::text::parse_agent_mentions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Instruction text returned by the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RevisedPrompt {
    /// One instruction for every responding agent
    Shared(String),
    /// A separate instruction per agent
    PerAgent(BTreeMap<AgentId, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub discussion_required: bool,
    pub initiator: Option<AgentId>,
    pub responding_agents: Vec<AgentId>,
    pub revised_prompt: RevisedPrompt,
}

/// What the orchestrator should run for a routed prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePlan {
    Discussion { initiator: AgentId, topic: String },
    /// Each agent answers once, in order
    Individual(Vec<(AgentId, String)>),
}

#[derive(Deserialize)]
struct RawRoute {
    #[serde(default)]
    discussion_required: bool,
    #[serde(default)]
    initiator_agent_id: Option<Value>,
    #[serde(default)]
    responding_agent_ids: Option<Vec<Value>>,
    #[serde(default)]
    revised_prompt: Option<Value>,
}

impl RouteDecision {
    /// A direct question answered by a single agent
    pub fn direct(agent: AgentId, prompt: impl Into<String>) -> Self {
        Self {
            discussion_required: false,
            initiator: Some(agent),
            responding_agents: vec![agent],
            revised_prompt: RevisedPrompt::Shared(prompt.into()),
        }
    }

    /// Instruction for `agent`.
    ///
    /// A per-agent map without an entry for `agent` falls back to the
    /// agent's part of the original prompt, then to the whole prompt.
    pub fn instruction_for(&self, agent: AgentId, original: &str, known: &[AgentId]) -> String {
        match &self.revised_prompt {
            RevisedPrompt::Shared(text) => text.clone(),
            RevisedPrompt::PerAgent(map) => map
                .get(&agent)
                .cloned()
                .or_else(|| parse_agent_mentions(original, known).remove(&agent))
                .unwrap_or_else(|| original.to_string()),
        }
    }

    /// Resolve the decision against the agents actually present.
    pub fn plan(&self, original: &str, known: &[AgentId]) -> RoutePlan {
        let initiator = self.initiator.filter(|id| known.contains(id));

        if known.len() > 1 && self.discussion_required {
            if let Some(initiator) = initiator {
                return RoutePlan::Discussion {
                    initiator,
                    topic: self.instruction_for(initiator, original, known),
                };
            }
        }

        let mut responders: Vec<AgentId> = Vec::new();
        for id in &self.responding_agents {
            if known.contains(id) && !responders.contains(id) {
                responders.push(*id);
            }
        }
        if responders.is_empty() {
            responders.push(initiator.unwrap_or(AgentId::FIRST));
        }

        RoutePlan::Individual(
            responders
                .into_iter()
                .map(|id| (id, self.instruction_for(id, original, known)))
                .collect(),
        )
    }
}

/// Extract the router's JSON object (first `{` to last `}`) and parse it.
///
/// A missing `revised_prompt` falls back to `original`.
pub fn parse_route_decision(text: &str, original: &str) -> Result<RouteDecision, DomainError> {
    let start = text
        .find('{')
        .ok_or_else(|| DomainError::InvalidRoute("no JSON object in router reply".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| DomainError::InvalidRoute("unterminated JSON object".to_string()))?;

    let raw: RawRoute = serde_json::from_str(&text[start..=end])
        .map_err(|e| DomainError::InvalidRoute(e.to_string()))?;

    let initiator = raw.initiator_agent_id.as_ref().and_then(agent_id_from_value);
    let responding_agents = raw
        .responding_agent_ids
        .unwrap_or_default()
        .iter()
        .filter_map(agent_id_from_value)
        .collect();

    let revised_prompt = match raw.revised_prompt {
        Some(Value::String(text)) if !text.trim().is_empty() => RevisedPrompt::Shared(text),
        Some(Value::Object(map)) => {
            let per_agent: BTreeMap<AgentId, String> = map
                .iter()
                .filter_map(|(key, value)| {
                    let id = AgentId::new(key.trim().parse().ok()?).ok()?;
                    Some((id, value.as_str()?.to_string()))
                })
                .collect();
            if per_agent.is_empty() {
                RevisedPrompt::Shared(original.to_string())
            } else {
                RevisedPrompt::PerAgent(per_agent)
            }
        }
        _ => RevisedPrompt::Shared(original.to_string()),
    };

    Ok(RouteDecision {
        discussion_required: raw.discussion_required,
        initiator,
        responding_agents,
        revised_prompt,
    })
}

fn agent_id_from_value(value: &Value) -> Option<AgentId> {
    let raw = match value {
        Value::Number(n) => u8::try_from(n.as_u64()?).ok()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    AgentId::new(raw).ok()
}
