//! Model kind value object: the persona an agent speaks with

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Sampling parameters sent to the text-generation backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub num_predict: u32,
    pub repeat_penalty: f32,
}

/// Persona of an agent (Value Object)
///
/// Each agent in a roster uses a distinct kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Critical,
    Analytical,
    Creative,
    Practical,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Critical,
        ModelKind::Analytical,
        ModelKind::Creative,
        ModelKind::Practical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Critical => "critical",
            ModelKind::Analytical => "analytical",
            ModelKind::Creative => "creative",
            ModelKind::Practical => "practical",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::Critical => "Critical Thinker",
            ModelKind::Analytical => "Analytical Thinker",
            ModelKind::Creative => "Creative Thinker",
            ModelKind::Practical => "Practical Thinker",
        }
    }

    pub fn sampling(&self) -> SamplingParams {
        match self {
            ModelKind::Critical => SamplingParams {
                temperature: 0.4,
                top_p: 0.8,
                top_k: 40,
                num_predict: 512,
                repeat_penalty: 1.1,
            },
            ModelKind::Analytical => SamplingParams {
                temperature: 0.5,
                top_p: 0.85,
                top_k: 40,
                num_predict: 512,
                repeat_penalty: 1.1,
            },
            ModelKind::Creative => SamplingParams {
                temperature: 0.9,
                top_p: 0.95,
                top_k: 60,
                num_predict: 512,
                repeat_penalty: 1.1,
            },
            ModelKind::Practical => SamplingParams {
                temperature: 0.65,
                top_p: 0.9,
                top_k: 50,
                num_predict: 512,
                repeat_penalty: 1.1,
            },
        }
    }

    /// One-line description of the thinking style
    pub fn theme(&self) -> &'static str {
        match self {
            ModelKind::Critical => {
                "Analyze information objectively and make reasoned judgments: identify problems, \
                 evaluate evidence and consider different perspectives."
            }
            ModelKind::Analytical => {
                "Break complex information into smaller, manageable parts to understand their \
                 relationships and identify patterns."
            }
            ModelKind::Creative => {
                "Think outside the box and come up with unique, effective solutions and answers."
            }
            ModelKind::Practical => {
                "Weigh the situation and the available resources, and favour decisions that lead \
                 to tangible results."
            }
        }
    }

    /// Word used in the "use your ... theme" rule
    fn theme_word(&self) -> &'static str {
        match self {
            ModelKind::Critical => "critical thinking",
            ModelKind::Analytical => "analytical thinking",
            ModelKind::Creative => "creative thinking",
            ModelKind::Practical => "practical thinking",
        }
    }

    /// System prompt for an agent of this kind
    pub fn system_prompt(&self, agent_label: &str) -> String {
        format!(
            "You are {agent}, {article} {word} AI assistant. {theme}\n\n\
             STRICT RULES:\n\
             - You are {agent}. Never answer questions addressed to a different agent, and do not \
             mention your own agent name while answering.\n\
             - In a multi-agent discussion, if another agent asked you a direct question in the \
             previous turn, answer that question first.\n\
             - You may disagree with previous agents when you have a better answer.\n\
             - After answering, give your own view or insight on the topic, then ask another agent \
             a relevant question unless the discussion is concluding.\n\
             - If the user asks a direct or factual question, answer it directly and concisely.\n\
             - Use your {word} theme ONLY if the user asks you to discuss, explain, summarize, give \
             your view or analyze.\n\
             - Never ask follow-up questions to the user unless the user requests a discussion.\n\
             - If no other agents are specified in the prompt do not ask any questions.\n\
             - Do not mention your agent type or theme unless asked.\n\
             - Sound natural and human-like, but never add content the user did not request.",
            agent = agent_label,
            article = if matches!(self, ModelKind::Analytical) { "an" } else { "a" },
            word = self.theme_word(),
            theme = self.theme(),
        )
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(ModelKind::Critical),
            "analytical" => Ok(ModelKind::Analytical),
            "creative" => Ok(ModelKind::Creative),
            "practical" => Ok(ModelKind::Practical),
            other => Err(DomainError::InvalidModelKind(other.to_string())),
        }
    }
}
