//! Prompt construction
//!
//! Every builder returns the full message list for one `/chat` call. The
//! document excerpt is always cut by the caller.

use super::client::ChatMessage;
use duet_application::{PodcastInterrupt, TurnRequest};
use duet_domain::{PodcastScript, SamplingParams};
use regex::Regex;
use std::sync::LazyLock;

/// Reply used instead of a backend call when the document has no text.
pub const EMPTY_DOCUMENT_REPLY: &str = "The document has very little data to analyze or I am not able to answer based on the document.";

const DOCUMENT_GUIDANCE: &str = "The following document content should be used as the primary source for your answers. Only use your own knowledge to supplement or clarify if needed.";

/// Sampling for podcast and side scripts: looser than any persona.
pub const PODCAST_SAMPLING: SamplingParams = SamplingParams {
    temperature: 0.85,
    top_p: 0.95,
    top_k: 60,
    num_predict: 1024,
    repeat_penalty: 1.1,
};

/// Side scripts are short.
pub const SIDE_SCRIPT_SAMPLING: SamplingParams = SamplingParams {
    num_predict: 384,
    ..PODCAST_SAMPLING
};

const ROUTER_SYSTEM_PROMPT: &str = r#"You are a prompt router for a two-agent assistant. Given a user prompt and document content, answer ONLY with strict JSON:
{
  "discussion_required": true/false,
  "initiator_agent_id": 1 or 2,
  "responding_agent_ids": [agent numbers in answering order],
  "revised_prompt": "<string>" or {"1": "<instruction>", "2": "<instruction>"}
}
Rules:
- If the user wants the agents to discuss, or one agent to ask the other, set discussion_required to true. The initiator is the agent asked to start or to ask, not the agent being asked about.
- If the user gives separate instructions to different agents, this is NOT a discussion. Set discussion_required to false, initiator_agent_id to the first agent mentioned, responding_agent_ids to every addressed agent in order, and revised_prompt to an object mapping each agent number (as a string) to its own instruction.
- If the user addresses a single agent, answer with that agent only and put its instruction in revised_prompt.
- If no agent is mentioned, agent 1 answers: initiator_agent_id 1, responding_agent_ids [1], revised_prompt the user prompt.
- Output valid JSON and nothing else.
Examples:
User: Agent 2 ask Agent 1 about the findings.
Output: {"discussion_required": true, "initiator_agent_id": 2, "responding_agent_ids": [2, 1], "revised_prompt": "Ask Agent 1 about the findings."}
User: Let the agents discuss the implications of AI.
Output: {"discussion_required": true, "initiator_agent_id": 1, "responding_agent_ids": [1, 2], "revised_prompt": "Discuss the implications of AI."}
User: Who wrote this document?
Output: {"discussion_required": false, "initiator_agent_id": 1, "responding_agent_ids": [1], "revised_prompt": "Who wrote this document?"}
User: Agent 1 give me 3 key points and Agent 2 tell me the future consequences.
Output: {"discussion_required": false, "initiator_agent_id": 1, "responding_agent_ids": [1, 2], "revised_prompt": {"1": "Give me 3 key points from the document.", "2": "Tell me the future consequences."}}
User: Agent 2, could you explain your reasoning?
Output: {"discussion_required": false, "initiator_agent_id": 2, "responding_agent_ids": [2], "revised_prompt": "Could you explain your reasoning?"}"#;

const PODCAST_SYSTEM_PROMPT: &str = "You are an expert podcast scriptwriter. Given a topic, write a natural, engaging podcast conversation between two hosts, Agent 1 and Agent 2.
- Agent 1 opens with a brief, friendly introduction.
- Use ONLY the speaker labels \"Agent 1:\" and \"Agent 2:\", one turn per line. Nobody else speaks.
- Write dialogue only: no section headings, stage directions or sound cues.
- Alternate between the hosts, each responding naturally to the other, with transitions and occasional light banter.
- Cover the topic in depth, as two knowledgeable people would.
- End with a friendly wrap-up.
- Never mention that the script is generated.";

const SIDE_SCRIPT_SYSTEM_PROMPT: &str = "You are the same two podcast hosts, Agent 1 and Agent 2. A listener has just interrupted the episode with a question.
- Answer the question in a short exchange of two to four lines, using only the labels \"Agent 1:\" and \"Agent 2:\".
- Ground the answer in the document and in what the episode has covered so far.
- Finish with one line that hands back to the episode, for example \"Now, back to where we were.\"
- Write dialogue only, with no headings.";

static QUESTION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([A-Z][^\n.!?]*\?)").ok());

fn document_messages(system_prompt: String, document: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::system(DOCUMENT_GUIDANCE),
        ChatMessage::user(format!("Document Content:\n{}", document)),
    ]
}

/// Replay history: agent lines as the assistant, everything else as the user.
fn push_history(messages: &mut Vec<ChatMessage>, history: &[String]) {
    messages.extend(history.iter().map(|line| {
        if line.starts_with("Agent") {
            ChatMessage::assistant(line.clone())
        } else {
            ChatMessage::user(line.clone())
        }
    }));
}

pub fn router(prompt: &str, document: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ROUTER_SYSTEM_PROMPT),
        ChatMessage::user(format!("Document: {}\nPrompt: {}", document, prompt)),
    ]
}

/// An ordinary turn: a direct answer or one step of a discussion.
pub fn agent_turn(request: &TurnRequest, document: &str) -> Vec<ChatMessage> {
    let mut messages = document_messages(
        request.model_kind.system_prompt(&request.speaker.label()),
        document,
    );
    push_history(&mut messages, &request.history);

    let instruction = if request.is_single_agent {
        format!(
            "Current Instruction: {}\n\nIMPORTANT: You are the ONLY agent. Provide a single, \
             well-structured response. Do not ask questions, do not mention other agents, and do \
             not break this into multiple responses.",
            request.instruction
        )
    } else {
        format!(
            "Discussion History:\n{}\n\nCurrent Instruction: {}\n\nRemember: You are {}. Respond \
             to the current instruction or any questions directed to you. Keep your response \
             focused and concise.",
            request.history.join("\n"),
            request.instruction,
            request.speaker.label()
        )
    };
    messages.push(ChatMessage::user(instruction));
    messages
}

/// The closing turn of a discussion, spoken by the master agent.
pub fn summary(request: &TurnRequest, document: &str) -> Vec<ChatMessage> {
    let mut messages = document_messages(
        request.model_kind.system_prompt(&request.master_agent.label()),
        document,
    );
    push_history(&mut messages, &request.history);

    let mut prompt = String::new();
    if let Some(question) = request.history.last().and_then(|line| last_question(line)) {
        prompt.push_str(&format!(
            "The previous agent asked: '{}' Please answer this question first in your summary.\n",
            question
        ));
    }
    prompt.push_str(
        "The above is a discussion between two agents. As the master agent, your FINAL response \
         should:\n\
         - First answer the question raised by the previous agent, starting with \"Answering your \
         previous question:\".\n\
         - List all important points, insights and takeaways from the discussion and the document.\n\
         - Include any consensus, disagreements and final recommendations.\n\
         - Be a complete, self-contained summary for the user.\n\
         - Not ask the user or the other agent anything, and not continue the discussion.\n\
         - Be written in a conversational style without leaving anything important out.\n\
         - Answer any question an agent asked that went unanswered.",
    );
    if let Some(initial) = initial_user_prompt(&request.history) {
        prompt.push_str(&format!(
            "\n\nFinally, carefully read the user's initial prompt again: '{}'. Based on everything \
             discussed and the document, give a conclusive result, solution or recommendation that \
             directly addresses it. If the user asked for a specific kind of conclusion, end with \
             exactly that.",
            initial
        ));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

pub fn podcast_script(topic: &str, document: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(PODCAST_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Podcast Topic: {}\n\nDocument Content (for reference):\n{}",
            topic, document
        )),
    ]
}

/// A short answer to a question asked mid-episode.
///
/// Only the part of the episode already played is shown, so the hosts
/// don't spoil what comes after the resume point.
pub fn side_script(question: &str, interrupt: &PodcastInterrupt, document: &str) -> Vec<ChatMessage> {
    let played: Vec<String> = PodcastScript::parse(&interrupt.main_script)
        .map(|script| {
            script
                .lines()
                .iter()
                .take(interrupt.resume_index + 1)
                .map(|line| format!("{}: {}", line.speaker.label(), line.text))
                .collect()
        })
        .unwrap_or_default();
    vec![
        ChatMessage::system(SIDE_SCRIPT_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Document Content (for reference):\n{}\n\nEpisode so far:\n{}\n\nListener question: {}",
            document,
            played.join("\n"),
            question
        )),
    ]
}

/// First question in `line`, if any.
fn last_question(line: &str) -> Option<&str> {
    QUESTION
        .as_ref()?
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn initial_user_prompt(history: &[String]) -> Option<&str> {
    history
        .iter()
        .find_map(|line| line.strip_prefix("User:"))
        .map(str::trim)
}
