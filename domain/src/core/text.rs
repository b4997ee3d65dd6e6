//! Text normalisation for generated responses.
//!
//! Backends answer in loosely formatted markdown. Everything that is shown
//! or narrated goes through [`format_for_speech`] first so the narrator never
//! reads out markup.

use crate::agent::entities::AgentId;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("valid regex"));
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*[-*]\s+").expect("valid regex"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(\d+)\.\s+").expect("valid regex"));
static LEADING_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]+").expect("valid regex"));
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```(.+?)```").expect("valid regex"));
static AGENT_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Aa]gent\s+(\d+)").expect("valid regex"));
static LEADING_CONJUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(and|then|also)\s+").expect("valid regex"));
static TRAILING_CONJUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(and|then|also)$").expect("valid regex"));

/// Characters of text that count as a fully confident answer.
const CONFIDENCE_SATURATION_CHARS: f32 = 150.0;

/// Strip markup from generated text so it can be displayed and narrated.
pub fn format_for_speech(text: &str) -> String {
    let text = HTML_TAG.replace_all(text, "");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = BULLET.replace_all(&text, "• ");
    let text = NUMBERED.replace_all(&text, "$1. ");
    let text = LEADING_SPACE.replace_all(&text, "");
    let text = CODE_FENCE.replace_all(&text, "$1");
    text.trim().to_string()
}

/// Length-based confidence used when the backend does not report one.
pub fn heuristic_confidence(text: &str) -> f32 {
    (text.chars().count() as f32 / CONFIDENCE_SATURATION_CHARS).min(1.0)
}

/// Split a prompt into per-agent instructions at each "Agent N" mention.
///
/// Mentions of agents not in `known` are left in the surrounding text.
/// A later mention of the same agent replaces the earlier instruction.
pub fn parse_agent_mentions(message: &str, known: &[AgentId]) -> BTreeMap<AgentId, String> {
    let mentions: Vec<(AgentId, usize, usize)> = AGENT_MENTION
        .captures_iter(message)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let id = caps.get(1)?.as_str().parse::<u8>().ok()?;
            let id = AgentId::new(id).ok()?;
            known
                .contains(&id)
                .then_some((id, whole.start(), whole.end()))
        })
        .collect();

    let mut instructions = BTreeMap::new();
    for (i, (id, _, end)) in mentions.iter().enumerate() {
        let stop = mentions
            .get(i + 1)
            .map(|(_, next_start, _)| *next_start)
            .unwrap_or(message.len());
        let segment = message[*end..stop].trim();
        let segment = LEADING_CONJUNCTION.replace(segment, "");
        let segment = TRAILING_CONJUNCTION.replace(segment.trim(), "");
        let segment = segment.trim();
        if !segment.is_empty() {
            instructions.insert(*id, segment.to_string());
        }
    }
    instructions
}
