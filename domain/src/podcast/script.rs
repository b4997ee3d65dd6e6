//! Podcast script parsing
//!
//! A script is generated as free text. Only lines of the form
//! `Agent 1: ...` / `Agent 2: ...` are kept; headings, blank lines and
//! anything else are dropped.

use crate::agent::entities::AgentId;
use crate::core::error::DomainError;
use crate::core::text::format_for_speech;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static SPEAKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Agent ([12]):\s*(.*)$").expect("valid regex"));

/// One spoken line of a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptLine {
    pub speaker: AgentId,
    pub text: String,
}

/// An ordered, speaker-tagged script. Used for both the main episode and
/// the short side script answering an interruption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodcastScript {
    lines: Vec<ScriptLine>,
    raw_text: String,
}

impl PodcastScript {
    /// Parse generated text into a script.
    ///
    /// Returns [`DomainError::NoSpeakerLines`] when nothing matches.
    pub fn parse(raw_text: &str) -> Result<Self, DomainError> {
        let lines: Vec<ScriptLine> = raw_text
            .lines()
            .filter_map(|line| {
                let caps = SPEAKER_LINE.captures(line.trim())?;
                let id = caps.get(1)?.as_str().parse::<u8>().ok()?;
                let speaker = AgentId::new(id).ok()?;
                let text = format_for_speech(caps.get(2)?.as_str());
                (!text.is_empty()).then_some(ScriptLine { speaker, text })
            })
            .collect();

        if lines.is_empty() {
            return Err(DomainError::NoSpeakerLines);
        }

        Ok(Self {
            lines,
            raw_text: raw_text.to_string(),
        })
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&ScriptLine> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// The parsed lines joined back as `Agent N: text`
    pub fn to_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("{}: {}", l.speaker.label(), l.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
