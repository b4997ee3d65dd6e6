//! Console formatting for agents, turns and status lines

use colored::{ColoredString, Colorize};
use duet_domain::{AgentId, AgentStatus, Message, ModelKind};

/// Formats session output for the terminal
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Speaker label, coloured per agent
    pub fn speaker(id: AgentId) -> ColoredString {
        let label = id.label();
        if id == AgentId::FIRST {
            label.yellow().bold()
        } else {
            label.cyan().bold()
        }
    }

    /// Kind name in the colour the kind is known by
    pub fn kind(kind: ModelKind) -> ColoredString {
        let name = kind.display_name();
        match kind {
            ModelKind::Critical => name.yellow(),
            ModelKind::Analytical => name.blue(),
            ModelKind::Creative => name.magenta(),
            ModelKind::Practical => name.green(),
        }
    }

    /// A committed turn: header line, then the text
    pub fn turn(speaker: AgentId, message: &Message) -> String {
        let mut header = format!("── {} ", Self::speaker(speaker));
        if message.is_final_summary {
            header.push_str(&format!("{} ", "· summary".bold()));
        }
        if let Some(confidence) = message.confidence {
            header.push_str(&format!(
                "{} ",
                format!("· {:.0}%", confidence * 100.0).dimmed()
            ));
        }
        header.push_str("──");
        format!("{}\n{}\n", header, message.text)
    }

    /// One podcast line
    pub fn script_line(speaker: AgentId, text: &str) -> String {
        format!("{}: {}", Self::speaker(speaker), text)
    }

    pub fn statuses(statuses: &[(AgentId, AgentStatus)]) -> String {
        statuses
            .iter()
            .map(|(id, status)| format!("{} {}", id.label(), Self::status(*status)))
            .collect::<Vec<_>>()
            .join("  ")
    }

    fn status(status: AgentStatus) -> ColoredString {
        let label = status.to_string();
        match status {
            AgentStatus::Idle => label.dimmed(),
            AgentStatus::Listening => label.green(),
            AgentStatus::Thinking => label.yellow(),
            AgentStatus::Speaking => label.cyan(),
        }
    }

    pub fn agents(agents: &[(AgentId, ModelKind)]) -> String {
        agents
            .iter()
            .map(|(id, kind)| format!("  {}  {} ({})", Self::speaker(*id), Self::kind(*kind), kind))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn notice(text: &str) -> ColoredString {
        text.dimmed()
    }

    pub fn error(text: &str) -> String {
        format!("{} {}", "Error:".red().bold(), text)
    }
}
