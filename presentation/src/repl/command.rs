//! REPL input parsing
//!
//! Plain lines are prompts; lines starting with `/` are commands.

use duet_domain::{AgentId, ModelKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Prompt(String),
    /// Start listening; the next plain line is the spoken transcript
    Listen,
    Stop,
    Resume,
    AddAgent(ModelKind),
    RemoveAgent(AgentId),
    SetModel(AgentId, ModelKind),
    SetTurns(u32),
    /// `None` toggles
    Podcast(Option<bool>),
    Reset,
    Status,
    History,
    Dismiss,
    Help,
    Quit,
}

pub const HELP: &str = "\
Type a question to ask the agents. Typing while they talk interrupts them.

Commands:
  /listen              - Start listening; your next line is what you said
  /stop                - Stop everything, including a podcast episode
  /resume              - Resume an interrupted podcast episode
  /add <kind>          - Add a second agent (critical, analytical, creative, practical)
  /remove <id>         - Remove agent 1 or 2
  /model <id> <kind>   - Change an agent's kind
  /turns <n>           - Set the discussion length (odd, at least 3)
  /podcast [on|off]    - Toggle podcast mode
  /reset               - Clear the conversation context
  /status              - Show agents, mode and settings
  /history             - Show the discussion history
  /dismiss             - Clear the current error
  /help, /h, /?        - Show this help
  /quit, /exit, /q     - Exit";

fn agent_id(arg: Option<&str>) -> Result<AgentId, String> {
    let arg = arg.ok_or("missing agent id (1 or 2)")?;
    arg.parse::<u8>()
        .ok()
        .and_then(|n| AgentId::new(n).ok())
        .ok_or_else(|| format!("invalid agent id: {}", arg))
}

fn model_kind(arg: Option<&str>) -> Result<ModelKind, String> {
    arg.ok_or("missing agent kind")?
        .parse::<ModelKind>()
        .map_err(|e| e.to_string())
}

impl ReplCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Some(ReplCommand::Prompt(line.to_string())));
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default().to_lowercase();
        let first = words.next();
        let second = words.next();

        let parsed = match name.as_str() {
            "listen" | "l" => ReplCommand::Listen,
            "stop" | "s" => ReplCommand::Stop,
            "resume" | "r" => ReplCommand::Resume,
            "add" => ReplCommand::AddAgent(model_kind(first)?),
            "remove" | "rm" => ReplCommand::RemoveAgent(agent_id(first)?),
            "model" => ReplCommand::SetModel(agent_id(first)?, model_kind(second)?),
            "turns" => {
                let arg = first.ok_or("missing turn count")?;
                ReplCommand::SetTurns(
                    arg.parse()
                        .map_err(|_| format!("invalid turn count: {}", arg))?,
                )
            }
            "podcast" => ReplCommand::Podcast(match first {
                None => None,
                Some("on") => Some(true),
                Some("off") => Some(false),
                Some(other) => return Err(format!("expected on or off, got: {}", other)),
            }),
            "reset" => ReplCommand::Reset,
            "status" => ReplCommand::Status,
            "history" => ReplCommand::History,
            "dismiss" => ReplCommand::Dismiss,
            "help" | "h" | "?" => ReplCommand::Help,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            _ => return Err(format!("Unknown command: {}", line)),
        };
        Ok(Some(parsed))
    }
}
