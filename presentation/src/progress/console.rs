//! Console progress notifier
//!
//! Prints committed turns, podcast lines and session events as they
//! happen. Status lines are printed only when they change, and only when
//! asked for.

use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use duet_application::ProgressNotifier;
use duet_domain::{
    AgentId, AgentStatus, Message, NarrationItem, PlaybackStep, PodcastScript, RouteDecision,
    RoutePlan,
};
use std::sync::{Mutex, PoisonError};

pub struct ConsoleProgress {
    show_status: bool,
    last_status: Mutex<Vec<(AgentId, AgentStatus)>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            show_status: false,
            last_status: Mutex::new(Vec::new()),
        }
    }

    /// Print every agent status change
    pub fn with_status(mut self, show: bool) -> Self {
        self.show_status = show;
        self
    }

    /// Record `statuses` and report whether they differ from the last ones
    fn status_changed(&self, statuses: &[(AgentId, AgentStatus)]) -> bool {
        let mut last = self.last_status.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_slice() == statuses {
            return false;
        }
        *last = statuses.to_vec();
        true
    }

    fn describe_route(decision: &RouteDecision, agents: &[AgentId]) -> String {
        // Plan against both ids; the orchestrator filters again with the real roster
        match decision.plan("", agents) {
            RoutePlan::Discussion { initiator, .. } => {
                format!("{} opens a discussion", initiator.label())
            }
            RoutePlan::Individual(turns) => {
                let labels: Vec<String> = turns.iter().map(|(id, _)| id.label()).collect();
                format!("{} answering", labels.join(" then "))
            }
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ConsoleProgress {
    fn on_status_change(&self, statuses: &[(AgentId, AgentStatus)]) {
        if self.status_changed(statuses) && self.show_status {
            println!("{}", ConsoleFormatter::statuses(statuses));
        }
    }

    fn on_turn_committed(&self, speaker: AgentId, message: &Message) {
        println!("\n{}", ConsoleFormatter::turn(speaker, message));
    }

    fn on_error(&self, message: &str) {
        eprintln!("{}", ConsoleFormatter::error(message));
    }

    fn on_route_decided(&self, decision: &RouteDecision) {
        let agents = [AgentId::FIRST, AgentId::SECOND];
        println!(
            "{}",
            ConsoleFormatter::notice(&Self::describe_route(decision, &agents))
        );
    }

    fn on_narration_start(&self, item: &NarrationItem) {
        if self.show_status {
            println!(
                "{}",
                ConsoleFormatter::notice(&format!("{} speaking", item.speaker.label()))
            );
        }
    }

    fn on_discussion_start(&self, initiator: AgentId, turn_limit: u32) {
        println!(
            "{}",
            format!(
                "Discussion started by {} ({} turns)",
                initiator.label(),
                turn_limit
            )
            .cyan()
        );
    }

    fn on_discussion_finished(&self) {
        println!("{}", "Discussion finished".cyan());
    }

    fn on_podcast_loaded(&self, script: &PodcastScript) {
        println!(
            "{}",
            format!("Podcast episode ready: {} lines", script.len()).cyan()
        );
    }

    fn on_side_script_loaded(&self, script: &PodcastScript, resume_at: usize) {
        println!(
            "{}",
            format!(
                "Answering your question in {} lines, then back to line {}",
                script.len(),
                resume_at + 1
            )
            .cyan()
        );
    }

    fn on_podcast_line(&self, step: &PlaybackStep) {
        println!(
            "{}",
            ConsoleFormatter::script_line(step.line.speaker, &step.line.text)
        );
    }

    fn on_podcast_resumed(&self, cursor: usize) {
        println!(
            "{}",
            format!("Resuming the episode at line {}", cursor + 1).cyan()
        );
    }

    fn on_podcast_finished(&self) {
        println!("{}", "Episode finished".cyan());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_domain::RevisedPrompt;

    #[test]
    fn test_status_printed_only_on_change() {
        let progress = ConsoleProgress::new();
        let thinking = [(AgentId::FIRST, AgentStatus::Thinking)];
        assert!(progress.status_changed(&thinking));
        assert!(!progress.status_changed(&thinking));
        assert!(progress.status_changed(&[(AgentId::FIRST, AgentStatus::Speaking)]));
    }

    #[test]
    fn test_route_descriptions() {
        let agents = [AgentId::FIRST, AgentId::SECOND];
        let discussion = RouteDecision {
            discussion_required: true,
            initiator: Some(AgentId::SECOND),
            responding_agents: vec![AgentId::SECOND, AgentId::FIRST],
            revised_prompt: RevisedPrompt::Shared("Discuss".to_string()),
        };
        assert_eq!(
            ConsoleProgress::describe_route(&discussion, &agents),
            "Agent 2 opens a discussion"
        );

        let separate = RouteDecision {
            discussion_required: false,
            ..discussion
        };
        assert_eq!(
            ConsoleProgress::describe_route(&separate, &agents),
            "Agent 2 then Agent 1 answering"
        );
        assert_eq!(
            ConsoleProgress::describe_route(&RouteDecision::direct(AgentId::FIRST, "x"), &agents),
            "Agent 1 answering"
        );
    }
}
