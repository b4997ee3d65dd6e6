//! Interactive line REPL
//!
//! Reading happens on a dedicated thread (the line editor blocks), so the
//! session keeps narrating while the user types. Each line is handed to the
//! async loop, which maps it onto an [`Orchestrator`] operation. Prompts
//! run as background tasks; a new prompt interrupts the previous one
//! inside the orchestrator.

mod command;

pub use command::{HELP, ReplCommand};

use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use duet_application::{Orchestrator, OrchestratorError};
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

const HISTORY_SIZE: usize = 500;

enum Input {
    Line(String),
    Interrupt,
    Eof,
}

/// Whether the loop should keep going
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Repl {
    orchestrator: Arc<Orchestrator>,
    history_path: Option<PathBuf>,
    listening: bool,
}

impl Repl {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            history_path: dirs::data_dir().map(|p| p.join("duet").join("history.txt")),
            listening: false,
        }
    }

    pub fn with_history_path(mut self, path: Option<PathBuf>) -> Self {
        self.history_path = path;
        self
    }

    /// Run until `/quit` or end of input, then shut the session down.
    pub async fn run(mut self) {
        self.print_welcome();

        let (tx, mut rx) = mpsc::channel(16);
        let history_path = self.history_path.clone();
        // A plain thread: a blocked read must not hold up runtime shutdown
        std::thread::spawn(move || read_lines(tx, history_path));

        while let Some(input) = rx.recv().await {
            let flow = match input {
                Input::Line(line) => match ReplCommand::parse(&line) {
                    Ok(Some(command)) => self.execute(command).await,
                    Ok(None) => Flow::Continue,
                    Err(message) => {
                        println!("{}", message);
                        println!("Type /help for available commands");
                        Flow::Continue
                    }
                },
                Input::Interrupt => {
                    self.orchestrator.stop();
                    Flow::Continue
                }
                Input::Eof => Flow::Quit,
            };
            if flow == Flow::Quit {
                break;
            }
        }

        self.orchestrator.shutdown();
        println!("Bye!");
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│                    duet                     │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        self.print_status();
        println!();
        println!("Type a question, or /help for commands. Ctrl-C stops playback.");
        println!();
    }

    fn print_status(&self) {
        let o = &self.orchestrator;
        println!("{}", "Agents:".cyan().bold());
        println!("{}", ConsoleFormatter::agents(&o.agents()));
        println!(
            "{} {}   {} {}   {} {}",
            "Mode:".cyan().bold(),
            o.mode_label(),
            "Turns:".cyan().bold(),
            o.turn_limit(),
            "Podcast:".cyan().bold(),
            if o.podcast_enabled() { "on" } else { "off" }
        );
        println!("{}", ConsoleFormatter::statuses(&o.statuses()));
        if let Some(error) = o.error() {
            println!("{}", ConsoleFormatter::error(&error));
        }
    }

    async fn execute(&mut self, command: ReplCommand) -> Flow {
        let o = self.orchestrator.clone();
        let result = match command {
            ReplCommand::Prompt(text) if self.listening => {
                self.listening = false;
                self.spawn(async move { o.stop_listening(&text).await });
                Ok(())
            }
            ReplCommand::Prompt(text) => {
                self.spawn(async move { o.submit_prompt(&text).await });
                Ok(())
            }
            ReplCommand::Listen => o.start_listening().map(|()| {
                self.listening = true;
                println!("{}", ConsoleFormatter::notice("Listening... type what you say"));
            }),
            ReplCommand::Stop => {
                self.listening = false;
                o.stop();
                Ok(())
            }
            ReplCommand::Resume => {
                self.spawn(async move { o.resume_podcast().await });
                Ok(())
            }
            ReplCommand::AddAgent(kind) => o
                .add_agent(kind)
                .map(|id| println!("Added {} as {}", id.label(), ConsoleFormatter::kind(kind))),
            ReplCommand::RemoveAgent(id) => o
                .remove_agent(id)
                .map(|()| println!("Removed {}", id.label())),
            ReplCommand::SetModel(id, kind) => o
                .set_model(id, kind)
                .map(|()| println!("{} is now {}", id.label(), ConsoleFormatter::kind(kind))),
            ReplCommand::SetTurns(n) => o
                .set_turn_limit(n)
                .map(|limit| println!("Discussions now run {} turns", limit)),
            ReplCommand::Podcast(enabled) => {
                let enabled = enabled.unwrap_or(!o.podcast_enabled());
                o.set_podcast_mode(enabled).map(|()| {
                    println!("Podcast mode {}", if enabled { "on" } else { "off" })
                })
            }
            ReplCommand::Reset => o
                .reset_context()
                .map(|()| println!("Context cleared")),
            ReplCommand::Status => {
                self.print_status();
                Ok(())
            }
            ReplCommand::History => {
                for line in o.history() {
                    println!("{}", line);
                }
                Ok(())
            }
            ReplCommand::Dismiss => {
                o.dismiss_error();
                Ok(())
            }
            ReplCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            ReplCommand::Quit => return Flow::Quit,
        };

        if let Err(e) = result {
            report(&e);
        }
        Flow::Continue
    }

    /// Run a long operation in the background, reporting unsurfaced errors.
    fn spawn<F>(&self, operation: F)
    where
        F: Future<Output = Result<(), OrchestratorError>> + Send + 'static,
    {
        tokio::spawn(async move {
            if let Err(e) = operation.await {
                report(&e);
            }
        });
    }
}

/// Errors already shown through the progress notifier are not repeated.
fn report(error: &OrchestratorError) {
    if !error.is_surfaced() {
        eprintln!("{}", ConsoleFormatter::error(&error.to_string()));
    }
}

fn read_lines(tx: mpsc::Sender<Input>, history_path: Option<PathBuf>) {
    let mut editor = Reedline::create();
    if let Some(path) = history_path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match FileBackedHistory::with_file(HISTORY_SIZE, path) {
            Ok(history) => editor = editor.with_history(Box::new(history)),
            Err(e) => tracing::debug!("History unavailable: {}", e),
        }
    }
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("duet".to_string()),
        DefaultPromptSegment::Empty,
    );

    loop {
        let input = match editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => Input::Line(line),
            Ok(Signal::CtrlD) => Input::Eof,
            Ok(_) => Input::Interrupt,
            Err(e) => {
                eprintln!("Error: {}", e);
                Input::Eof
            }
        };
        let done = matches!(input, Input::Eof);
        if tx.blocking_send(input).is_err() || done {
            break;
        }
    }
}
