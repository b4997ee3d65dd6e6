//! CLI command definitions

use clap::{Parser, ValueEnum};
use duet_domain::ModelKind;
use std::path::PathBuf;

/// Narrator backend selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NarratorChoice {
    /// Print lines and wait as long as speaking them would take
    Paced,
    /// Run the configured text-to-speech command
    Command,
}

impl NarratorChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarratorChoice::Paced => "paced",
            NarratorChoice::Command => "command",
        }
    }
}

fn parse_model_kind(value: &str) -> Result<ModelKind, String> {
    value.parse::<ModelKind>().map_err(|e| e.to_string())
}

/// CLI arguments for duet
#[derive(Parser, Debug)]
#[command(name = "duet")]
#[command(author, version, about = "Two AI agents read a document and talk it through, out loud")]
#[command(long_about = r#"
duet loads a document and lets one or two agents answer questions about it,
discuss it with each other, or perform it as a two-host podcast. Every turn
is narrated in order; typing a new prompt interrupts whatever is playing.

Agent kinds: critical, analytical, creative, practical

Configuration files are loaded from (in priority order):
1. DUET_* environment variables (e.g. DUET_GENERATOR__MODEL=llama3.1)
2. --config <path>     Explicit config file
3. ./duet.toml         Project-level config
4. ~/.config/duet/config.toml   Global config

Example:
  duet --document report.txt
  duet -d report.txt --agent critical --agent creative --turn-limit 7
  duet -d report.txt --podcast --narrator command
"#)]
pub struct Cli {
    /// Document the agents read
    #[arg(short, long, value_name = "PATH", required_unless_present = "show_config")]
    pub document: Option<PathBuf>,

    /// Agent kind (repeat for a second agent)
    #[arg(short, long = "agent", value_name = "KIND", value_parser = parse_model_kind)]
    pub agents: Vec<ModelKind>,

    /// Discussion length including the closing summary (odd, at least 3)
    #[arg(short, long, value_name = "N")]
    pub turn_limit: Option<u32>,

    /// Start in podcast mode (needs two agents)
    #[arg(long)]
    pub podcast: bool,

    /// Narrator backend
    #[arg(long, value_enum)]
    pub narrator: Option<NarratorChoice>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Append conversation events to a JSONL file
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// Write diagnostic logs to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
