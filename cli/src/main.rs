//! CLI entrypoint for duet
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use duet_application::{
    ConversationLogger, NoConversationLogger, Orchestrator, OrchestratorConfig,
};
use duet_domain::AgentRoster;
use duet_infrastructure::{
    ConfigLoader, DocumentLibrary, FileConfig, JsonlConversationLogger, OllamaTurnGenerator,
    narrator,
};
use duet_presentation::{Cli, ConsoleProgress, Repl};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli)?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    apply_overrides(&cli, &mut config);

    for warning in config.check()? {
        eprintln!("{}", warning);
    }

    let (kinds, _) = config.agents.parse_models();
    let (turn_limit, _) = config.discussion.turn_limit();
    let roster = AgentRoster::from_kinds(&kinds)?;

    let Some(document_path) = cli.document.as_ref() else {
        bail!("A document is required. Pass one with --document <PATH>.");
    };

    info!("Starting duet");

    // === Dependency Injection ===
    let documents = Arc::new(DocumentLibrary::new());
    let document = documents.load_or_empty(document_path).await;

    let generator = Arc::new(
        OllamaTurnGenerator::from_config(&config.generator, documents.clone())
            .context("Failed to set up the text-generation client")?,
    );
    let narrator = narrator::from_config(&config.narrator);
    let progress = Arc::new(ConsoleProgress::new().with_status(cli.verbose > 0));
    let logger: Arc<dyn ConversationLogger> = match &config.logging.conversation_log {
        Some(path) => match JsonlConversationLogger::new(path) {
            Some(logger) => {
                info!("Conversation log: {}", logger.path().display());
                Arc::new(logger)
            }
            None => Arc::new(NoConversationLogger),
        },
        None => Arc::new(NoConversationLogger),
    };

    let orchestrator_config = OrchestratorConfig::new(document.id())
        .with_turn_limit(turn_limit.get())
        .with_summary_pause_ms(config.discussion.summary_pause_ms)
        .with_podcast_mode(cli.podcast);

    let shutdown = CancellationToken::new();
    let orchestrator = Arc::new(Orchestrator::new(
        orchestrator_config,
        roster,
        generator,
        narrator,
        progress,
        logger,
        shutdown.clone(),
    )?);

    if document.is_empty() {
        warn!("Document {} has no text", document.id());
    }
    println!("Document: {}", document.id());

    Repl::new(orchestrator).run().await;
    shutdown.cancel();

    Ok(())
}

/// Initialize logging based on verbosity level. `RUST_LOG` wins when set.
///
/// With `--log-file`, logs go through a non-blocking file writer so they
/// don't interleave with the REPL; the returned guard flushes it on exit.
fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    });

    let Some(path) = &cli.log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("--log-file needs a file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

/// Command-line flags take precedence over every config source.
fn apply_overrides(cli: &Cli, config: &mut FileConfig) {
    if !cli.agents.is_empty() {
        config.agents.models = cli.agents.iter().map(|k| k.as_str().to_string()).collect();
    }
    if let Some(limit) = cli.turn_limit {
        config.discussion.turn_limit = limit;
    }
    if let Some(choice) = cli.narrator {
        config.narrator.backend = choice.as_str().to_string();
    }
    if let Some(path) = &cli.conversation_log {
        config.logging.conversation_log = Some(path.clone());
    }
}
