//! CLI entrypoint for agentic
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use std::path::Path;
use std::sync::Arc;

use agentic_application::{RunQueryInput, RunQueryUseCase};
use agentic_domain::{ConversationId, OutputFormat, Query};
use agentic_infrastructure::{
    ConfigLoader, FileConfig, InMemoryConversationMemory, JsonlConversationLogger, OpenAiOracle,
    SandboxedToolExecutor,
};
use agentic_presentation::{ChatRepl, Cli, ConsoleFormatter, ProgressReporter};
use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_dir.as_deref())?;

    if cli.show_config {
        for line in ConfigLoader::config_sources() {
            println!("{line}");
        }
        return Ok(());
    }

    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli);
    check_config(&config)?;

    if !config.output.color {
        colored::control::set_override(false);
    }
    let format = cli
        .format
        .map(OutputFormat::from)
        .or(config.output.format)
        .unwrap_or_default();

    let conversation = cli
        .conversation
        .as_deref()
        .map(str::parse::<ConversationId>)
        .transpose()
        .context("--conversation expects a conversation id")?;

    info!("Starting agentic");

    // === Dependency Injection ===
    let orchestrator_config = config.to_orchestrator_config();
    let oracle = Arc::new(OpenAiOracle::new(&config.to_oracle_settings())?);
    let executor = Arc::new(SandboxedToolExecutor::builtin(&config.to_tool_settings())?);
    let memory = Arc::new(InMemoryConversationMemory::new(
        orchestrator_config.history_length,
    ));

    let cancellation = CancellationToken::new();
    spawn_interrupt_handler(cancellation.clone());

    let mut use_case = RunQueryUseCase::new(oracle, executor, memory, orchestrator_config)
        .with_cancellation(cancellation.clone());
    if let Some(path) = config.logging.conversation_log_path()
        && let Some(logger) = JsonlConversationLogger::open(&path)
    {
        info!(path = %logger.path().display(), "Writing conversation transcript");
        use_case = use_case.with_logger(Arc::new(logger));
    }

    // Chat mode
    if cli.chat {
        let mut repl = ChatRepl::new(use_case)
            .with_format(format)
            .with_progress(!cli.quiet)
            .with_cancellation(cancellation);
        if let Some(id) = conversation {
            repl = repl.with_conversation(id);
        }
        repl.run().await?;
        return Ok(());
    }

    // Single query mode - query is required
    let Some(query) = cli.query else {
        bail!("A query is required. Use --chat for interactive mode.");
    };
    let mut input = RunQueryInput::new(Query::try_new(query)?);
    if let Some(id) = conversation {
        input = input.with_conversation(id);
    }

    let result = if cli.quiet {
        use_case.execute(input).await
    } else {
        let progress = ProgressReporter::new();
        use_case.execute_with_progress(input, &progress).await
    };

    match result {
        Ok(output) => {
            println!("{}", ConsoleFormatter::format(&output, format));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", ConsoleFormatter::format_error(&e));
            std::process::exit(if e.is_cancelled() { 130 } else { 1 });
        }
    }
}

/// Stderr logging by verbosity, plus a daily file log under `log_dir`.
/// `RUST_LOG` overrides the verbosity level.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "agentic.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn apply_cli_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(max_steps) = cli.max_steps {
        config.agent.max_steps = max_steps;
    }
    if let Some(history) = cli.history {
        config.agent.history_length = history;
    }
}

/// Log warnings; refuse to start on errors.
fn check_config(config: &FileConfig) -> Result<()> {
    let issues = config.validate();
    for issue in issues.iter().filter(|i| !i.is_error()) {
        warn!("{issue}");
    }
    let errors: Vec<String> = issues
        .iter()
        .filter(|i| i.is_error())
        .map(ToString::to_string)
        .collect();
    if !errors.is_empty() {
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(())
}

/// First Ctrl-C cancels the running query; a second one exits.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            token.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}
