//! # caseforge
//!
//! Command-line harness for the CaseForge pipeline: run a ticket through
//! the five stages, inspect the response cache, or print sample tickets.

#![deny(unsafe_code)]

mod samples;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use caseforge_core::state::StageName;
use caseforge_core::ticket::Ticket;
use caseforge_llm::cache::ResponseCache;
use caseforge_llm::gemini::GeminiProvider;
use caseforge_llm::invoker::Invoker;
use caseforge_llm::limiter::RateLimiter;
use caseforge_llm::provider::GenerationOptions;
use caseforge_pipeline::{ModelSpec, Pipeline, RunOutcome};
use caseforge_settings::{Settings, load_settings};

use crate::samples::SampleKind;

#[derive(Debug, Parser)]
#[command(
    name = "caseforge",
    about = "Generate a structured test suite from a ticket",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the five-stage pipeline over a ticket JSON file.
    Run {
        /// Path to the ticket JSON file.
        #[arg(long)]
        ticket: PathBuf,

        /// Write the final state here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip cache lookups (fresh responses are still stored).
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Model id override (defaults to the configured model).
        #[arg(long)]
        model: Option<String>,
    },

    /// Inspect or clear the response cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Print a built-in sample ticket as JSON, for piping into `run`.
    Sample {
        /// Which sample to print.
        #[arg(long, value_enum, default_value_t = SampleKind::Bug)]
        kind: SampleKind,
    },
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Print live and expired entry counts.
    Stats,
    /// Remove all entries.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings();

    match cli.command {
        Command::Run {
            ticket,
            output,
            no_cache,
            model,
        } => run(&settings, &ticket, output.as_deref(), no_cache, model).await,
        Command::Cache { command } => cache_command(&settings, &command),
        Command::Sample { kind } => {
            println!("{}", serde_json::to_string_pretty(&samples::sample(kind))?);
            Ok(())
        }
    }
}

async fn run(
    settings: &Settings,
    ticket_path: &Path,
    output: Option<&Path>,
    no_cache: bool,
    model_override: Option<String>,
) -> Result<()> {
    let content = std::fs::read_to_string(ticket_path)
        .with_context(|| format!("failed to read ticket file {}", ticket_path.display()))?;
    let ticket: Ticket = serde_json::from_str(&content)
        .with_context(|| format!("invalid ticket JSON in {}", ticket_path.display()))?;

    let api_key = std::env::var(&settings.model.api_key_env).with_context(|| {
        format!(
            "API key environment variable {} is not set",
            settings.model.api_key_env
        )
    })?;

    let invoker = build_invoker(settings, api_key, no_cache);
    let model = ModelSpec::with_options(
        model_override.unwrap_or_else(|| settings.model.model.clone()),
        GenerationOptions {
            temperature: settings.model.temperature,
            max_output_tokens: settings.model.max_output_tokens,
            json_output: true,
        },
    );
    let pipeline = Pipeline::new(Arc::new(invoker), model);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received, finishing the current wait and stopping...");
            signal_cancel.cancel();
        }
    });

    eprintln!("Processing {} ({})", ticket.id, ticket.title);
    let total = StageName::ALL.len();
    let report = pipeline
        .run(ticket, &cancel, |stage, state| {
            let position = StageName::ALL
                .iter()
                .position(|&s| s == stage)
                .map_or(0, |i| i + 1);
            eprintln!(
                "[{position}/{total}] {} done ({} test cases so far)",
                stage.label(),
                state.test_cases.len(),
            );
        })
        .await;
    signal_task.abort();

    let rendered = serde_json::to_string_pretty(&report.state)?;
    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write output to {}", path.display()))?;
            eprintln!("Results written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    match report.outcome {
        RunOutcome::Completed => {
            eprintln!(
                "Done: {} test cases, {} coverage gaps, {} open questions",
                report.state.test_cases.len(),
                report.state.coverage_gaps.len(),
                report.state.clarifications.len(),
            );
            Ok(())
        }
        RunOutcome::Cancelled { stage } => {
            eprintln!("Cancelled during {}; partial results above", stage.label());
            Ok(())
        }
        RunOutcome::Failed { stage, source } => {
            bail!(
                "{} failed: {} ({})",
                stage.label(),
                source.category().user_message(),
                source,
            );
        }
    }
}

fn build_invoker(settings: &Settings, api_key: String, no_cache: bool) -> Invoker {
    let provider = Arc::new(GeminiProvider::new(api_key));
    let limiter = Arc::new(RateLimiter::new(
        settings.rate_limit.max_calls,
        settings.rate_limit.window(),
    ));

    let cache = if settings.cache.enabled {
        let dir = settings.cache.resolved_dir();
        match ResponseCache::open(&dir, settings.cache.ttl()) {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cache unavailable, running without it");
                None
            }
        }
    } else {
        None
    };

    Invoker::new(provider, limiter, cache, settings.retry.to_config()).with_bypass_lookup(no_cache)
}

fn cache_command(settings: &Settings, command: &CacheCommand) -> Result<()> {
    let dir = settings.cache.resolved_dir();
    let cache = ResponseCache::open(&dir, settings.cache.ttl())
        .with_context(|| format!("failed to open cache at {}", dir.display()))?;

    match command {
        CacheCommand::Stats => {
            let stats = cache.stats();
            println!(
                "{}: {} live, {} expired",
                dir.display(),
                stats.live,
                stats.expired,
            );
        }
        CacheCommand::Clear => {
            let removed = cache.clear();
            println!("removed {removed} entries from {}", dir.display());
        }
    }
    Ok(())
}
