//! pipectl: build the pipeline a document describes, run it until SIGINT or
//! SIGTERM, then tear it down.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use pipectl_engine::RecordingEngine;
use pipectl_orchestrator::{Orchestrator, OrchestratorOptions};

#[derive(Parser, Debug)]
#[command(name = "pipectl", version, about)]
struct Cli {
    /// Pipeline document (JSON).
    config: PathBuf,

    /// How often to check for a termination request, in milliseconds.
    #[arg(long, default_value_t = pipectl_orchestrator::DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Locale passed to the engine.
    #[arg(long, default_value = pipectl_orchestrator::DEFAULT_LOCALE)]
    locale: String,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "pipectl=info,pipectl_config=info,pipectl_engine=info,pipectl_orchestrator=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = pipectl_config::load(&cli.config)
        .with_context(|| format!("Couldn't load {}", cli.config.display()))?;

    let options = OrchestratorOptions {
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
        locale: cli.locale,
        ..Default::default()
    };
    let mut orchestrator = Orchestrator::with_options(RecordingEngine::new(), config, options);

    let signal = orchestrator.shutdown_signal();
    ctrlc::set_handler(move || signal.request())
        .context("Couldn't install the termination handler")?;

    orchestrator.start().context("Couldn't build the pipeline")?;
    orchestrator.wait_for_termination()?;
    let report = orchestrator.shutdown()?;

    info!(
        sources = report.sources_released,
        outputs = report.outputs_released,
        encoders = report.encoders_released,
        leaks = report.outstanding_allocations,
        "Shutdown complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    info!(config = %cli.config.display(), "pipectl starting");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
