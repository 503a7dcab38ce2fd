//! CLI binary for the daily tracker.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use daily_tracker::{
    build_registry, Action, ConfigSource, ConsoleForm, Database, EventAggregator, FileConfig, PopupAction,
    SchedulerBuilder,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Asks what you are working on every few minutes and keeps the answers.
#[derive(Parser)]
#[command(name = "daily-tracker", version, about)]
struct Cli {
    /// Path to a TOML or YAML configuration file.
    #[arg(short, long, default_value = "config/tracker.toml")]
    config: PathBuf,

    /// Show one popup now and exit instead of running the scheduler.
    #[arg(long)]
    once: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Fmt)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Fmt,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Fmt => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let source = FileConfig::new(&cli.config);
    let config = source
        .load()
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    config.validate()?;

    let database = Database::open(&config.database_path)
        .with_context(|| format!("Failed to open database at {}", config.database_path.display()))?;
    let registry = build_registry(&config, database)?;
    let action = PopupAction::new(
        EventAggregator::new(Arc::new(registry)),
        Arc::new(ConsoleForm::stdio()),
    );

    if cli.once {
        let now = chrono::Local::now().naive_local();
        action
            .fire(now, Arc::new(config))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let scheduler = SchedulerBuilder::new(source).build();
    let handle = scheduler.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            handle.stop();
        }
    });

    scheduler.start(action).await?;
    Ok(())
}
