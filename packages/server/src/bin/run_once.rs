//! One-shot run
//!
//! Scrapes the job board and replaces the warehouse table, then exits.
//! Any failure is returned from `main`, so the process exits non-zero.

use anyhow::{Context, Result};
use job_board_core::{domains::listings::run_pipeline, kernel::ServerDeps, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_board_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let deps = ServerDeps::from_config(&config).context("Failed to initialise dependencies")?;

    let summary = run_pipeline(&config.pipeline, &deps).await?;
    tracing::info!(
        rows = summary.rows,
        destination = %summary.destination,
        "Job board run complete"
    );

    Ok(())
}
