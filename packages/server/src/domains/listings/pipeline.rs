//! Job board run: browser session → extract → normalize → load.
//!
//! The session is always stopped once it has been started, whatever the
//! outcome of the steps in between (including a panic). Teardown failures are
//! logged and never replace the run's own result.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use thiserror::Error;
use tracing::{info, warn};

use super::activities::{
    extract_listings, load_listings, normalize_listings, ExtractionError, LoadError, RenderWait,
};
use super::models::Destination;
use crate::kernel::{BrowserError, BrowserSession, ServerDeps, Warehouse};

/// Per-deployment run settings, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source_url: String,
    pub render_wait: RenderWait,
    pub destination: Destination,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub destination: String,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    SessionStart(#[source] BrowserError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Run the pipeline once. Errors are not retried.
pub async fn run_pipeline(
    config: &PipelineConfig,
    deps: &ServerDeps,
) -> Result<RunSummary, PipelineError> {
    info!(url = %config.source_url, destination = %config.destination, "Starting job board run");

    let session = deps
        .sessions
        .start()
        .await
        .map_err(PipelineError::SessionStart)?;

    let outcome = AssertUnwindSafe(scrape_and_load(
        session.as_ref(),
        deps.warehouse.as_ref(),
        config,
    ))
    .catch_unwind()
    .await;

    match deps.sessions.stop(session).await {
        Ok(()) => info!("Browser session has been closed"),
        Err(e) => warn!(error = %e, "Browser session teardown failed"),
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

async fn scrape_and_load(
    session: &dyn BrowserSession,
    warehouse: &dyn Warehouse,
    config: &PipelineConfig,
) -> Result<RunSummary, PipelineError> {
    let listings = extract_listings(session, &config.source_url, config.render_wait).await?;
    let table = normalize_listings(listings);
    load_listings(warehouse, &table, &config.destination).await?;

    Ok(RunSummary {
        rows: table.len(),
        destination: config.destination.table_path(),
    })
}
