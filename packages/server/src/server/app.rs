//! Application setup and server configuration.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::domains::listings::PipelineConfig;
use crate::kernel::ServerDeps;
use crate::server::routes::run_handler;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineConfig>,
    pub deps: ServerDeps,
}

impl AppState {
    pub fn new(pipeline: PipelineConfig, deps: ServerDeps) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            deps,
        }
    }
}

/// Build the Axum application router
///
/// A single route: `GET /` runs the pipeline once. A panicking run answers
/// 500 instead of dropping the connection.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(run_handler))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
