use axum::extract::State;
use axum::http::StatusCode;
use tracing::error;

use crate::domains::listings::{run_pipeline, PipelineError};
use crate::server::app::AppState;

/// Body returned when a run completes.
pub const SUCCESS_BODY: &str = "200, Success";

/// Run the pipeline once and report in plain text.
///
/// Extraction and load failures still answer 200 with the error message as
/// the body; callers must inspect the body, not the status. A browser that
/// cannot be started is a server error (500).
pub async fn run_handler(
    State(state): State<AppState>,
) -> Result<String, (StatusCode, String)> {
    match run_pipeline(&state.pipeline, &state.deps).await {
        Ok(_) => Ok(SUCCESS_BODY.to_string()),
        Err(e @ PipelineError::SessionStart(_)) => {
            error!(error = %e, "Browser session could not be started");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Job board run failed");
            Ok(e.to_string())
        }
    }
}
