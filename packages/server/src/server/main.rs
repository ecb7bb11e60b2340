// Main entry point for the HTTP trigger

use anyhow::{Context, Result};
use job_board_core::{
    kernel::ServerDeps,
    server::{build_app, AppState},
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_board_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting job board loader");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        url = %config.pipeline.source_url,
        destination = %config.pipeline.destination,
        "Configuration loaded"
    );

    let deps = ServerDeps::from_config(&config).context("Failed to initialise dependencies")?;
    let app = build_app(AppState::new(config.pipeline.clone(), deps));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
