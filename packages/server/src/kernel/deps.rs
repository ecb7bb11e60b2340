//! Server dependencies (using traits for testability)
//!
//! The pipeline reaches the browser and the warehouse only through this
//! container, so tests can inject static pages and an in-memory warehouse.

use anyhow::{Context, Result};
use bigquery_client::{BigQueryClient, Credentials, ServiceAccountKey};
use std::sync::Arc;

use super::{BigQueryWarehouse, ChromeProvider, SessionOptions, SessionProvider, Warehouse};
use crate::config::Config;

#[derive(Clone)]
pub struct ServerDeps {
    pub sessions: Arc<dyn SessionProvider>,
    pub warehouse: Arc<dyn Warehouse>,
}

impl ServerDeps {
    pub fn new(sessions: Arc<dyn SessionProvider>, warehouse: Arc<dyn Warehouse>) -> Self {
        Self {
            sessions,
            warehouse,
        }
    }

    /// Headless Chromium plus BigQuery authenticated with the configured
    /// service-account key.
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = ServiceAccountKey::from_file(&config.credentials_path).with_context(|| {
            format!(
                "Failed to load warehouse credentials from {}",
                config.credentials_path.display()
            )
        })?;
        let client = BigQueryClient::new(Credentials::ServiceAccount(key));

        let options = SessionOptions::default().with_executable(config.chrome_executable.clone());

        Ok(Self::new(
            Arc::new(ChromeProvider::new(options)),
            Arc::new(BigQueryWarehouse::new(client)),
        ))
    }
}
