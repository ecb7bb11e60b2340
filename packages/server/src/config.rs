use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::domains::listings::{Destination, PipelineConfig, RenderWait};

/// Directory (relative to the working directory) holding service-account keys.
const KEYS_DIR: &str = "assets/keys";

const DEFAULT_PAGE_LOAD_DELAY_SECS: u64 = 2;
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;
const RENDER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline: PipelineConfig,
    /// Service-account JSON key for the warehouse.
    pub credentials_path: PathBuf,
    pub chrome_executable: Option<PathBuf>,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };

        let destination = Destination {
            project_id: required("PROJECT_ID")?,
            dataset_id: required("BQ_DATASET_ID")?,
            table_name: required("BQ_TABLE_NAME")?,
            region: required("BQ_REGION")?,
        };

        let page_load_delay = match lookup("PAGE_LOAD_DELAY") {
            Some(v) => v
                .parse()
                .context("PAGE_LOAD_DELAY must be a whole number of seconds")?,
            None => DEFAULT_PAGE_LOAD_DELAY_SECS,
        };

        let render_wait = match lookup("RENDER_WAIT").as_deref() {
            None | Some("fixed") => RenderWait::Fixed(Duration::from_secs(page_load_delay)),
            Some("until_present") => {
                let timeout = match lookup("RENDER_TIMEOUT") {
                    Some(v) => v
                        .parse()
                        .context("RENDER_TIMEOUT must be a whole number of seconds")?,
                    None => DEFAULT_RENDER_TIMEOUT_SECS,
                };
                RenderWait::UntilPresent {
                    timeout: Duration::from_secs(timeout),
                    poll: RENDER_POLL_INTERVAL,
                }
            }
            Some(other) => bail!("RENDER_WAIT must be 'fixed' or 'until_present', got '{}'", other),
        };

        let credentials_path = match lookup("GOOGLE_APPLICATION_CREDENTIALS") {
            Some(path) => PathBuf::from(path),
            None => {
                let key_file = lookup("GCP_BIG_Q_SERVICE_ACCOUNT_KEY").context(
                    "GOOGLE_APPLICATION_CREDENTIALS or GCP_BIG_Q_SERVICE_ACCOUNT_KEY must be set",
                )?;
                PathBuf::from(KEYS_DIR).join(key_file)
            }
        };

        Ok(Self {
            pipeline: PipelineConfig {
                source_url: required("JOB_POSTINGS_URL")?,
                render_wait,
                destination,
            },
            credentials_path,
            chrome_executable: lookup("CHROME_EXECUTABLE").map(PathBuf::from),
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("PROJECT_ID", "proj"),
            ("BQ_DATASET_ID", "jobs"),
            ("BQ_TABLE_NAME", "postings"),
            ("BQ_REGION", "EU"),
            ("JOB_POSTINGS_URL", "https://realpython.github.io/fake-jobs/"),
            ("GCP_BIG_Q_SERVICE_ACCOUNT_KEY", "loader.json"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn unset_optionals_fall_back_to_defaults() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.pipeline.render_wait,
            RenderWait::Fixed(Duration::from_secs(2))
        );
        assert_eq!(
            config.credentials_path,
            PathBuf::from("assets/keys/loader.json")
        );
        assert_eq!(config.pipeline.destination.table_path(), "proj.jobs.postings");
        assert_eq!(config.pipeline.destination.region, "EU");
    }

    #[test]
    fn explicit_credentials_path_wins() {
        let mut vars = base_env();
        vars.insert("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/key.json");

        let config = load(&vars).unwrap();

        assert_eq!(config.credentials_path, PathBuf::from("/secrets/key.json"));
    }

    #[test]
    fn missing_destination_names_the_variable() {
        let mut vars = base_env();
        vars.remove("BQ_TABLE_NAME");

        let err = load(&vars).unwrap_err();

        assert!(err.to_string().contains("BQ_TABLE_NAME"));
    }

    #[test]
    fn missing_credentials_fail() {
        let mut vars = base_env();
        vars.remove("GCP_BIG_Q_SERVICE_ACCOUNT_KEY");

        assert!(load(&vars).is_err());
    }

    #[test]
    fn wait_until_present_is_opt_in() {
        let mut vars = base_env();
        vars.insert("RENDER_WAIT", "until_present");
        vars.insert("RENDER_TIMEOUT", "10");

        let config = load(&vars).unwrap();

        assert_eq!(
            config.pipeline.render_wait,
            RenderWait::UntilPresent {
                timeout: Duration::from_secs(10),
                poll: RENDER_POLL_INTERVAL,
            }
        );
    }

    #[test]
    fn unknown_wait_mode_is_rejected() {
        let mut vars = base_env();
        vars.insert("RENDER_WAIT", "sometimes");

        assert!(load(&vars).is_err());
    }
}
