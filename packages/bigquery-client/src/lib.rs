//! Pure BigQuery REST API client.
//!
//! A minimal client for the BigQuery v2 API. Supports creating datasets,
//! submitting load jobs with an inline media upload, and polling jobs until
//! they finish.
//!
//! # Example
//!
//! ```rust,ignore
//! use bigquery_client::{BigQueryClient, Credentials, ServiceAccountKey};
//!
//! let key = ServiceAccountKey::from_file("assets/keys/loader.json")?;
//! let client = BigQueryClient::new(Credentials::ServiceAccount(key));
//!
//! client.create_dataset("my-project", "jobs", "EU").await?;
//! let job = client.insert_load_job("my-project", "EU", load_config, ndjson).await?;
//! client.wait_for_job(&job.job_reference).await?;
//! ```

pub mod auth;
pub mod error;
pub mod types;

pub use auth::{Credentials, ServiceAccountKey, TokenProvider};
pub use error::{BigQueryError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

const ROOT_URL: &str = "https://bigquery.googleapis.com";
const API_PATH: &str = "/bigquery/v2";
const UPLOAD_PATH: &str = "/upload/bigquery/v2";

const MULTIPART_BOUNDARY: &str = "bigquery_client_load_boundary";

pub struct BigQueryClient {
    client: reqwest::Client,
    tokens: TokenProvider,
    base_url: String,
    upload_url: String,
    poll_interval: Duration,
}

impl BigQueryClient {
    pub fn new(credentials: Credentials) -> Self {
        let client = reqwest::Client::new();
        Self {
            tokens: TokenProvider::new(credentials, client.clone()),
            client,
            base_url: format!("{}{}", ROOT_URL, API_PATH),
            upload_url: format!("{}{}", ROOT_URL, UPLOAD_PATH),
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Point the client at an emulator or test server. `url` is the service
    /// root (scheme and host, e.g. `http://localhost:9050`); the REST and
    /// upload paths are appended the way the public endpoint lays them out.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let root = url.into();
        let root = root.trim_end_matches('/');
        self.base_url = format!("{}{}", root, API_PATH);
        self.upload_url = format!("{}{}", root, UPLOAD_PATH);
        self
    }

    /// Delay between `jobs.get` calls while waiting for a job.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Create a dataset. An existing dataset (HTTP 409) is reported as
    /// [`DatasetCreation::AlreadyExists`] rather than an error.
    pub async fn create_dataset(
        &self,
        project_id: &str,
        dataset_id: &str,
        location: &str,
    ) -> Result<DatasetCreation> {
        let dataset = Dataset {
            dataset_reference: DatasetReference {
                project_id: project_id.to_string(),
                dataset_id: dataset_id.to_string(),
            },
            location: Some(location.to_string()),
        };

        let url = format!("{}/projects/{}/datasets", self.base_url, project_id);
        let token = self.tokens.access_token().await?;
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&dataset)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            tracing::debug!(project_id, dataset_id, "Dataset already exists");
            return Ok(DatasetCreation::AlreadyExists);
        }

        let resp = check_status(resp).await?;
        let created: Dataset = resp.json().await?;
        Ok(DatasetCreation::Created(created))
    }

    /// Submit a load job whose source data travels in the same request
    /// (multipart/related media upload). Returns as soon as the job is
    /// accepted; use [`wait_for_job`](Self::wait_for_job) to block on it.
    pub async fn insert_load_job(
        &self,
        project_id: &str,
        location: &str,
        load: JobConfigurationLoad,
        data: Vec<u8>,
    ) -> Result<Job> {
        let job = Job {
            job_reference: JobReference {
                project_id: project_id.to_string(),
                job_id: format!("job_board_load_{}", uuid::Uuid::new_v4().simple()),
                location: Some(location.to_string()),
            },
            configuration: Some(JobConfiguration { load }),
            status: None,
            statistics: None,
        };
        let metadata = serde_json::to_vec(&job)?;

        let url = format!(
            "{}/projects/{}/jobs?uploadType=multipart",
            self.upload_url, project_id
        );
        let token = self.tokens.access_token().await?;
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(multipart_related(&metadata, &data))
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let inserted: Job = resp.json().await?;
        tracing::debug!(job_id = %inserted.job_reference.job_id, "Load job accepted");
        Ok(inserted)
    }

    pub async fn get_job(&self, job: &JobReference) -> Result<Job> {
        let mut url = format!(
            "{}/projects/{}/jobs/{}",
            self.base_url, job.project_id, job.job_id
        );
        if let Some(location) = &job.location {
            url = format!("{}?location={}", url, location);
        }

        let token = self.tokens.access_token().await?;
        let resp = self.client.get(&url).bearer_auth(token).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Poll until the job reaches DONE. A DONE job carrying an
    /// `errorResult` is returned as [`BigQueryError::JobFailed`].
    pub async fn wait_for_job(&self, job: &JobReference) -> Result<Job> {
        loop {
            let current = self.get_job(job).await?;
            let status = current.status.clone().unwrap_or_default();

            if status.is_done() {
                if let Some(error) = status.error_result {
                    return Err(BigQueryError::JobFailed {
                        job_id: job.job_id.clone(),
                        reason: error.reason,
                        message: error.message,
                    });
                }
                return Ok(current);
            }

            tracing::debug!(job_id = %job.job_id, state = %status.state, "Job still in progress");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(BigQueryError::Api {
        status: status.as_u16(),
        message,
    })
}

fn multipart_related(metadata: &[u8], data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + data.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_the_public_path_layout() {
        let client = BigQueryClient::new(Credentials::AccessToken("t".into()))
            .with_base_url("http://localhost:9050/");

        assert_eq!(client.base_url, "http://localhost:9050/bigquery/v2");
        assert_eq!(client.upload_url, "http://localhost:9050/upload/bigquery/v2");
    }

    #[test]
    fn multipart_body_has_metadata_then_media() {
        let body = multipart_related(b"{\"a\":1}", b"{\"title\":\"x\"}\n");
        let text = String::from_utf8(body).unwrap();

        let meta_at = text.find("{\"a\":1}").unwrap();
        let data_at = text.find("{\"title\":\"x\"}").unwrap();
        assert!(meta_at < data_at);
        assert!(text.starts_with("--bigquery_client_load_boundary\r\n"));
        assert!(text.ends_with("--bigquery_client_load_boundary--\r\n"));
    }
}
