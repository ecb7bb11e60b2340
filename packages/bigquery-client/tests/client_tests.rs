//! Client tests against an in-process fake of the BigQuery REST endpoints.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bigquery_client::{
    BigQueryClient, BigQueryError, CreateDisposition, Credentials, DatasetCreation,
    JobConfigurationLoad, SourceFormat, TableReference, WriteDisposition,
};
use serde_json::{json, Value};

#[derive(Default)]
struct FakeBigQuery {
    datasets: HashSet<String>,
    /// job id -> remaining polls before DONE
    jobs: HashMap<String, u32>,
    job_error: Option<(String, String)>,
    uploads: Vec<(Value, String)>,
    authorization: Vec<String>,
}

type Shared = Arc<Mutex<FakeBigQuery>>;

fn record_auth(state: &Shared, headers: &HeaderMap) {
    if let Some(value) = headers.get("authorization") {
        state
            .lock()
            .unwrap()
            .authorization
            .push(value.to_str().unwrap().to_string());
    }
}

async fn insert_dataset(
    State(state): State<Shared>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record_auth(&state, &headers);
    if project == "forbidden" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": 403, "message": "Access Denied" } })),
        );
    }

    let dataset_id = body["datasetReference"]["datasetId"]
        .as_str()
        .unwrap()
        .to_string();
    let mut fake = state.lock().unwrap();
    if !fake.datasets.insert(dataset_id) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": { "code": 409, "message": "Already Exists" } })),
        );
    }
    (StatusCode::OK, Json(body))
}

fn part_payload(part: &str) -> String {
    part.split_once("\r\n\r\n")
        .map(|(_, payload)| payload.trim_end_matches("\r\n").to_string())
        .unwrap_or_default()
}

async fn upload_job(
    State(state): State<Shared>,
    Path(_project): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    record_auth(&state, &headers);
    let text = String::from_utf8_lossy(&body).to_string();
    let parts: Vec<&str> = text.split("--bigquery_client_load_boundary").collect();
    let metadata: Value = serde_json::from_str(&part_payload(parts[1])).unwrap();
    let media = part_payload(parts[2]);

    let job_id = metadata["jobReference"]["jobId"].as_str().unwrap().to_string();
    let mut fake = state.lock().unwrap();
    fake.jobs.insert(job_id, 2);
    fake.uploads.push((metadata.clone(), media));

    let mut job = metadata;
    job["status"] = json!({ "state": "PENDING" });
    Json(job)
}

async fn get_job(
    State(state): State<Shared>,
    Path((project, job_id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    let mut fake = state.lock().unwrap();
    let error = fake.job_error.clone();
    let Some(remaining) = fake.jobs.get_mut(&job_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "code": 404, "message": "Not found: Job" } })),
        );
    };

    let reference = json!({ "projectId": project, "jobId": job_id });
    // Finished jobs echo a sparse copy of the load configuration.
    let configuration = json!({
        "jobType": "LOAD",
        "load": {
            "destinationTable": { "projectId": project, "datasetId": "jobs", "tableId": "postings" }
        }
    });
    if *remaining > 0 {
        *remaining -= 1;
        return (
            StatusCode::OK,
            Json(json!({ "jobReference": reference, "status": { "state": "RUNNING" } })),
        );
    }

    let status = match error {
        Some((reason, message)) => json!({
            "state": "DONE",
            "errorResult": { "reason": reason, "message": message }
        }),
        None => json!({ "state": "DONE" }),
    };
    (
        StatusCode::OK,
        Json(json!({
            "jobReference": reference,
            "configuration": configuration,
            "status": status,
            "statistics": { "load": { "outputRows": "2" } }
        })),
    )
}

async fn spawn_fake(state: Shared) -> SocketAddr {
    let app = Router::new()
        .route("/bigquery/v2/projects/:project/datasets", post(insert_dataset))
        .route("/upload/bigquery/v2/projects/:project/jobs", post(upload_job))
        .route("/bigquery/v2/projects/:project/jobs/:job", get(get_job))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> BigQueryClient {
    BigQueryClient::new(Credentials::AccessToken("test-token".into()))
        .with_base_url(format!("http://{}", addr))
        .with_poll_interval(Duration::from_millis(5))
}

fn truncate_load() -> JobConfigurationLoad {
    JobConfigurationLoad {
        destination_table: TableReference {
            project_id: "proj".into(),
            dataset_id: "jobs".into(),
            table_id: "postings".into(),
        },
        source_format: SourceFormat::NewlineDelimitedJson,
        autodetect: true,
        create_disposition: CreateDisposition::CreateIfNeeded,
        write_disposition: WriteDisposition::WriteTruncate,
        schema: None,
    }
}

#[tokio::test]
async fn second_dataset_creation_reports_already_exists() {
    let state = Shared::default();
    let client = client_for(spawn_fake(state.clone()).await);

    let first = client.create_dataset("proj", "jobs", "EU").await.unwrap();
    let second = client.create_dataset("proj", "jobs", "EU").await.unwrap();

    assert!(matches!(first, DatasetCreation::Created(_)));
    assert!(matches!(second, DatasetCreation::AlreadyExists));
    assert_eq!(
        state.lock().unwrap().authorization,
        vec!["Bearer test-token", "Bearer test-token"]
    );
}

#[tokio::test]
async fn other_dataset_failures_surface_api_error() {
    let client = client_for(spawn_fake(Shared::default()).await);

    let err = client
        .create_dataset("forbidden", "jobs", "EU")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("Access Denied"));
}

#[tokio::test]
async fn load_job_uploads_rows_and_waits_until_done() {
    let state = Shared::default();
    let client = client_for(spawn_fake(state.clone()).await);
    let rows = "{\"title\":\"Engineer\"}\n{\"title\":\"Chemist\"}\n";

    let job = client
        .insert_load_job("proj", "EU", truncate_load(), rows.as_bytes().to_vec())
        .await
        .unwrap();
    let done = client.wait_for_job(&job.job_reference).await.unwrap();

    assert_eq!(done.output_rows(), Some(2));
    assert!(done.configuration.is_some());
    let fake = state.lock().unwrap();
    let (metadata, media) = &fake.uploads[0];
    assert_eq!(media, rows);
    assert_eq!(
        metadata["configuration"]["load"]["writeDisposition"],
        "WRITE_TRUNCATE"
    );
    assert_eq!(metadata["configuration"]["load"]["autodetect"], true);
    assert_eq!(metadata["jobReference"]["location"], "EU");
}

#[tokio::test]
async fn done_job_with_error_result_fails() {
    let state = Shared::default();
    state.lock().unwrap().job_error = Some((
        "invalid".into(),
        "Provided Schema does not match Table".into(),
    ));
    let client = client_for(spawn_fake(state).await);

    let job = client
        .insert_load_job("proj", "EU", truncate_load(), b"{}\n".to_vec())
        .await
        .unwrap();
    let err = client.wait_for_job(&job.job_reference).await.unwrap_err();

    match err {
        BigQueryError::JobFailed { reason, message, .. } => {
            assert_eq!(reason, "invalid");
            assert!(message.contains("Schema"));
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
}
