// TestDependencies - in-memory collaborators for testing
//
// Static HTML pages stand in for the browser and an in-memory warehouse
// stands in for BigQuery.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    BrowserError, BrowserSession, JobHandle, LoadOptions, Marker, NamespaceCreation, PageElement,
    ServerDeps, SessionProvider, Warehouse, WarehouseError,
};
use crate::domains::listings::models::{Destination, ListingRow, ListingTable};

// =============================================================================
// Fixture pages
// =============================================================================

/// One listing card shaped like the live job board's markup.
pub fn fake_jobs_card(title: &str, company: &str, location: &str, date_posted: &str) -> String {
    format!(
        r#"<div class="card">
  <div class="card-content">
    <div class="media">
      <div class="media-content">
        <h2 class="title is-5">{title}</h2>
        <h3 class="subtitle is-6 company">{company}</h3>
      </div>
    </div>
    <div class="content">
      <p class="location">
        {location}
      </p>
      <p class="is-small has-text-grey">
        <time datetime="{date_posted}">{date_posted}</time>
      </p>
    </div>
  </div>
</div>"#
    )
}

/// A full page wrapping the given cards.
pub fn fake_jobs_page(cards: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Fake Python</title></head>
<body>
  <section class="section">
    <h1 class="title is-1">Fake Python</h1>
    <div id="ResultsContainer" class="columns is-multiline">
{}
    </div>
  </section>
</body>
</html>"#,
        cards.join("\n")
    )
}

// =============================================================================
// Static page browser
// =============================================================================

fn select_html(html: &str, marker: Marker, fragment: bool) -> Result<Vec<String>, BrowserError> {
    let css = marker.css();
    let selector = Selector::parse(&css).map_err(|e| BrowserError::Query {
        selector: css.clone(),
        message: format!("{:?}", e),
    })?;

    let document = if fragment {
        Html::parse_fragment(html)
    } else {
        Html::parse_document(html)
    };
    Ok(document.select(&selector).map(|el| el.html()).collect())
}

fn rendered_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Serves fixed HTML per URL. Counts starts and stops for assertions.
#[derive(Default)]
pub struct StaticPageProvider {
    pages: Arc<HashMap<String, String>>,
    start_failure: Option<String>,
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
    navigations: Arc<Mutex<Vec<String>>>,
}

impl StaticPageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.into(), html.into());
        self
    }

    /// Make every `start` fail as if the browser binary were missing.
    pub fn failing_to_start(mut self, message: impl Into<String>) -> Self {
        self.start_failure = Some(message.into());
        self
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionProvider for StaticPageProvider {
    async fn start(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if let Some(message) = &self.start_failure {
            return Err(BrowserError::SessionStart(message.clone()));
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticPageSession {
            pages: self.pages.clone(),
            current: Mutex::new(None),
            navigations: self.navigations.clone(),
        }))
    }

    async fn stop(&self, mut session: Box<dyn BrowserSession>) -> Result<(), BrowserError> {
        self.stopped.fetch_add(1, Ordering::SeqCst);
        session.close().await
    }
}

pub struct StaticPageSession {
    pages: Arc<HashMap<String, String>>,
    current: Mutex<Option<String>>,
    navigations: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BrowserSession for StaticPageSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.navigations.lock().unwrap().push(url.to_string());
        let html = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            })?;
        *self.current.lock().unwrap() = Some(html);
        Ok(())
    }

    async fn find_all(&self, marker: Marker) -> Result<Vec<Box<dyn PageElement>>, BrowserError> {
        let current = self.current.lock().unwrap().clone();
        let Some(html) = current else {
            return Ok(Vec::new());
        };

        Ok(select_html(&html, marker, false)?
            .into_iter()
            .map(|html| Box::new(StaticElement { html }) as Box<dyn PageElement>)
            .collect())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}

struct StaticElement {
    html: String,
}

#[async_trait]
impl PageElement for StaticElement {
    async fn find_one(&self, marker: Marker) -> Result<Option<Box<dyn PageElement>>, BrowserError> {
        Ok(select_html(&self.html, marker, true)?
            .into_iter()
            .next()
            .map(|html| Box::new(StaticElement { html }) as Box<dyn PageElement>))
    }

    async fn text(&self) -> Result<String, BrowserError> {
        Ok(rendered_text(&self.html))
    }
}

// =============================================================================
// Mock Warehouse
// =============================================================================

/// Calls recorded by [`MockWarehouse`].
#[derive(Debug, Clone, PartialEq)]
pub enum WarehouseCall {
    CreateNamespace { dataset: String },
    SubmitLoad {
        table: String,
        rows: usize,
        options: LoadOptions,
    },
    AwaitJob { job_id: String },
}

struct PendingLoad {
    table: String,
    rows: Vec<ListingRow>,
    options: LoadOptions,
}

/// In-memory warehouse. Jobs are applied atomically when awaited.
#[derive(Default)]
pub struct MockWarehouse {
    namespaces: Mutex<HashSet<String>>,
    tables: Mutex<HashMap<String, Vec<ListingRow>>>,
    pending: Mutex<HashMap<String, PendingLoad>>,
    namespace_failure: Option<String>,
    job_failure: Mutex<Option<WarehouseError>>,
    panic_on_submit: bool,
    next_job: AtomicUsize,
    calls: Mutex<Vec<WarehouseCall>>,
}

impl MockWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a dataset (`project.dataset`).
    pub fn with_namespace(self, dataset: impl Into<String>) -> Self {
        self.namespaces.lock().unwrap().insert(dataset.into());
        self
    }

    pub fn fail_namespace_creation(mut self, message: impl Into<String>) -> Self {
        self.namespace_failure = Some(message.into());
        self
    }

    /// The next awaited job fails with `error` and writes nothing.
    pub fn fail_jobs_with(self, error: WarehouseError) -> Self {
        *self.job_failure.lock().unwrap() = Some(error);
        self
    }

    pub fn panicking_on_submit(mut self) -> Self {
        self.panic_on_submit = true;
        self
    }

    pub fn has_namespace(&self, dataset: &str) -> bool {
        self.namespaces.lock().unwrap().contains(dataset)
    }

    /// Current contents of `project.dataset.table`.
    pub fn table(&self, table: &str) -> Option<Vec<ListingRow>> {
        self.tables.lock().unwrap().get(table).cloned()
    }

    pub fn calls(&self) -> Vec<WarehouseCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn create_namespace(
        &self,
        destination: &Destination,
    ) -> Result<NamespaceCreation, WarehouseError> {
        let dataset = destination.dataset_path();
        self.calls.lock().unwrap().push(WarehouseCall::CreateNamespace {
            dataset: dataset.clone(),
        });

        if let Some(message) = &self.namespace_failure {
            return Err(WarehouseError::Request(message.clone()));
        }
        if self.namespaces.lock().unwrap().insert(dataset) {
            Ok(NamespaceCreation::Created)
        } else {
            Ok(NamespaceCreation::AlreadyExists)
        }
    }

    async fn submit_load_job(
        &self,
        table: &ListingTable,
        destination: &Destination,
        options: LoadOptions,
    ) -> Result<JobHandle, WarehouseError> {
        if self.panic_on_submit {
            panic!("warehouse exploded");
        }

        let table_path = destination.table_path();
        self.calls.lock().unwrap().push(WarehouseCall::SubmitLoad {
            table: table_path.clone(),
            rows: table.len(),
            options,
        });

        let job_id = format!("job_{}", self.next_job.fetch_add(1, Ordering::SeqCst));
        self.pending.lock().unwrap().insert(
            job_id.clone(),
            PendingLoad {
                table: table_path,
                rows: table.rows().to_vec(),
                options,
            },
        );

        Ok(JobHandle {
            project_id: destination.project_id.clone(),
            job_id,
            location: Some(destination.region.clone()),
        })
    }

    async fn await_job(&self, job: &JobHandle) -> Result<(), WarehouseError> {
        self.calls.lock().unwrap().push(WarehouseCall::AwaitJob {
            job_id: job.job_id.clone(),
        });

        let load = self
            .pending
            .lock()
            .unwrap()
            .remove(&job.job_id)
            .ok_or_else(|| WarehouseError::Request(format!("Not found: Job {}", job.job_id)))?;

        if let Some(error) = self.job_failure.lock().unwrap().take() {
            return Err(error);
        }

        let dataset = load.table.rsplit_once('.').map(|(d, _)| d).unwrap_or("");
        if !self.has_namespace(dataset) {
            return Err(WarehouseError::JobFailed {
                job_id: job.job_id.clone(),
                message: format!("Not found: Dataset {}", dataset),
            });
        }

        let mut tables = self.tables.lock().unwrap();
        match tables.get_mut(&load.table) {
            Some(existing) if load.options.replace_existing => *existing = load.rows,
            Some(existing) => existing.extend(load.rows),
            None if load.options.create_if_missing => {
                tables.insert(load.table, load.rows);
            }
            None => {
                return Err(WarehouseError::JobFailed {
                    job_id: job.job_id.clone(),
                    message: format!("Not found: Table {}", load.table),
                })
            }
        }
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Builds [`ServerDeps`] from in-memory collaborators while keeping handles
/// to them for assertions.
pub struct TestDependencies {
    pub sessions: Arc<StaticPageProvider>,
    pub warehouse: Arc<MockWarehouse>,
}

impl TestDependencies {
    pub fn new(sessions: StaticPageProvider, warehouse: MockWarehouse) -> Self {
        Self {
            sessions: Arc::new(sessions),
            warehouse: Arc::new(warehouse),
        }
    }

    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(self.sessions.clone(), self.warehouse.clone())
    }
}
