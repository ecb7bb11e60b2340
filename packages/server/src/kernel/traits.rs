// Trait abstractions for external collaborators
//
// The pipeline only talks to the browser and the warehouse through these
// traits, so tests can swap in static pages and an in-memory warehouse.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::domains::listings::models::{Destination, ListingTable};

// =============================================================================
// Browser
// =============================================================================

/// Fixed identifying attribute used to locate page elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Matches elements carrying this CSS class.
    Class(&'static str),
    /// Matches elements with this tag name.
    Tag(&'static str),
}

impl Marker {
    /// CSS selector equivalent of the marker.
    pub fn css(&self) -> String {
        match self {
            Marker::Class(class) => format!(".{}", class),
            Marker::Tag(tag) => tag.to_string(),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Class(class) => write!(f, "class \"{}\"", class),
            Marker::Tag(tag) => write!(f, "<{}>", tag),
        }
    }
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to start browser session: {0}")]
    SessionStart(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("element query {selector} failed: {message}")]
    Query { selector: String, message: String },

    #[error("browser shutdown failed: {0}")]
    Shutdown(String),
}

/// An element located on the rendered page.
#[async_trait]
pub trait PageElement: Send + Sync {
    /// First descendant matching `marker`, if any.
    async fn find_one(&self, marker: Marker) -> Result<Option<Box<dyn PageElement>>, BrowserError>;

    /// Rendered text content, surrounding whitespace trimmed.
    async fn text(&self) -> Result<String, BrowserError>;
}

/// A live rendering session.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Every element matching `marker`, in document order.
    async fn find_all(&self, marker: Marker) -> Result<Vec<Box<dyn PageElement>>, BrowserError>;

    /// Release the underlying browser. Safe to call on a session that never
    /// navigated.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Starts and stops rendering sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn start(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;

    async fn stop(&self, mut session: Box<dyn BrowserSession>) -> Result<(), BrowserError> {
        session.close().await
    }
}

// =============================================================================
// Warehouse
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceCreation {
    Created,
    AlreadyExists,
}

/// Load job behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub infer_schema: bool,
    pub create_if_missing: bool,
    pub replace_existing: bool,
}

impl LoadOptions {
    /// Autodetected schema, create the table if needed, truncate then load.
    pub fn replace() -> Self {
        Self {
            infer_schema: true,
            create_if_missing: true,
            replace_existing: true,
        }
    }
}

/// Reference to a submitted load job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub project_id: String,
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The warehouse rejected the table's value types.
    #[error("{message}")]
    SchemaMismatch { message: String },

    #[error("load job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// Transport, auth, quota or permission failure.
    #[error("{0}")]
    Request(String),
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn create_namespace(
        &self,
        destination: &Destination,
    ) -> Result<NamespaceCreation, WarehouseError>;

    async fn submit_load_job(
        &self,
        table: &ListingTable,
        destination: &Destination,
        options: LoadOptions,
    ) -> Result<JobHandle, WarehouseError>;

    /// Block until the job is DONE.
    async fn await_job(&self, job: &JobHandle) -> Result<(), WarehouseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_render_as_css_selectors() {
        assert_eq!(Marker::Class("card-content").css(), ".card-content");
        assert_eq!(Marker::Tag("time").css(), "time");
    }

    #[test]
    fn replace_options_truncate_and_autodetect() {
        let options = LoadOptions::replace();
        assert!(options.infer_schema && options.create_if_missing && options.replace_existing);
    }
}
