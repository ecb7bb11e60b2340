pub mod activities;
pub mod models;
pub mod pipeline;

pub use activities::{ExtractionError, LoadError, RenderWait};
pub use models::{Destination, Listing, ListingRow, ListingTable};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineError, RunSummary};
