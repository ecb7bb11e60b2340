//! Kernel module - external collaborators and dependencies.

pub mod bigquery_warehouse;
pub mod browser;
pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use bigquery_warehouse::BigQueryWarehouse;
pub use browser::{ChromeProvider, ChromeSession, SessionOptions};
pub use deps::ServerDeps;
pub use test_dependencies::TestDependencies;
pub use traits::*;
