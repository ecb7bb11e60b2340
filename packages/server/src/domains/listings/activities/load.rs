//! Warehouse load: ensure the dataset, then replace the table contents.

use thiserror::Error;
use tracing::{error, info};

use crate::domains::listings::models::{Destination, ListingTable};
use crate::kernel::{LoadOptions, NamespaceCreation, Warehouse, WarehouseError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to create dataset {dataset}: {source}")]
    Namespace {
        dataset: String,
        #[source]
        source: WarehouseError,
    },

    #[error("schema mismatch loading {destination} ({column_types}): {message}")]
    SchemaMismatch {
        destination: String,
        column_types: String,
        message: String,
    },

    #[error("load into {destination} failed: {source}")]
    LoadJob {
        destination: String,
        #[source]
        source: WarehouseError,
    },
}

/// Replace the destination table with `table`.
///
/// The dataset is created first; an existing dataset is fine. The whole table
/// goes up as one autodetected, create-if-needed, truncating load job and
/// this returns once that job is done. Prior rows are gone afterwards.
pub async fn load_listings(
    warehouse: &dyn Warehouse,
    table: &ListingTable,
    destination: &Destination,
) -> Result<(), LoadError> {
    match warehouse.create_namespace(destination).await {
        Ok(NamespaceCreation::Created) => {
            info!(dataset = %destination.dataset_path(), region = %destination.region, "Created dataset");
        }
        Ok(NamespaceCreation::AlreadyExists) => {
            info!(dataset = %destination.dataset_path(), "Dataset already exists");
        }
        Err(source) => {
            return Err(LoadError::Namespace {
                dataset: destination.dataset_path(),
                source,
            });
        }
    }

    let submitted = warehouse
        .submit_load_job(table, destination, LoadOptions::replace())
        .await;
    let result = match submitted {
        Ok(job) => warehouse.await_job(&job).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!(destination = %destination, rows = table.len(), "Data uploaded successfully");
            Ok(())
        }
        Err(WarehouseError::SchemaMismatch { message }) => {
            let column_types = table.describe_columns();
            error!(
                destination = %destination,
                column_types = %column_types,
                message = %message,
                "Warehouse rejected the table's column types"
            );
            Err(LoadError::SchemaMismatch {
                destination: destination.table_path(),
                column_types,
                message,
            })
        }
        Err(source) => Err(LoadError::LoadJob {
            destination: destination.table_path(),
            source,
        }),
    }
}
