//! BigQuery-backed warehouse.

use async_trait::async_trait;
use bigquery_client::{
    BigQueryClient, BigQueryError, CreateDisposition, DatasetCreation, JobConfigurationLoad,
    JobReference, SourceFormat, TableFieldSchema, TableReference, TableSchema, WriteDisposition,
};
use tracing::{debug, info};

use super::{JobHandle, LoadOptions, NamespaceCreation, Warehouse, WarehouseError};
use crate::domains::listings::models::{Destination, ListingTable};

/// Error reason BigQuery uses when it rejects values or types.
const INVALID_REASON: &str = "invalid";

pub struct BigQueryWarehouse {
    client: BigQueryClient,
}

impl BigQueryWarehouse {
    pub fn new(client: BigQueryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn create_namespace(
        &self,
        destination: &Destination,
    ) -> Result<NamespaceCreation, WarehouseError> {
        let created = self
            .client
            .create_dataset(
                &destination.project_id,
                &destination.dataset_id,
                &destination.region,
            )
            .await
            .map_err(into_warehouse_error)?;

        Ok(match created {
            DatasetCreation::Created(_) => NamespaceCreation::Created,
            DatasetCreation::AlreadyExists => NamespaceCreation::AlreadyExists,
        })
    }

    async fn submit_load_job(
        &self,
        table: &ListingTable,
        destination: &Destination,
        options: LoadOptions,
    ) -> Result<JobHandle, WarehouseError> {
        let data = table
            .to_ndjson()
            .map_err(|e| WarehouseError::SchemaMismatch {
                message: e.to_string(),
            })?;

        let load = load_configuration(table, destination, options);
        let job = self
            .client
            .insert_load_job(&destination.project_id, &destination.region, load, data)
            .await
            .map_err(into_warehouse_error)?;

        info!(job_id = %job.job_reference.job_id, rows = table.len(), "Load job submitted");
        Ok(JobHandle {
            project_id: job.job_reference.project_id,
            job_id: job.job_reference.job_id,
            location: job
                .job_reference
                .location
                .or_else(|| Some(destination.region.clone())),
        })
    }

    async fn await_job(&self, job: &JobHandle) -> Result<(), WarehouseError> {
        let reference = JobReference {
            project_id: job.project_id.clone(),
            job_id: job.job_id.clone(),
            location: job.location.clone(),
        };

        let done = self
            .client
            .wait_for_job(&reference)
            .await
            .map_err(into_warehouse_error)?;
        debug!(job_id = %job.job_id, output_rows = ?done.output_rows(), "Load job done");
        Ok(())
    }
}

fn load_configuration(
    table: &ListingTable,
    destination: &Destination,
    options: LoadOptions,
) -> JobConfigurationLoad {
    JobConfigurationLoad {
        destination_table: TableReference {
            project_id: destination.project_id.clone(),
            dataset_id: destination.dataset_id.clone(),
            table_id: destination.table_name.clone(),
        },
        source_format: SourceFormat::NewlineDelimitedJson,
        autodetect: options.infer_schema,
        create_disposition: if options.create_if_missing {
            CreateDisposition::CreateIfNeeded
        } else {
            CreateDisposition::CreateNever
        },
        write_disposition: if options.replace_existing {
            WriteDisposition::WriteTruncate
        } else {
            WriteDisposition::WriteAppend
        },
        // Column types are fixed; autodetect cannot type an all-null or empty column.
        schema: Some(explicit_schema(table)),
    }
}

fn explicit_schema(table: &ListingTable) -> TableSchema {
    TableSchema {
        fields: table
            .column_types()
            .iter()
            .map(|(name, column_type)| TableFieldSchema {
                name: name.to_string(),
                field_type: column_type.as_str().to_string(),
                mode: Some("NULLABLE".to_string()),
            })
            .collect(),
    }
}

fn into_warehouse_error(error: BigQueryError) -> WarehouseError {
    match error {
        BigQueryError::JobFailed {
            reason, message, ..
        } if reason == INVALID_REASON => WarehouseError::SchemaMismatch { message },
        BigQueryError::JobFailed {
            job_id, message, ..
        } => WarehouseError::JobFailed { job_id, message },
        other => WarehouseError::Request(other.to_string()),
    }
}
