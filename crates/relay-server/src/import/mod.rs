//! Bulk customer import
//!
//! One import turns a CSV payload into inserts and replaces against the object
//! store:
//!
//! 1. [`archive`]: the verbatim payload is stored in the blob store first
//! 2. [`parser`] and [`mapper`]: rows become records, bad rows become skips
//! 3. [`resolver`]: one snapshot of the identifiers already stored
//! 4. [`reconcile`]: insert or replace per record, failures become skips
//! 5. [`report`]: outcomes and the archive reference fold into one report
//!
//! Only steps 1 and 3 can fail the import as a whole.

pub mod archive;
pub mod mapper;
pub mod parser;
pub mod reconcile;
pub mod report;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::clients::{BlobStore, ObjectStore, RemoteError};
use crate::config::ImportConfig;
use mapper::{MappedRow, CUSTOMER_COLUMNS};
use parser::{CsvOptions, CsvRows};
use reconcile::ReconcileTarget;
use report::KeyedOutcome;

pub use mapper::{CustomerRecord, MappingError};
pub use report::{ImportReport, ImportStatus, ImportSummary};

/// Failures that abort a whole import. Per-record problems never end up here.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Import payload is empty")]
    EmptyPayload,

    #[error("Failed to archive import payload: {0}")]
    Archive(#[source] RemoteError),

    #[error("Failed to resolve existing customer identifiers: {0}")]
    IdentifierResolution(#[source] RemoteError),
}

impl ImportError {
    /// Remote failure behind the abort, if any
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ImportError::EmptyPayload => None,
            ImportError::Archive(err) | ImportError::IdentifierResolution(err) => Some(err),
        }
    }
}

/// The import pipeline wired to its two backends
#[derive(Clone)]
pub struct CustomerImporter {
    object_store: Arc<dyn ObjectStore>,
    blob_store: Arc<dyn BlobStore>,
    config: ImportConfig,
}

impl CustomerImporter {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        blob_store: Arc<dyn BlobStore>,
        config: ImportConfig,
    ) -> Self {
        Self {
            object_store,
            blob_store,
            config,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            has_headers: self.config.has_headers,
            delimiter: self.config.delimiter,
            expected_fields: CUSTOMER_COLUMNS.len(),
        }
    }

    /// Import `raw_csv` into the configured collection
    #[instrument(
        skip(self, raw_csv),
        fields(
            db = %self.config.database,
            collection = %self.config.collection,
            bytes = raw_csv.len()
        )
    )]
    pub async fn bulk_import(&self, raw_csv: &str) -> Result<ImportReport, ImportError> {
        if raw_csv.trim().is_empty() {
            return Err(ImportError::EmptyPayload);
        }

        let archive = archive::archive_payload(
            self.blob_store.as_ref(),
            &self.config.archive_parent,
            raw_csv,
        )
        .await?;

        let rows = CsvRows::new(raw_csv, self.csv_options());
        let mut outcomes = Vec::new();
        let mut records = Vec::new();
        for row in mapper::map_rows(&rows) {
            match row {
                MappedRow::Record { key, record } => records.push((key, record)),
                MappedRow::Skipped { key, reason } => {
                    outcomes.push(KeyedOutcome::skipped(key, reason))
                },
            }
        }

        let existing = resolver::resolve_existing_ids(
            self.object_store.as_ref(),
            &self.config.database,
            &self.config.collection,
        )
        .await?;

        let target = ReconcileTarget {
            db: &self.config.database,
            collection: &self.config.collection,
            naming: self.config.naming_policy,
        };
        outcomes.extend(
            reconcile::reconcile_all(
                self.object_store.as_ref(),
                target,
                &existing,
                records,
                self.config.concurrency,
            )
            .await,
        );

        let report = report::aggregate(outcomes, archive);
        info!(
            rows = report.summary.rows,
            inserted = report.summary.inserted,
            updated = report.summary.updated,
            skipped = report.summary.skipped,
            "Customer import finished"
        );
        Ok(report)
    }
}
