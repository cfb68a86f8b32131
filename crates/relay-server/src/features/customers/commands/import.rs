//! Import customers command
//!
//! - Command: the raw CSV payload
//! - Handler: runs the import pipeline and returns its report
//!
//! Payload validation (an empty body is rejected before archiving) lives in
//! [`CustomerImporter::bulk_import`].

use tracing::info;

use crate::import::{CustomerImporter, ImportError, ImportReport};

/// Command to bulk-import customers from CSV text
#[derive(Debug, Clone)]
pub struct ImportCustomersCommand {
    pub payload: String,
}

impl ImportCustomersCommand {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

#[tracing::instrument(skip(importer, command), fields(bytes = command.payload.len()))]
pub async fn handle(
    importer: &CustomerImporter,
    command: ImportCustomersCommand,
) -> Result<ImportReport, ImportError> {
    let report = importer.bulk_import(&command.payload).await?;

    info!(
        archive = %report.archive.node_id,
        inserted = report.summary.inserted,
        updated = report.summary.updated,
        skipped = report.summary.skipped,
        "Customers imported"
    );

    Ok(report)
}
