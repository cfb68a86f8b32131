//! Archival writer

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use super::ImportError;
use crate::clients::{ArchivalReference, BlobStore};

/// Unique node name for one archived payload
pub fn archive_name(now: DateTime<Utc>, id: Uuid) -> String {
    format!("customers-{}-{}.csv", now.format("%Y%m%dT%H%M%SZ"), id)
}

/// Store the verbatim payload under `parent`. Any failure aborts the import.
#[instrument(skip(blob_store, payload), fields(size = payload.len()))]
pub async fn archive_payload(
    blob_store: &dyn BlobStore,
    parent: &str,
    payload: &str,
) -> Result<ArchivalReference, ImportError> {
    let name = archive_name(Utc::now(), Uuid::new_v4());

    let reference = blob_store
        .create_node(parent, &name, payload.as_bytes())
        .await
        .map_err(ImportError::Archive)?
        .body;

    info!(node_id = %reference.node_id, name = %reference.name, "Import payload archived");
    Ok(reference)
}
