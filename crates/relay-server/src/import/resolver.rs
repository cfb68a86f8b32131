//! Existing-identifier resolver

use std::collections::HashSet;

use serde_json::json;
use tracing::{debug, instrument};

use super::mapper::IDENTIFIER_KEY;
use super::ImportError;
use crate::clients::ObjectStore;

/// Snapshot of the identifiers already stored in `db`/`collection`.
///
/// Read once per import; later writes by other imports are not observed.
#[instrument(skip(object_store))]
pub async fn resolve_existing_ids(
    object_store: &dyn ObjectStore,
    db: &str,
    collection: &str,
) -> Result<HashSet<String>, ImportError> {
    let ids = object_store
        .get_distinct(db, collection, IDENTIFIER_KEY, &json!({}))
        .await
        .map_err(ImportError::IdentifierResolution)?
        .body;

    debug!(existing = ids.len(), "Resolved existing identifiers");
    Ok(ids)
}
