//! Feature modules implementing the Relay API
//!
//! Each feature is a vertical slice with its own routes. Only the customer
//! import carries logic of its own; the other slices forward to one backend.
//!
//! # Features
//!
//! - **customers**: bulk CSV import into the object store
//! - **documents**: document CRUD and queries against the object store
//! - **files**: raw file upload/download against the blob store
//! - **rules**: rule-set evaluation
//! - **search**: indexing and search

pub mod customers;
pub mod documents;
pub mod files;
pub mod rules;
pub mod search;

use std::sync::Arc;

use axum::Router;

use crate::clients::{BlobStore, Indexer, ObjectStore, RulesEngine};
use crate::import::CustomerImporter;

/// Shared state for all feature routes
///
/// Backends are trait objects so tests can mount in-memory fakes.
#[derive(Clone)]
pub struct FeatureState {
    pub object_store: Arc<dyn ObjectStore>,
    pub blob_store: Arc<dyn BlobStore>,
    pub rules: Arc<dyn RulesEngine>,
    pub indexer: Arc<dyn Indexer>,
    pub importer: CustomerImporter,
}

/// Creates the `/api/v1` router with every feature mounted
///
/// - `/customers` - Bulk import
/// - `/documents` - Object store passthrough
/// - `/files` - Blob store passthrough
/// - `/rules` - Rules engine passthrough
/// - `/search` - Indexer passthrough
pub fn router(state: FeatureState) -> Router<()> {
    let max_import_bytes = state.importer.config().max_body_bytes;

    Router::new()
        .nest(
            "/customers",
            customers::customers_routes(max_import_bytes).with_state(state.importer),
        )
        .nest("/documents", documents::documents_routes().with_state(state.object_store))
        .nest("/files", files::files_routes().with_state(state.blob_store))
        .nest("/rules", rules::rules_routes().with_state(state.rules))
        .nest("/search", search::search_routes().with_state(state.indexer))
}
