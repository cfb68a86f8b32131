//! Search API routes
//!
//! # Route Structure
//!
//! - `PUT /api/v1/search/:index/:id` - Index (or re-index) a document
//! - `POST /api/v1/search/:index` - Run a query against an index

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{post, put},
    Json, Router,
};
use serde_json::Value;

use crate::api::response::ApiResponse;
use crate::clients::Indexer;
use crate::error::{ApiResult, AppError};

pub fn search_routes() -> Router<Arc<dyn Indexer>> {
    Router::new()
        .route("/:index", post(search))
        .route("/:index/:id", put(index_document))
}

#[tracing::instrument(skip(indexer, document))]
async fn index_document(
    State(indexer): State<Arc<dyn Indexer>>,
    Path((index, id)): Path<(String, String)>,
    Json(document): Json<Value>,
) -> ApiResult<ApiResponse<Value>> {
    if !document.is_object() {
        return Err(AppError::Validation("document must be a JSON object".to_string()));
    }

    Ok(indexer.index_document(&index, &id, &document).await?.into())
}

#[tracing::instrument(skip(indexer, query))]
async fn search(
    State(indexer): State<Arc<dyn Indexer>>,
    Path(index): Path<String>,
    Json(query): Json<Value>,
) -> ApiResult<ApiResponse<Value>> {
    Ok(indexer.search(&index, &query).await?.into())
}
