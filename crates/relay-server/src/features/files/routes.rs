//! File API routes
//!
//! Raw byte passthrough to the blob store.
//!
//! # Route Structure
//!
//! - `POST /api/v1/files/:node?name=<name>` - Store the body as a child of `:node`
//! - `GET /api/v1/files/:node` - Download a node's content
//! - `DELETE /api/v1/files/:node` - Delete a node

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;

use crate::api::response::ApiResponse;
use crate::clients::{ArchivalReference, BlobStore};
use crate::error::{ApiResult, AppError};

pub fn files_routes() -> Router<Arc<dyn BlobStore>> {
    Router::new().route(
        "/:node",
        post(upload_file).get(download_file).delete(delete_file),
    )
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub name: String,
}

#[tracing::instrument(skip(blob_store, params, body), fields(name = %params.name, size = body.len()))]
async fn upload_file(
    State(blob_store): State<Arc<dyn BlobStore>>,
    Path(node): Path<String>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<ApiResponse<ArchivalReference>> {
    let name = params.name.trim();
    if name.is_empty() || name.contains('/') {
        return Err(AppError::Validation(
            "file name must be non-empty and must not contain '/'".to_string(),
        ));
    }

    let response = blob_store.create_node(&node, name, &body).await?;

    tracing::info!(
        node_id = %response.body.node_id,
        checksum = %response.body.checksum,
        "File stored via API"
    );

    Ok(response.into())
}

#[tracing::instrument(skip(blob_store))]
async fn download_file(
    State(blob_store): State<Arc<dyn BlobStore>>,
    Path(node): Path<String>,
) -> ApiResult<Response> {
    let content = blob_store.get_content(&node).await?.body;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        content,
    )
        .into_response())
}

#[tracing::instrument(skip(blob_store))]
async fn delete_file(
    State(blob_store): State<Arc<dyn BlobStore>>,
    Path(node): Path<String>,
) -> ApiResult<StatusCode> {
    blob_store.delete_node(&node).await?;
    Ok(StatusCode::NO_CONTENT)
}
