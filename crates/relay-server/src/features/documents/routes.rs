//! Document API routes
//!
//! Passthrough to the object store. Backend client errors keep their status,
//! backend faults answer 502/503.
//!
//! # Route Structure
//!
//! - `POST /api/v1/documents/:db/:collection` - Insert a document
//! - `POST /api/v1/documents/:db/:collection/query` - Documents matching a filter
//! - `GET /api/v1/documents/:db/:collection/distinct/:field` - Distinct values of a field
//! - `GET /api/v1/documents/:db/:collection/:id` - Fetch a document
//! - `PUT /api/v1/documents/:db/:collection/:id` - Replace a document
//! - `DELETE /api/v1/documents/:db/:collection/:id` - Delete a document

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::response::ApiResponse;
use crate::clients::ObjectStore;
use crate::error::{ApiResult, AppError};

pub fn documents_routes() -> Router<Arc<dyn ObjectStore>> {
    Router::new()
        .route("/:db/:collection", post(insert_document))
        .route("/:db/:collection/query", post(query_documents))
        .route("/:db/:collection/distinct/:field", get(distinct_values))
        .route(
            "/:db/:collection/:id",
            get(get_document).put(replace_document).delete(delete_document),
        )
}

/// Insert a document. A missing `id` is generated.
///
/// `POST /api/v1/documents/:db/:collection`
#[tracing::instrument(skip(store, document))]
async fn insert_document(
    State(store): State<Arc<dyn ObjectStore>>,
    Path((db, collection)): Path<(String, String)>,
    Json(document): Json<Value>,
) -> ApiResult<ApiResponse<Value>> {
    let Value::Object(mut fields) = document else {
        return Err(AppError::Validation("document must be a JSON object".to_string()));
    };

    let id = match fields.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        None | Some(Value::Null) => Uuid::new_v4().to_string(),
        Some(_) => {
            return Err(AppError::Validation("document id must be a non-empty string".to_string()))
        },
    };
    fields.insert("id".to_string(), Value::String(id.clone()));

    let response = store
        .insert(&db, &collection, &id, &Value::Object(fields))
        .await?;

    tracing::info!(document_id = %id, "Document inserted");
    Ok(response.into())
}

/// `GET /api/v1/documents/:db/:collection/:id`
#[tracing::instrument(skip(store))]
async fn get_document(
    State(store): State<Arc<dyn ObjectStore>>,
    Path((db, collection, id)): Path<(String, String, String)>,
) -> ApiResult<ApiResponse<Value>> {
    Ok(store.get(&db, &collection, &id).await?.into())
}

/// `PUT /api/v1/documents/:db/:collection/:id`
#[tracing::instrument(skip(store, document))]
async fn replace_document(
    State(store): State<Arc<dyn ObjectStore>>,
    Path((db, collection, id)): Path<(String, String, String)>,
    Json(document): Json<Value>,
) -> ApiResult<ApiResponse<Value>> {
    if let Some(body_id) = document.get("id").and_then(Value::as_str) {
        if body_id != id {
            return Err(AppError::Validation(format!(
                "document id '{body_id}' does not match path id '{id}'"
            )));
        }
    }

    Ok(store.replace(&db, &collection, &id, &document).await?.into())
}

/// `DELETE /api/v1/documents/:db/:collection/:id`
#[tracing::instrument(skip(store))]
async fn delete_document(
    State(store): State<Arc<dyn ObjectStore>>,
    Path((db, collection, id)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    store.delete(&db, &collection, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Documents matching a filter; the body is the filter itself
///
/// `POST /api/v1/documents/:db/:collection/query`
#[tracing::instrument(skip(store, filter))]
async fn query_documents(
    State(store): State<Arc<dyn ObjectStore>>,
    Path((db, collection)): Path<(String, String)>,
    Json(filter): Json<Value>,
) -> ApiResult<ApiResponse<Vec<Value>>> {
    if !filter.is_object() {
        return Err(AppError::Validation("filter must be a JSON object".to_string()));
    }

    let documents = store.query(&db, &collection, &filter).await?.body;
    let count = documents.len();
    Ok(ApiResponse::success(documents).with_meta(json!({ "count": count })))
}

/// `GET /api/v1/documents/:db/:collection/distinct/:field`
#[tracing::instrument(skip(store))]
async fn distinct_values(
    State(store): State<Arc<dyn ObjectStore>>,
    Path((db, collection, field)): Path<(String, String, String)>,
) -> ApiResult<ApiResponse<Vec<String>>> {
    let mut values: Vec<String> = store
        .get_distinct(&db, &collection, &field, &json!({}))
        .await?
        .body
        .into_iter()
        .collect();
    values.sort();
    Ok(ApiResponse::success(values))
}
