//! Customer API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/customers/import` - Bulk import customers from CSV text

use axum::{extract::State, routing::post, Router};

use super::commands::ImportCustomersCommand;
use crate::api::response::ApiResponse;
use crate::error::ApiResult;
use crate::import::{CustomerImporter, ImportReport};
use crate::middleware::body_limit_layer;

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the customers router; import bodies are capped at `max_body_bytes`
pub fn customers_routes(max_body_bytes: usize) -> Router<CustomerImporter> {
    Router::new()
        .route("/import", post(import_customers))
        .layer(body_limit_layer(max_body_bytes))
}

// ============================================================================
// Command Handlers
// ============================================================================

/// Bulk import customers
///
/// # Endpoint
///
/// `POST /api/v1/customers/import`
///
/// # Request Body
///
/// CSV text, one customer per line:
///
/// ```text
/// "1","John","Doe",24,"1234 Main St"
/// ```
///
/// # Response
///
/// - `200 OK` - Import report (per-row failures are listed under `skipped`)
/// - `400 Bad Request` - Empty payload
/// - `413 Payload Too Large` - Body exceeds the import limit
/// - `502 Bad Gateway` - Archive or identifier lookup failed
/// - `503 Service Unavailable` - A required backend's circuit is open
#[tracing::instrument(skip(importer, body), fields(bytes = body.len()))]
async fn import_customers(
    State(importer): State<CustomerImporter>,
    body: String,
) -> ApiResult<ApiResponse<ImportReport>> {
    let report = super::commands::import::handle(&importer, ImportCustomersCommand::new(body)).await?;
    Ok(ApiResponse::success(report))
}
