//! Rules API routes
//!
//! - `POST /api/v1/rules/:ruleset/evaluate` - Evaluate a rule set against the body

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde_json::Value;

use crate::api::response::ApiResponse;
use crate::clients::RulesEngine;
use crate::error::ApiResult;

pub fn rules_routes() -> Router<Arc<dyn RulesEngine>> {
    Router::new().route("/:ruleset/evaluate", post(evaluate))
}

#[tracing::instrument(skip(rules, facts))]
async fn evaluate(
    State(rules): State<Arc<dyn RulesEngine>>,
    Path(ruleset): Path<String>,
    Json(facts): Json<Value>,
) -> ApiResult<ApiResponse<Value>> {
    Ok(rules.evaluate(&ruleset, &facts).await?.into())
}
