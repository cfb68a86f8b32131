//! API response envelopes
//!
//! Every JSON answer is either `{"success": true, "data": ...}` or
//! `{"success": false, "error": {"code", "message", "details"?}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::clients::RemoteResponse;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    /// Success envelope carrying a non-200 status, e.g. the backend's 201
    pub fn with_status(status: StatusCode, data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
            status,
        }
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Relay the backend's success status along with its body
impl<T: Serialize> From<RemoteResponse<T>> for ApiResponse<T> {
    fn from(response: RemoteResponse<T>) -> Self {
        let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
        Self::with_status(status, response.body)
    }
}

/// Error envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        let mut response = Self::new(code, message);
        response.error.details = Some(details);
        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let value = serde_json::to_value(ApiResponse::success(json!({ "id": "1" }))).unwrap();
        assert_eq!(value, json!({ "success": true, "data": { "id": "1" } }));
    }

    #[test]
    fn test_created_keeps_status() {
        let response = ApiResponse::with_status(StatusCode::CREATED, json!(null)).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_remote_status_is_relayed() {
        let response: ApiResponse<_> = RemoteResponse::created(json!({ "id": "1" })).into();
        assert_eq!(response.into_response().status(), StatusCode::CREATED);
    }

    #[test]
    fn test_error_envelope_shape() {
        let value = serde_json::to_value(ErrorResponse::with_details(
            "UPSTREAM_ERROR",
            "object-store returned 500",
            json!({ "service": "object-store" }),
        ))
        .unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "UPSTREAM_ERROR");
        assert_eq!(value["error"]["details"]["service"], "object-store");
    }
}
