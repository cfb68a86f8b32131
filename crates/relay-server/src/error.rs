//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::clients::RemoteError;
use crate::import::ImportError;

/// Result type alias for handlers
pub type ApiResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// HTTP status, error code and client message
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Remote(err) => remote_parts(err),
            AppError::Import(ImportError::EmptyPayload) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string())
            },
            AppError::Import(err) => match err.remote() {
                Some(RemoteError::CircuitOpen { .. }) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "UPSTREAM_UNAVAILABLE",
                    err.to_string(),
                ),
                _ => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string()),
            },
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
            },
        }
    }
}

/// Client errors pass through with their status; backend faults become 502/503
fn remote_parts(err: &RemoteError) -> (StatusCode, &'static str, String) {
    match err {
        RemoteError::Status { status, detail, .. } if (400..500).contains(status) => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST);
            let code = match status {
                StatusCode::NOT_FOUND => "NOT_FOUND",
                StatusCode::CONFLICT => "CONFLICT",
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "UPSTREAM_FORBIDDEN",
                _ => "UPSTREAM_REJECTED",
            };
            (status, code, detail.clone())
        },
        RemoteError::CircuitOpen { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE", err.to_string())
        },
        RemoteError::Status { .. } | RemoteError::Transport { .. } | RemoteError::Decode { .. } => {
            (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
        },
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = match &self {
            AppError::Remote(err) | AppError::Import(ImportError::Archive(err))
            | AppError::Import(ImportError::IdentifierResolution(err)) => {
                ErrorResponse::with_details(code, message, json!({ "service": err.service() }))
            },
            _ => ErrorResponse::new(code, message),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    fn remote(status: u16) -> AppError {
        AppError::Remote(RemoteError::Status {
            service: "object-store".into(),
            status,
            detail: "detail".into(),
        })
    }

    #[test]
    fn test_remote_client_errors_pass_through() {
        assert_eq!(status_of(remote(404)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(remote(409)), StatusCode::CONFLICT);
        assert_eq!(status_of(remote(422)), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_remote_faults_map_to_gateway_errors() {
        assert_eq!(status_of(remote(500)), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(AppError::Remote(RemoteError::Transport {
                service: "indexer".into(),
                message: "refused".into(),
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Remote(RemoteError::CircuitOpen {
                service: "indexer".into(),
            })),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_import_errors() {
        assert_eq!(
            status_of(AppError::Import(ImportError::EmptyPayload)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Import(ImportError::Archive(RemoteError::CircuitOpen {
                service: "blob-store".into(),
            }))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AppError::Import(ImportError::IdentifierResolution(
                RemoteError::Transport {
                    service: "object-store".into(),
                    message: "timed out".into(),
                }
            ))),
            StatusCode::BAD_GATEWAY
        );
    }
}
