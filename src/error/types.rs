//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No mechanism produced an identity. Deliberately carries no detail.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Key store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Store(err) => {
                tracing::error!(error = %err, "Key store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// JSON error body: `{"error": "<message>"}`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);

        let store = ApiError::from(StoreError::DynamoDb("timeout".to_string()));
        assert_eq!(store.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let internal = ApiError::from(anyhow::anyhow!("boom"));
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
