use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::design::{DesignDecodeError, StoreError};
use crate::jobserver::JobServerError;

/// Errors a request handler can fail with. Each renders as a JSON body with
/// `status: -1`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Requires a {0}")]
    InvalidMethod(Method),

    #[error("No authenticated user on the request")]
    Unauthenticated,

    #[error("Design {0} does not exist")]
    DesignNotFound(u64),

    #[error("Design {id} is not accessible to {user}")]
    Forbidden { id: u64, user: String },

    #[error("Invalid form submission: {0}")]
    InvalidForm(String),

    #[error("Invalid design id: {0}")]
    InvalidDesignId(String),

    #[error(transparent)]
    JobServer(#[from] JobServerError),

    #[error("{0}")]
    Decode(#[from] DesignDecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::DesignNotFound(_) | ApiError::Store(StoreError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::InvalidForm(_) | ApiError::InvalidDesignId(_) => StatusCode::BAD_REQUEST,
            ApiError::JobServer(_) => StatusCode::BAD_GATEWAY,
            ApiError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine readable error code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidMethod(_)
            | ApiError::InvalidForm(_)
            | ApiError::InvalidDesignId(_) => "INVALID_REQUEST_ERROR",
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::DesignNotFound(_) | ApiError::Store(StoreError::NotFound(_)) => "NOT_FOUND",
            ApiError::Forbidden { .. } => "PERMISSION_DENIED",
            ApiError::JobServer(_) => "JOB_SERVER_ERROR",
            ApiError::Decode(_) => "DESIGN_DECODE_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::JobServer(e) => {
                tracing::error!(error_type = e.error_type(), error = %e, "Job server call failed");
            }
            ApiError::Decode(e) => {
                tracing::error!(error = %e, "Stored design could not be decoded");
            }
            other => {
                tracing::warn!(code = other.code(), error = %other, "Request rejected");
            }
        }

        let body = json!({
            "status": -1,
            "code": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
