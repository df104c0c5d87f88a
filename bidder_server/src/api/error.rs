//! Mapping of ledger errors onto HTTP responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bidder::{ErrorKind, LedgerError};
use serde::Serialize;

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

/// Gateway error
#[derive(Debug)]
pub enum ApiError {
    /// Request could not be bound to a command
    BadRequest(String),
    /// The ledger rejected the command
    Ledger(LedgerError),
}

/// HTTP status for a ledger error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InsufficientFunds => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validationError",
        ErrorKind::NotFound => "notFoundError",
        ErrorKind::Conflict => "conflictError",
        ErrorKind::InsufficientFunds => "insufficientFunds",
        ErrorKind::Internal => "internalError",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: message,
                    kind: kind_label(ErrorKind::Validation),
                },
            ),
            ApiError::Ledger(err) => {
                let kind = err.kind();
                if kind == ErrorKind::Internal {
                    tracing::error!(error = %err, "Ledger command failed");
                } else {
                    tracing::debug!(error = %err, "Ledger command rejected");
                }

                (
                    status_for(kind),
                    ErrorResponse {
                        error: err.client_message(),
                        kind: kind_label(kind),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
