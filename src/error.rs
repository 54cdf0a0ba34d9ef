//! Error taxonomy for the feedback gate
//!
//! Every error maps to exactly one HTTP status. Response bodies carry a
//! generic message only; the detail goes to the log.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input (submission fields, path parameters).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The gate built an incomplete payment requirement. Internal defect.
    #[error("payment requirement conformance violation: {0}")]
    Conformance(String),

    /// Facilitator could not be reached, timed out, or answered with a 5xx.
    #[error("payment facilitator unavailable: {0}")]
    FacilitatorUnavailable(String),

    /// Facilitator reached and declined the payment.
    ///
    /// The gate turns this into a re-issued 402 with a full requirement. A
    /// bare rejection has no requirement to send, so reaching `into_response`
    /// with it is treated as a conformance defect.
    #[error("payment rejected: {0}")]
    PaymentRejected(String),

    /// Persistence layer failure.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl AppError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::FacilitatorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Conformance(_) | Self::PaymentRejected(_) | Self::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Invalid request",
            Self::NotFound(_) => "Not found",
            Self::FacilitatorUnavailable(_) => "Payment Verification Unavailable",
            Self::Conformance(_) | Self::PaymentRejected(_) | Self::Storage(_) => {
                "Internal server error"
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Conformance(_) | Self::PaymentRejected(_) => error!(error = %self, "Gate defect"),
            Self::Storage(_) => error!(error = %self, "Storage failure"),
            Self::FacilitatorUnavailable(_) => warn!(error = %self, "Facilitator unavailable"),
            Self::Validation(_) | Self::NotFound(_) => warn!(error = %self, "Request rejected"),
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
