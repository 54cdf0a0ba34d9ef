//! HTTP shape of gate refusals
//!
//! 402: `PAYMENT-REQUIRED` header with the requirement JSON, and a body whose
//! `payment` member is the very same bytes.
//! 503: facilitator unavailable, distinct body, `Retry-After`.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::error;

use super::requirement::PaymentRequirement;
use crate::error::AppError;

pub const PAYMENT_REQUIRED_HEADER: &str = "payment-required";
pub const PAYMENT_REQUIRED_ERROR: &str = "Payment Required";
pub const PAYMENT_UNAVAILABLE_ERROR: &str = "Payment Verification Unavailable";

/// Seconds a client should wait before retrying after a 503
const RETRY_AFTER_SECS: u32 = 5;

#[derive(Serialize)]
struct PaymentRequiredBody<'a> {
    error: &'static str,
    payment: &'a RawValue,
}

#[derive(Serialize)]
struct UnavailableBody {
    error: &'static str,
    retryable: bool,
}

/// Build the 402 for a requirement, or the error explaining why it can't be sent
pub fn payment_required(requirement: &PaymentRequirement) -> Result<Response, AppError> {
    requirement.check_conformance()?;

    let wire = requirement.to_wire_json()?;
    if !wire.is_ascii() {
        return Err(AppError::Conformance(
            "requirement contains non-ASCII text and cannot travel in a header".to_string(),
        ));
    }
    let header_value = HeaderValue::from_str(&wire).map_err(|e| {
        AppError::Conformance(format!("requirement is not a valid header value: {}", e))
    })?;

    let raw = RawValue::from_string(wire)
        .map_err(|e| AppError::Conformance(format!("requirement JSON invalid: {}", e)))?;
    let body = serde_json::to_vec(&PaymentRequiredBody {
        error: PAYMENT_REQUIRED_ERROR,
        payment: &raw,
    })
    .map_err(|e| AppError::Conformance(format!("failed to encode 402 body: {}", e)))?;

    Response::builder()
        .status(StatusCode::PAYMENT_REQUIRED)
        .header(header::CONTENT_TYPE, "application/json")
        .header(PAYMENT_REQUIRED_HEADER, header_value)
        .body(Body::from(body))
        .map_err(|e| AppError::Conformance(format!("failed to build 402 response: {}", e)))
}

/// 402 response, or a loud 500 if the requirement is defective
pub fn payment_required_response(requirement: &PaymentRequirement) -> Response {
    match payment_required(requirement) {
        Ok(response) => response,
        Err(e) => {
            error!(endpoint = %requirement.endpoint, error = %e, "Refusing to send non-conformant 402");
            e.into_response()
        }
    }
}

/// 503 response for facilitator trouble
pub fn service_unavailable_response() -> Response {
    let body = UnavailableBody {
        error: PAYMENT_UNAVAILABLE_ERROR,
        retryable: true,
    };
    let mut response = (StatusCode::SERVICE_UNAVAILABLE, axum::Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
    response
}
