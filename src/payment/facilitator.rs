//! Payment facilitator collaborator
//!
//! The facilitator verifies signed payment authorizations. This crate only
//! asks it questions; settlement and signature checks happen on its side.
//!
//! Endpoints consumed:
//!   GET  /health     -> liveness
//!   GET  /supported  -> supported (scheme, network) pairs
//!   POST /verify     -> validity of a payment for a requirement

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::requirement::PaymentRequirement;
use crate::api::http::{HttpError, SecureHttpClient};
use crate::error::AppError;

/// x402 protocol version sent to the facilitator
pub const X402_VERSION: u32 = 1;

/// Facilitator answer to a verification request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl Verification {
    pub fn valid(payer: Option<String>) -> Self {
        Self {
            is_valid: true,
            invalid_reason: None,
            payer,
        }
    }

    pub fn invalid(reason: &str) -> Self {
        Self {
            is_valid: false,
            invalid_reason: Some(reason.to_string()),
            payer: None,
        }
    }

    /// Collapse into the error taxonomy: a declined payment is `PaymentRejected`
    pub fn into_result(self) -> Result<Option<String>, AppError> {
        if self.is_valid {
            Ok(self.payer)
        } else {
            Err(AppError::PaymentRejected(
                self.invalid_reason
                    .unwrap_or_else(|| "payment declined".to_string()),
            ))
        }
    }
}

/// One supported (scheme, network) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKind {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedKinds {
    #[serde(default)]
    pub kinds: Vec<SupportedKind>,
}

/// Verification request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    x402_version: u32,
    payment_header: &'a str,
    payment_requirements: &'a PaymentRequirement,
}

/// Facilitator operations used by the gate and the payment API
#[async_trait]
pub trait Facilitator: Send + Sync {
    /// Liveness probe; returns whatever status document the facilitator sends
    async fn health(&self) -> Result<serde_json::Value, AppError>;

    async fn supported(&self) -> Result<SupportedKinds, AppError>;

    /// Check a payment authorization against a requirement.
    ///
    /// `Ok` carries the facilitator's verdict (valid or not). `Err` means
    /// no verdict could be obtained.
    async fn verify(
        &self,
        payment_header: &str,
        requirement: &PaymentRequirement,
    ) -> Result<Verification, AppError>;
}

/// Facilitator reached over HTTP(S)
#[derive(Clone)]
pub struct HttpFacilitator {
    base_url: String,
    client: SecureHttpClient,
}

impl HttpFacilitator {
    pub fn new(base_url: &str, client: SecureHttpClient) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Map a transport failure onto the taxonomy
fn classify(operation: &str, err: HttpError) -> AppError {
    if err.is_client_rejection() {
        AppError::PaymentRejected(format!("{}: {}", operation, err))
    } else {
        AppError::FacilitatorUnavailable(format!("{}: {}", operation, err))
    }
}

#[async_trait]
impl Facilitator for HttpFacilitator {
    async fn health(&self) -> Result<serde_json::Value, AppError> {
        self.client
            .get_json(&self.endpoint("health"))
            .await
            .map_err(|e| AppError::FacilitatorUnavailable(format!("health: {}", e)))
    }

    async fn supported(&self) -> Result<SupportedKinds, AppError> {
        self.client
            .get_json(&self.endpoint("supported"))
            .await
            .map_err(|e| AppError::FacilitatorUnavailable(format!("supported: {}", e)))
    }

    async fn verify(
        &self,
        payment_header: &str,
        requirement: &PaymentRequirement,
    ) -> Result<Verification, AppError> {
        let body = VerifyRequest {
            x402_version: X402_VERSION,
            payment_header,
            payment_requirements: requirement,
        };

        match self.client.post_json(&self.endpoint("verify"), &body).await {
            Ok(verification) => {
                debug!(endpoint = %requirement.endpoint, "Facilitator verdict received");
                Ok(verification)
            }
            Err(e) => {
                warn!(endpoint = %requirement.endpoint, error = %e, "Facilitator verify failed");
                match classify("verify", e) {
                    AppError::PaymentRejected(reason) => Ok(Verification::invalid(&reason)),
                    other => Err(other),
                }
            }
        }
    }
}
