//! Payment gate decision
//!
//! Stateless: every call looks only at its arguments. Fail closed: without a
//! positive verdict from the facilitator a premium resource is not served.

use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::facilitator::Facilitator;
use super::requirement::{PaymentRequirement, PaymentTerms};
use super::routes::ResourceClass;
use crate::error::AppError;

/// Why a request was let through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Free,
    DevBypass,
    Paid { payer: Option<String> },
}

/// Outcome of gating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed(Access),
    PaymentRequired(PaymentRequirement),
    ServiceUnavailable { reason: String },
}

/// The request as the gate sees it
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub path: &'a str,
    pub method: &'a str,
    /// Raw payment evidence header, if any
    pub payment: Option<&'a str>,
}

/// Explicit gate settings; nothing is read from the environment here
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub dev_bypass: bool,
    pub terms: PaymentTerms,
    pub facilitator_timeout: Duration,
}

/// Short, stable identifier for payment evidence in logs
pub fn payment_fingerprint(payment: &str) -> String {
    let digest = Sha256::digest(payment.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// Decide whether `request` may reach `resource`
pub async fn gate(
    request: GateRequest<'_>,
    resource: &ResourceClass,
    policy: &GatePolicy,
    facilitator: &dyn Facilitator,
) -> GateDecision {
    let offer = match resource {
        ResourceClass::Free => return GateDecision::Allowed(Access::Free),
        ResourceClass::Premium(offer) => offer,
    };

    if policy.dev_bypass {
        debug!(path = %request.path, "Premium resource served under development bypass");
        return GateDecision::Allowed(Access::DevBypass);
    }

    let requirement = policy.terms.requirement_for(
        offer.price,
        &offer.description,
        request.path,
        request.method,
    );

    let payment = match request.payment.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => {
            debug!(path = %request.path, "No payment evidence, issuing requirement");
            return GateDecision::PaymentRequired(requirement);
        }
    };

    let fingerprint = payment_fingerprint(payment);

    let verdict = tokio::time::timeout(
        policy.facilitator_timeout,
        facilitator.verify(payment, &requirement),
    )
    .await;

    match verdict {
        Err(_) => {
            warn!(
                path = %request.path,
                payment = %fingerprint,
                timeout_ms = policy.facilitator_timeout.as_millis() as u64,
                "Facilitator verification timed out"
            );
            GateDecision::ServiceUnavailable {
                reason: "facilitator timed out".to_string(),
            }
        }
        Ok(Err(e)) => {
            warn!(path = %request.path, payment = %fingerprint, error = %e, "Facilitator gave no verdict");
            match e {
                AppError::PaymentRejected(_) => GateDecision::PaymentRequired(requirement),
                other => GateDecision::ServiceUnavailable {
                    reason: other.to_string(),
                },
            }
        }
        Ok(Ok(verification)) => match verification.into_result() {
            Ok(payer) => {
                info!(path = %request.path, payment = %fingerprint, "Payment verified");
                GateDecision::Allowed(Access::Paid { payer })
            }
            Err(reason) => {
                info!(
                    path = %request.path,
                    payment = %fingerprint,
                    reason = %reason,
                    "Payment rejected, re-issuing requirement"
                );
                GateDecision::PaymentRequired(requirement)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::facilitator::{SupportedKinds, Verification};
    use crate::payment::requirement::Price;
    use crate::payment::routes::PremiumOffer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Accept,
        Decline,
        Down,
        Hang,
    }

    struct ScriptedFacilitator {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedFacilitator {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Facilitator for ScriptedFacilitator {
        async fn health(&self) -> Result<serde_json::Value, AppError> {
            Ok(serde_json::json!({ "status": "ok" }))
        }

        async fn supported(&self) -> Result<SupportedKinds, AppError> {
            Ok(SupportedKinds::default())
        }

        async fn verify(
            &self,
            _payment_header: &str,
            _requirement: &PaymentRequirement,
        ) -> Result<Verification, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Accept => Ok(Verification::valid(Some("0xpayer".to_string()))),
                Script::Decline => Ok(Verification::invalid("invalid_signature")),
                Script::Down => Err(AppError::FacilitatorUnavailable("connection refused".into())),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(Verification::valid(None))
                }
            }
        }
    }

    fn policy(dev_bypass: bool) -> GatePolicy {
        GatePolicy {
            dev_bypass,
            terms: PaymentTerms {
                currency: "USD".to_string(),
                token: "eip155:84532/erc20:0x036CbD53842c5426634e7929541eC2318f3dCF7e".to_string(),
                recipient: "0x1111111111111111111111111111111111111111".to_string(),
                facilitator: "https://x402.org/facilitator".to_string(),
            },
            facilitator_timeout: Duration::from_millis(100),
        }
    }

    fn premium() -> ResourceClass {
        ResourceClass::Premium(PremiumOffer {
            price: Price::from_micros(10_000),
            description: "Full feedback export".to_string(),
        })
    }

    fn request(payment: Option<&str>) -> GateRequest<'_> {
        GateRequest {
            path: "/export/evt_1",
            method: "GET",
            payment,
        }
    }

    #[tokio::test]
    async fn test_free_resource_always_allowed() {
        let facilitator = ScriptedFacilitator::new(Script::Down);
        let decision = gate(request(None), &ResourceClass::Free, &policy(false), &facilitator).await;
        assert_eq!(decision, GateDecision::Allowed(Access::Free));
        assert_eq!(facilitator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dev_bypass_ignores_header() {
        let facilitator = ScriptedFacilitator::new(Script::Decline);
        for payment in [None, Some("garbage")] {
            let decision = gate(request(payment), &premium(), &policy(true), &facilitator).await;
            assert_eq!(decision, GateDecision::Allowed(Access::DevBypass));
        }
        assert_eq!(facilitator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_header_requires_payment() {
        let facilitator = ScriptedFacilitator::new(Script::Accept);
        let decision = gate(request(None), &premium(), &policy(false), &facilitator).await;

        match decision {
            GateDecision::PaymentRequired(req) => {
                assert!(req.check_conformance().is_ok());
                assert_eq!(req.endpoint, "/export/evt_1");
                assert_eq!(req.method, "GET");
                assert_eq!(req.price.to_string(), "0.01");
            }
            other => panic!("expected 402, got {:?}", other),
        }
        assert_eq!(facilitator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_header_treated_as_missing() {
        let facilitator = ScriptedFacilitator::new(Script::Accept);
        let decision = gate(request(Some("   ")), &premium(), &policy(false), &facilitator).await;
        assert!(matches!(decision, GateDecision::PaymentRequired(_)));
        assert_eq!(facilitator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_payment_allowed() {
        let facilitator = ScriptedFacilitator::new(Script::Accept);
        let decision = gate(request(Some("eyJwYXkiOjF9")), &premium(), &policy(false), &facilitator).await;
        assert_eq!(
            decision,
            GateDecision::Allowed(Access::Paid {
                payer: Some("0xpayer".to_string())
            })
        );
        assert_eq!(facilitator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_payment_reissues_requirement() {
        let facilitator = ScriptedFacilitator::new(Script::Decline);
        let decision = gate(request(Some("eyJwYXkiOjF9")), &premium(), &policy(false), &facilitator).await;
        assert!(matches!(decision, GateDecision::PaymentRequired(_)));
    }

    #[tokio::test]
    async fn test_unreachable_facilitator_fails_closed() {
        let facilitator = ScriptedFacilitator::new(Script::Down);
        let decision = gate(request(Some("eyJwYXkiOjF9")), &premium(), &policy(false), &facilitator).await;
        assert!(matches!(decision, GateDecision::ServiceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_timeout_fails_closed() {
        let facilitator = ScriptedFacilitator::new(Script::Hang);
        let decision = gate(request(Some("eyJwYXkiOjF9")), &premium(), &policy(false), &facilitator).await;
        match decision {
            GateDecision::ServiceUnavailable { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected 503, got {:?}", other),
        }
    }

    #[test]
    fn test_payment_fingerprint_stable() {
        let a = payment_fingerprint("abc");
        assert_eq!(a.len(), 16);
        assert_eq!(a, payment_fingerprint("abc"));
        assert_ne!(a, payment_fingerprint("abd"));
    }
}
