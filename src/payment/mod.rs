//! HTTP 402 Payment Gating
//!
//! Decides, per request, whether a premium resource may be served.
//!
//! ```text
//!   request ──► PaymentRoutes::classify ──► Free ───────────────► Allowed
//!                                     └──► Premium
//!                                            ├─ dev bypass ─────► Allowed
//!                                            ├─ no evidence ────► 402 + requirement
//!                                            └─ evidence ──► Facilitator /verify
//!                                                   ├─ valid ───► Allowed
//!                                                   ├─ invalid ─► 402 (re-issued)
//!                                                   └─ no answer► 503
//! ```
//!
//! Settlement, signature checks and chain access are the facilitator's job.

pub mod facilitator;
pub mod gate;
pub mod requirement;
pub mod response;
pub mod routes;

pub use facilitator::{
    Facilitator, HttpFacilitator, SupportedKind, SupportedKinds, Verification, X402_VERSION,
};
pub use gate::{Access, GateDecision, GatePolicy, GateRequest, gate, payment_fingerprint};
pub use requirement::{PaymentRequirement, PaymentTerms, Price};
pub use response::{
    PAYMENT_REQUIRED_ERROR, PAYMENT_REQUIRED_HEADER, PAYMENT_UNAVAILABLE_ERROR, payment_required,
    payment_required_response, service_unavailable_response,
};
pub use routes::{PaymentRoutes, PremiumOffer, ResourceClass};

/// Request headers that may carry payment evidence, in lookup order
pub const PAYMENT_EVIDENCE_HEADERS: [&str; 2] = ["x-payment", "payment-signature"];
