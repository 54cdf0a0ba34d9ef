//! Feedback Gate
//!
//! Event feedback service with per-submission trust scoring and HTTP 402
//! payment gating of premium resources, verified through an x402 facilitator.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── error.rs       - Error taxonomy and HTTP mapping
//! ├── feedback.rs    - Submissions, records, summaries
//! ├── trust/         - Trust scoring
//! │   └── score.rs   - Signals, weights, score computation
//! ├── payment/       - HTTP 402 payment gating
//! │   ├── routes.rs      - Free/premium classification
//! │   ├── requirement.rs - Payment requirement and price
//! │   ├── gate.rs        - Gate decision
//! │   ├── facilitator.rs - Facilitator trait and HTTP client
//! │   └── response.rs    - 402 / 503 responses
//! ├── api/           - HTTP API endpoints
//! │   ├── feedback.rs   - Submit, list, summary
//! │   ├── export.rs     - Premium export
//! │   ├── payment.rs    - Facilitator views, pricing
//! │   ├── middleware.rs - Gate, rate limit, headers, logging
//! │   └── http.rs       - Secure HTTP client
//! └── database/      - Feedback persistence (PostgreSQL or in-memory)
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod feedback;
pub mod payment;
pub mod trust;

// Re-export main types for convenience
pub use config::GateConfig;
pub use database::{DatabasePool, FeedbackRepository, FeedbackStore, InMemoryFeedbackStore};
pub use error::{AppError, AppResult};
pub use feedback::{FeedbackRecord, FeedbackSubmission, FeedbackSummary};

// Re-export payment types
pub use payment::{
    Access, Facilitator, GateDecision, GatePolicy, GateRequest, HttpFacilitator,
    PaymentRequirement, PaymentRoutes, PaymentTerms, Price, ResourceClass, Verification, gate,
};

// Re-export trust types
pub use trust::{
    RiskLevel, TrustFlags, TrustScore, TrustSignals, TrustWeights, compute_trust_score,
    compute_trust_score_with,
};

// Re-export API types
pub use api::{AppState, HttpSecurityConfig, SecureHttpClient, create_app};
