//! Trust Scoring for Feedback Submissions
//!
//! Maps the signals available at submission time to a 0-100 score and a
//! risk tier. The score is computed once and stored with the feedback record.
//!
//! ## Score Model
//!
//! ```text
//!   self verification  +30
//!   wallet connected   +20
//!   not rate limited   +50   (session count <= 10)
//!   rate limited       -50   (session count  > 10)
//!   ---------------------------------------------
//!   clamped to [0, 100]
//! ```
//!
//! Tiers: `trusted` needs score >= 70 AND self verification; `risk` is any
//! score below 30 or any rate-limited session; everything else is
//! `unverified`. Rate limiting always wins.

mod score;

pub use score::{
    RiskLevel, TrustFlags, TrustScore, TrustSignals, TrustWeights, compute_trust_score,
    compute_trust_score_with,
};
