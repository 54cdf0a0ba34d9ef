//! Trust Score Types and Computation
//!
//! Pure, deterministic and total: every input produces a score.

use serde::{Deserialize, Serialize};

/// Signals collected for one submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSignals {
    pub self_verified: bool,
    pub wallet_connected: bool,
    /// Prior submissions from the same session inside the scoring window
    pub session_submission_count: u32,
}

impl TrustSignals {
    /// Build signals from a signed count, clamping negatives to zero
    pub fn from_raw(self_verified: bool, wallet_connected: bool, session_count: i64) -> Self {
        Self {
            self_verified,
            wallet_connected,
            session_submission_count: session_count.clamp(0, i64::from(u32::MAX)) as u32,
        }
    }
}

/// Categorical risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Trusted,
    Unverified,
    Risk,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Trusted => "trusted",
            RiskLevel::Unverified => "unverified",
            RiskLevel::Risk => "risk",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trusted" => Some(RiskLevel::Trusted),
            "unverified" => Some(RiskLevel::Unverified),
            "risk" => Some(RiskLevel::Risk),
            _ => None,
        }
    }
}

/// Flags persisted next to the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustFlags {
    pub has_self_verification: bool,
    pub has_wallet: bool,
    pub is_rate_limited: bool,
    pub session_feedback_count: u32,
}

/// Computed trust score (immutable once stored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustScore {
    /// 0..=100
    pub score: u8,
    pub risk_level: RiskLevel,
    pub flags: TrustFlags,
}

/// Score weights and tier thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustWeights {
    pub self_verification_bonus: i32,
    pub wallet_bonus: i32,
    pub good_behavior_bonus: i32,
    pub rate_limit_penalty: i32,
    /// Session counts strictly above this are rate limited
    pub rate_limit_threshold: u32,
    /// Minimum score for `trusted` (also requires self verification)
    pub trusted_threshold: i32,
    /// Scores strictly below this are `risk`
    pub risk_threshold: i32,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            self_verification_bonus: 30,
            wallet_bonus: 20,
            good_behavior_bonus: 50,
            rate_limit_penalty: 50,
            rate_limit_threshold: 10,
            trusted_threshold: 70,
            risk_threshold: 30,
        }
    }
}

/// Compute a trust score with the default weights
pub fn compute_trust_score(signals: &TrustSignals) -> TrustScore {
    compute_trust_score_with(signals, &TrustWeights::default())
}

/// Compute a trust score with explicit weights
pub fn compute_trust_score_with(signals: &TrustSignals, weights: &TrustWeights) -> TrustScore {
    let is_rate_limited = signals.session_submission_count > weights.rate_limit_threshold;

    let mut raw: i32 = 0;
    if signals.self_verified {
        raw += weights.self_verification_bonus;
    }
    if signals.wallet_connected {
        raw += weights.wallet_bonus;
    }
    if is_rate_limited {
        raw -= weights.rate_limit_penalty;
    } else {
        raw += weights.good_behavior_bonus;
    }

    let score = raw.clamp(0, 100);

    let risk_level = if score >= weights.trusted_threshold && signals.self_verified && !is_rate_limited
    {
        RiskLevel::Trusted
    } else if score < weights.risk_threshold || is_rate_limited {
        RiskLevel::Risk
    } else {
        RiskLevel::Unverified
    };

    TrustScore {
        score: score as u8,
        risk_level,
        flags: TrustFlags {
            has_self_verification: signals.self_verified,
            has_wallet: signals.wallet_connected,
            is_rate_limited,
            session_feedback_count: signals.session_submission_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(self_verified: bool, wallet_connected: bool, count: u32) -> TrustSignals {
        TrustSignals {
            self_verified,
            wallet_connected,
            session_submission_count: count,
        }
    }

    #[test]
    fn test_max_score_is_trusted() {
        let result = compute_trust_score(&signals(true, true, 0));
        assert_eq!(result.score, 100);
        assert_eq!(result.risk_level, RiskLevel::Trusted);
        assert!(!result.flags.is_rate_limited);
    }

    #[test]
    fn test_anonymous_good_behavior_is_unverified() {
        let result = compute_trust_score(&signals(false, false, 10));
        assert_eq!(result.score, 50);
        assert_eq!(result.risk_level, RiskLevel::Unverified);
    }

    #[test]
    fn test_anonymous_rate_limited_clamps_to_zero() {
        let result = compute_trust_score(&signals(false, false, 11));
        assert_eq!(result.score, 0);
        assert_eq!(result.risk_level, RiskLevel::Risk);
        assert!(result.flags.is_rate_limited);
    }

    #[test]
    fn test_verification_does_not_rescue_rate_limited() {
        let result = compute_trust_score(&signals(true, false, 11));
        assert_eq!(result.score, 0);
        assert_eq!(result.risk_level, RiskLevel::Risk);

        let result = compute_trust_score(&signals(true, true, 50));
        assert_eq!(result.risk_level, RiskLevel::Risk);
    }

    #[test]
    fn test_wallet_without_verification_is_not_trusted() {
        let result = compute_trust_score(&signals(false, true, 0));
        assert_eq!(result.score, 70);
        assert_eq!(result.risk_level, RiskLevel::Unverified);
    }

    #[test]
    fn test_verified_without_wallet_is_trusted() {
        let result = compute_trust_score(&signals(true, false, 3));
        assert_eq!(result.score, 80);
        assert_eq!(result.risk_level, RiskLevel::Trusted);
    }

    #[test]
    fn test_score_always_in_range() {
        for self_verified in [false, true] {
            for wallet in [false, true] {
                for count in [0, 1, 10, 11, 1000, u32::MAX] {
                    let result = compute_trust_score(&signals(self_verified, wallet, count));
                    assert!(result.score <= 100);
                }
            }
        }
    }

    #[test]
    fn test_negative_raw_count_clamped() {
        let s = TrustSignals::from_raw(false, false, -5);
        assert_eq!(s.session_submission_count, 0);
        assert_eq!(compute_trust_score(&s).score, 50);
    }

    #[test]
    fn test_custom_weights_clamp_high() {
        let weights = TrustWeights {
            good_behavior_bonus: 90,
            ..TrustWeights::default()
        };
        let result = compute_trust_score_with(&signals(true, true, 0), &weights);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_risk_level_serialization() {
        assert_eq!(serde_json::to_string(&RiskLevel::Trusted).unwrap(), "\"trusted\"");
        assert_eq!(RiskLevel::parse("risk"), Some(RiskLevel::Risk));
        assert_eq!(RiskLevel::parse("unknown"), None);
    }
}
