//! Feedback submissions and records
//!
//! A submission is validated, scored, and stored once. The stored record,
//! trust score included, never changes afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::trust::{RiskLevel, TrustScore};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const MAX_COMMENT_CHARS: usize = 2000;
pub const MAX_ID_CHARS: usize = 128;

/// Incoming feedback from the client
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSubmission {
    pub event_id: String,
    pub session_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    /// Set when the client completed self verification
    #[serde(default)]
    pub self_verified: bool,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

impl FeedbackSubmission {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_id("event_id", &self.event_id)?;
        validate_id("session_id", &self.session_id)?;

        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(AppError::Validation(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        if let Some(comment) = &self.comment
            && comment.chars().count() > MAX_COMMENT_CHARS
        {
            return Err(AppError::Validation(format!(
                "comment exceeds {} characters",
                MAX_COMMENT_CHARS
            )));
        }

        if let Some(wallet) = &self.wallet_address
            && !is_wallet_address(wallet)
        {
            return Err(AppError::Validation("malformed wallet address".to_string()));
        }

        Ok(())
    }

    pub fn wallet_connected(&self) -> bool {
        self.wallet_address.is_some()
    }
}

/// Identifiers: non-empty, bounded, URL-safe
pub fn validate_id(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() || value.len() > MAX_ID_CHARS {
        return Err(AppError::Validation(format!(
            "{} must be 1-{} characters",
            field, MAX_ID_CHARS
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(format!(
            "{} may contain only letters, digits, '-' and '_'",
            field
        )));
    }
    Ok(())
}

/// EVM-style `0x` + 40 hex digits
fn is_wallet_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Stored feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub event_id: String,
    pub session_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub wallet_address: Option<String>,
    pub trust: TrustScore,
    pub submitted_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(submission: FeedbackSubmission, trust: TrustScore) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id: submission.event_id,
            session_id: submission.session_id,
            rating: submission.rating,
            comment: submission.comment,
            wallet_address: submission.wallet_address,
            trust,
            submitted_at: Utc::now(),
        }
    }
}

/// Aggregate view of an event's feedback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackSummary {
    pub event_id: String,
    pub total: usize,
    pub average_rating: Option<f64>,
    /// Average over non-`risk` submissions only
    pub trusted_average_rating: Option<f64>,
    pub by_risk_level: HashMap<RiskLevel, usize>,
}

impl FeedbackSummary {
    pub fn from_records(event_id: &str, records: &[FeedbackRecord]) -> Self {
        let mut by_risk_level = HashMap::new();
        for record in records {
            *by_risk_level.entry(record.trust.risk_level).or_insert(0) += 1;
        }

        let average = |ratings: Vec<u8>| -> Option<f64> {
            if ratings.is_empty() {
                None
            } else {
                let sum: u32 = ratings.iter().map(|r| u32::from(*r)).sum();
                Some(f64::from(sum) / ratings.len() as f64)
            }
        };

        let all: Vec<u8> = records.iter().map(|r| r.rating).collect();
        let credible: Vec<u8> = records
            .iter()
            .filter(|r| r.trust.risk_level != RiskLevel::Risk)
            .map(|r| r.rating)
            .collect();

        Self {
            event_id: event_id.to_string(),
            total: records.len(),
            average_rating: average(all),
            trusted_average_rating: average(credible),
            by_risk_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::{TrustSignals, compute_trust_score};

    fn submission() -> FeedbackSubmission {
        FeedbackSubmission {
            event_id: "evt_2024-summit".to_string(),
            session_id: "sess_abc".to_string(),
            rating: 4,
            comment: Some("Great talks".to_string()),
            self_verified: false,
            wallet_address: None,
        }
    }

    #[test]
    fn test_valid_submission() {
        assert!(submission().validate().is_ok());
    }

    #[test]
    fn test_rating_bounds() {
        let mut s = submission();
        s.rating = 0;
        assert!(matches!(s.validate(), Err(AppError::Validation(_))));
        s.rating = 6;
        assert!(s.validate().is_err());
        s.rating = 5;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_ids_validated() {
        let mut s = submission();
        s.event_id = String::new();
        assert!(s.validate().is_err());

        let mut s = submission();
        s.session_id = "../etc".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_comment_length() {
        let mut s = submission();
        s.comment = Some("x".repeat(MAX_COMMENT_CHARS + 1));
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_wallet_address_format() {
        let mut s = submission();
        s.wallet_address = Some("0x52908400098527886E0F7030069857D2E4169EE7".to_string());
        assert!(s.validate().is_ok());
        assert!(s.wallet_connected());

        s.wallet_address = Some("0x123".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_summary() {
        let trusted = compute_trust_score(&TrustSignals {
            self_verified: true,
            wallet_connected: true,
            session_submission_count: 0,
        });
        let spam = compute_trust_score(&TrustSignals {
            self_verified: false,
            wallet_connected: false,
            session_submission_count: 20,
        });

        let mut good = FeedbackRecord::new(submission(), trusted);
        good.rating = 5;
        let mut bad = FeedbackRecord::new(submission(), spam);
        bad.rating = 1;

        let summary = FeedbackSummary::from_records("evt_2024-summit", &[good, bad]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.average_rating, Some(3.0));
        assert_eq!(summary.trusted_average_rating, Some(5.0));
        assert_eq!(summary.by_risk_level.get(&RiskLevel::Risk), Some(&1));
        assert_eq!(summary.by_risk_level.get(&RiskLevel::Trusted), Some(&1));
    }

    #[test]
    fn test_empty_summary() {
        let summary = FeedbackSummary::from_records("evt_empty", &[]);
        assert_eq!(summary.total, 0);
        assert!(summary.average_rating.is_none());
    }
}
