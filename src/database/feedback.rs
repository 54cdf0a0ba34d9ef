//! Feedback Repository - PostgreSQL operations for feedback using sqlx

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use super::FeedbackStore;
use crate::error::{AppError, AppResult};
use crate::feedback::FeedbackRecord;
use crate::trust::{RiskLevel, TrustFlags, TrustScore};

#[derive(Clone)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feedback.submissions (
                id UUID PRIMARY KEY,
                event_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
                comment TEXT,
                wallet_address TEXT,
                trust_score SMALLINT NOT NULL CHECK (trust_score BETWEEN 0 AND 100),
                risk_level TEXT NOT NULL,
                has_self_verification BOOLEAN NOT NULL,
                has_wallet BOOLEAN NOT NULL,
                is_rate_limited BOOLEAN NOT NULL,
                session_feedback_count INTEGER NOT NULL,
                submitted_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to create submissions table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS submissions_event_idx \
             ON feedback.submissions (event_id, submitted_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to create event index: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS submissions_session_idx \
             ON feedback.submissions (session_id, submitted_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to create session index: {}", e)))?;

        Ok(())
    }

    fn row_to_record(row: &PgRow) -> AppResult<FeedbackRecord> {
        let risk_level: String = row.get("risk_level");
        let risk_level = RiskLevel::parse(&risk_level)
            .ok_or_else(|| AppError::Storage(format!("Unknown risk level: {}", risk_level)))?;

        let rating: i16 = row.get("rating");
        let score: i16 = row.get("trust_score");
        let session_feedback_count: i32 = row.get("session_feedback_count");

        Ok(FeedbackRecord {
            id: row.get::<Uuid, _>("id"),
            event_id: row.get("event_id"),
            session_id: row.get("session_id"),
            rating: rating.clamp(0, i16::from(u8::MAX)) as u8,
            comment: row.get("comment"),
            wallet_address: row.get("wallet_address"),
            trust: TrustScore {
                score: score.clamp(0, 100) as u8,
                risk_level,
                flags: TrustFlags {
                    has_self_verification: row.get("has_self_verification"),
                    has_wallet: row.get("has_wallet"),
                    is_rate_limited: row.get("is_rate_limited"),
                    session_feedback_count: session_feedback_count.max(0) as u32,
                },
            },
            submitted_at: row.get::<DateTime<Utc>, _>("submitted_at"),
        })
    }
}

#[async_trait]
impl FeedbackStore for FeedbackRepository {
    async fn insert(&self, record: &FeedbackRecord) -> AppResult<()> {
        let session_feedback_count =
            i32::try_from(record.trust.flags.session_feedback_count).unwrap_or(i32::MAX);

        sqlx::query(
            r#"
            INSERT INTO feedback.submissions
            (id, event_id, session_id, rating, comment, wallet_address,
             trust_score, risk_level, has_self_verification, has_wallet,
             is_rate_limited, session_feedback_count, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id)
        .bind(&record.event_id)
        .bind(&record.session_id)
        .bind(i16::from(record.rating))
        .bind(&record.comment)
        .bind(&record.wallet_address)
        .bind(i16::from(record.trust.score))
        .bind(record.trust.risk_level.as_str())
        .bind(record.trust.flags.has_self_verification)
        .bind(record.trust.flags.has_wallet)
        .bind(record.trust.flags.is_rate_limited)
        .bind(session_feedback_count)
        .bind(record.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to insert feedback: {}", e)))?;

        debug!(id = %record.id, event_id = %record.event_id, "Feedback inserted");
        Ok(())
    }

    async fn list_for_event(&self, event_id: &str) -> AppResult<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, session_id, rating, comment, wallet_address,
                   trust_score, risk_level, has_self_verification, has_wallet,
                   is_rate_limited, session_feedback_count, submitted_at
            FROM feedback.submissions
            WHERE event_id = $1
            ORDER BY submitted_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to list feedback: {}", e)))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn count_recent_for_session(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count
            FROM feedback.submissions
            WHERE session_id = $1 AND submitted_at >= $2
            "#,
        )
        .bind(session_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to count session feedback: {}", e)))?;

        Ok(row.get::<i64, _>("count"))
    }
}
