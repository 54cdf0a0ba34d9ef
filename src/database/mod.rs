//! Feedback storage
//!
//! `FeedbackStore` is the seam between the API and persistence. PostgreSQL
//! backs it in production; the in-memory store serves development and tests.

pub mod feedback;
pub mod pool;

pub use feedback::FeedbackRepository;
pub use pool::DatabasePool;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AppResult;
use crate::feedback::FeedbackRecord;

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Persist a scored record
    async fn insert(&self, record: &FeedbackRecord) -> AppResult<()>;

    /// Records for an event, oldest first
    async fn list_for_event(&self, event_id: &str) -> AppResult<Vec<FeedbackRecord>>;

    /// Submissions from a session at or after `since`
    async fn count_recent_for_session(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<i64>;
}

/// In-memory store keyed by event
#[derive(Default)]
pub struct InMemoryFeedbackStore {
    by_event: RwLock<HashMap<String, Vec<FeedbackRecord>>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn insert(&self, record: &FeedbackRecord) -> AppResult<()> {
        let mut by_event = self.by_event.write().await;
        by_event
            .entry(record.event_id.clone())
            .or_default()
            .push(record.clone());
        debug!(event_id = %record.event_id, id = %record.id, "Feedback stored in memory");
        Ok(())
    }

    async fn list_for_event(&self, event_id: &str) -> AppResult<Vec<FeedbackRecord>> {
        let by_event = self.by_event.read().await;
        Ok(by_event.get(event_id).cloned().unwrap_or_default())
    }

    async fn count_recent_for_session(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        let by_event = self.by_event.read().await;
        let count = by_event
            .values()
            .flatten()
            .filter(|r| r.session_id == session_id && r.submitted_at >= since)
            .count();
        Ok(count as i64)
    }
}
