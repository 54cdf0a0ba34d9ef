//! Feedback API Endpoints
//!
//! Submission, listing and per-event summaries. All routes are free.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::FeedbackStore;
use crate::error::AppResult;
use crate::feedback::{FeedbackRecord, FeedbackSubmission, FeedbackSummary, validate_id};
use crate::trust::{RiskLevel, TrustScore, TrustSignals, TrustWeights, compute_trust_score_with};

/// API state for feedback endpoints
#[derive(Clone)]
pub struct FeedbackApiState {
    pub store: Arc<dyn FeedbackStore>,
    pub weights: Arc<TrustWeights>,
    /// How far back a session's submissions are counted
    pub session_window: chrono::Duration,
}

impl FeedbackApiState {
    pub fn new(
        store: Arc<dyn FeedbackStore>,
        weights: TrustWeights,
        session_window: chrono::Duration,
    ) -> Self {
        Self {
            store,
            weights: Arc::new(weights),
            session_window,
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitFeedbackResponse {
    pub id: Uuid,
    pub event_id: String,
    pub trust: TrustScore,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListFeedbackQuery {
    pub risk_level: Option<RiskLevel>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackListResponse {
    pub event_id: String,
    pub total: usize,
    pub feedback: Vec<FeedbackRecord>,
}

// ============================================================================
// Endpoints
// ============================================================================

/// POST /feedback - Score and store a submission
pub async fn submit_feedback(
    State(state): State<FeedbackApiState>,
    payload: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SubmitFeedbackResponse>)> {
    // Undecodable bodies are validation failures, not axum's 415/422
    let Json(submission) = payload?;
    submission.validate()?;

    // The session count includes this submission
    let since = Utc::now() - state.session_window;
    let recent = state
        .store
        .count_recent_for_session(&submission.session_id, since)
        .await?;

    let signals = TrustSignals::from_raw(
        submission.self_verified,
        submission.wallet_connected(),
        recent.saturating_add(1),
    );
    let trust = compute_trust_score_with(&signals, &state.weights);

    if trust.flags.is_rate_limited {
        warn!(
            event_id = %submission.event_id,
            session_feedback_count = trust.flags.session_feedback_count,
            "Session over submission threshold, storing as risk"
        );
    }

    let record = FeedbackRecord::new(submission, trust);
    state.store.insert(&record).await?;

    info!(
        id = %record.id,
        event_id = %record.event_id,
        score = record.trust.score,
        risk_level = record.trust.risk_level.as_str(),
        "Feedback recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitFeedbackResponse {
            id: record.id,
            event_id: record.event_id,
            trust: record.trust,
            submitted_at: record.submitted_at,
        }),
    ))
}

/// GET /feedback/{event_id} - List an event's feedback
pub async fn list_feedback(
    State(state): State<FeedbackApiState>,
    Path(event_id): Path<String>,
    query: Result<Query<ListFeedbackQuery>, QueryRejection>,
) -> AppResult<Json<FeedbackListResponse>> {
    validate_id("event_id", &event_id)?;
    let Query(query) = query?;

    let mut feedback = state.store.list_for_event(&event_id).await?;
    if let Some(level) = query.risk_level {
        feedback.retain(|r| r.trust.risk_level == level);
    }

    Ok(Json(FeedbackListResponse {
        event_id,
        total: feedback.len(),
        feedback,
    }))
}

/// GET /feedback/{event_id}/summary - Aggregate ratings by trust tier
pub async fn get_summary(
    State(state): State<FeedbackApiState>,
    Path(event_id): Path<String>,
) -> AppResult<Json<FeedbackSummary>> {
    validate_id("event_id", &event_id)?;

    let records = state.store.list_for_event(&event_id).await?;
    Ok(Json(FeedbackSummary::from_records(&event_id, &records)))
}

/// Create the feedback API router
pub fn create_router(state: FeedbackApiState) -> Router {
    Router::new()
        .route("/", post(submit_feedback))
        .route("/{event_id}", get(list_feedback))
        .route("/{event_id}/summary", get(get_summary))
        .with_state(state)
}
