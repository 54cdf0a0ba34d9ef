//! Export API Endpoint
//!
//! `GET /export/{event_id}` is a premium resource: the payment gate
//! middleware runs first and attaches the granted `Access` to every request
//! it lets through.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::database::FeedbackStore;
use crate::error::AppResult;
use crate::feedback::{FeedbackRecord, FeedbackSummary, validate_id};
use crate::payment::Access;

#[derive(Clone)]
pub struct ExportApiState {
    pub store: Arc<dyn FeedbackStore>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub event_id: String,
    pub generated_at: DateTime<Utc>,
    /// `paid` or `dev_bypass`
    pub access: String,
    pub summary: FeedbackSummary,
    pub records: Vec<FeedbackRecord>,
}

fn access_label(access: &Access) -> &'static str {
    match access {
        Access::Paid { .. } => "paid",
        Access::DevBypass => "dev_bypass",
        Access::Free => "free",
    }
}

/// GET /export/{event_id} - Full feedback export
pub async fn export_event(
    State(state): State<ExportApiState>,
    Path(event_id): Path<String>,
    Extension(access): Extension<Access>,
) -> AppResult<Json<ExportResponse>> {
    validate_id("event_id", &event_id)?;

    let records = state.store.list_for_event(&event_id).await?;
    let summary = FeedbackSummary::from_records(&event_id, &records);

    let payer = match &access {
        Access::Paid { payer: Some(payer) } => payer.as_str(),
        _ => "-",
    };
    info!(
        event_id = %event_id,
        records = records.len(),
        payer = %crate::config::sanitize_for_logging(payer),
        "Export served"
    );

    Ok(Json(ExportResponse {
        event_id,
        generated_at: Utc::now(),
        access: access_label(&access).to_string(),
        summary,
        records,
    }))
}

/// Create the export API router
pub fn create_router(state: ExportApiState) -> Router {
    Router::new()
        .route("/{event_id}", get(export_event))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_label() {
        assert_eq!(
            access_label(&Access::Paid {
                payer: Some("0xabc".to_string())
            }),
            "paid"
        );
        assert_eq!(access_label(&Access::DevBypass), "dev_bypass");
        assert_eq!(access_label(&Access::Free), "free");
    }
}
