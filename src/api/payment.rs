//! Payment API Endpoints
//!
//! Read-only views of the facilitator and the premium price list.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::config::{EXPORT_DESCRIPTION, EXPORT_PREFIX};
use crate::error::AppResult;
use crate::payment::{Facilitator, GatePolicy, Price, SupportedKinds};

#[derive(Clone)]
pub struct PaymentApiState {
    pub facilitator: Arc<dyn Facilitator>,
    pub policy: Arc<GatePolicy>,
    pub export_price: Price,
}

#[derive(Debug, Serialize)]
pub struct PricedResource {
    pub path_prefix: &'static str,
    pub description: &'static str,
    pub price: Price,
}

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub currency: String,
    pub token: String,
    pub recipient: String,
    pub facilitator: String,
    pub dev_bypass: bool,
    pub resources: Vec<PricedResource>,
}

/// GET /payment/health - Facilitator liveness
pub async fn facilitator_health(
    State(state): State<PaymentApiState>,
) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(state.facilitator.health().await?))
}

/// GET /payment/supported - Schemes and networks the facilitator accepts
pub async fn facilitator_supported(
    State(state): State<PaymentApiState>,
) -> AppResult<Json<SupportedKinds>> {
    Ok(Json(state.facilitator.supported().await?))
}

/// GET /payment/pricing - Premium resources and their prices
pub async fn pricing(State(state): State<PaymentApiState>) -> Json<PricingResponse> {
    let terms = &state.policy.terms;
    Json(PricingResponse {
        currency: terms.currency.clone(),
        token: terms.token.clone(),
        recipient: terms.recipient.clone(),
        facilitator: terms.facilitator.clone(),
        dev_bypass: state.policy.dev_bypass,
        resources: vec![PricedResource {
            path_prefix: EXPORT_PREFIX,
            description: EXPORT_DESCRIPTION,
            price: state.export_price,
        }],
    })
}

/// Create the payment API router
pub fn create_router(state: PaymentApiState) -> Router {
    Router::new()
        .route("/health", get(facilitator_health))
        .route("/supported", get(facilitator_supported))
        .route("/pricing", get(pricing))
        .with_state(state)
}
