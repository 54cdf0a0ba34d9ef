//! HTTP API for the feedback gate
//!
//! Provides:
//! - Feedback API (submit, list, summary)
//! - Export API (premium, behind the payment gate)
//! - Payment API (facilitator health, supported kinds, pricing)
//! - Secure HTTP client for facilitator calls
//! - Middleware (payment gate, rate limiting, size limits, headers)

pub mod export;
pub mod feedback;
pub mod http;
pub mod middleware;
pub mod payment;

use axum::{Router, http::Uri, middleware as axum_middleware, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::GateConfig;
use crate::database::FeedbackStore;
use crate::error::AppError;
use crate::payment::Facilitator;

pub use export::{ExportApiState, create_router as create_export_router};
pub use feedback::{FeedbackApiState, create_router as create_feedback_router};
pub use http::{HttpError, HttpSecurityConfig, SecureHttpClient};
pub use middleware::{
    PaymentGateState, RateLimiter, SecurityMiddlewareConfig, SecurityState, body_size_middleware,
    logging_middleware, payment_gate_middleware, rate_limit_middleware,
    security_headers_middleware,
};
pub use payment::{PaymentApiState, create_router as create_payment_router};

/// Everything the router needs
#[derive(Clone)]
pub struct AppState {
    pub feedback: FeedbackApiState,
    pub export: ExportApiState,
    pub payment: PaymentApiState,
    pub gate: PaymentGateState,
    pub security: SecurityState,
}

impl AppState {
    /// Wire every API state from configuration and the two collaborators
    pub fn from_config(
        config: &GateConfig,
        store: Arc<dyn FeedbackStore>,
        facilitator: Arc<dyn Facilitator>,
    ) -> Self {
        let policy = Arc::new(config.to_gate_policy());

        let security = SecurityState::new(SecurityMiddlewareConfig {
            rate_limit_per_minute: config.security.rate_limit_per_minute,
            max_request_size: config.security.max_request_size,
            log_requests: config.logging.log_requests,
            sanitize_logs: config.logging.sanitize_logs,
        });

        Self {
            feedback: FeedbackApiState::new(
                store.clone(),
                config.to_trust_weights(),
                config.session_window(),
            ),
            export: ExportApiState { store },
            payment: PaymentApiState {
                facilitator: facilitator.clone(),
                policy: policy.clone(),
                export_price: config.payment.export_price,
            },
            gate: PaymentGateState {
                policy,
                routes: Arc::new(config.to_payment_routes()),
                facilitator,
            },
            security,
        }
    }
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

/// Build the application with routes and middleware
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/feedback", create_feedback_router(state.feedback))
        .nest("/export", create_export_router(state.export))
        .nest("/payment", create_payment_router(state.payment))
        .route("/health", get(|| async { "OK" }))
        .fallback(not_found)
        // Innermost first: the gate only sees requests that passed the limits
        .layer(axum_middleware::from_fn_with_state(
            state.gate,
            payment_gate_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.security.clone(),
            body_size_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.security.clone(),
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.security,
            logging_middleware,
        ))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
}
