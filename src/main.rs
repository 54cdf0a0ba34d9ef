use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;

use feedback_gate::{
    AppState, DatabasePool, FeedbackStore, GateConfig, HttpFacilitator, InMemoryFeedbackStore,
    SecureHttpClient, config::sanitize_for_logging, create_app,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first - this validates all security requirements
    let config = GateConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check FEEDBACK_GATE_* environment variables.");
        e
    })?;

    init_secure_logging(&config)?;

    info!("Starting feedback gate server");
    info!(
        "Security settings: HTTPS required: {}, Dev bypass: {}",
        config.security.require_https, config.payment.dev_bypass
    );

    let store = create_feedback_store(&config).await?;
    let facilitator = create_facilitator(&config)?;

    let recipient = if config.logging.sanitize_logs {
        sanitize_for_logging(&config.payment.pay_to)
    } else {
        config.payment.pay_to.clone()
    };
    info!(
        facilitator = %facilitator.base_url(),
        recipient = %recipient,
        export_price = %config.payment.export_price,
        "Payment gate configured"
    );
    if config.payment.dev_bypass {
        warn!("Development bypass active - premium routes are NOT gated");
    }

    let state = AppState::from_config(&config, store, facilitator);
    spawn_rate_limiter_cleanup(&state);
    let app = create_app(state);

    let bind_addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("Feedback gate listening on {}", bind_addr);
    info!(
        "Security middleware: Rate limit={}/min, Max body={}KB",
        config.security.rate_limit_per_minute,
        config.security.max_request_size / 1024
    );

    // Serve with connect info for client IP extraction
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Initialize secure logging with sanitization
fn init_secure_logging(config: &GateConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    if config.logging.sanitize_logs {
        info!("Secure logging initialized with data sanitization enabled");
    }

    Ok(())
}

/// PostgreSQL when enabled, otherwise an in-memory store
async fn create_feedback_store(config: &GateConfig) -> Result<Arc<dyn FeedbackStore>> {
    if !config.database.postgres_enabled {
        warn!("PostgreSQL disabled - feedback is kept in memory and lost on restart");
        return Ok(Arc::new(InMemoryFeedbackStore::new()));
    }

    let db = DatabasePool::new(&config.database.postgres_url)
        .await
        .context("Failed to connect to feedback database")?;
    db.init_schema()
        .await
        .context("Failed to initialize feedback schema")?;

    Ok(Arc::new(db.feedback().clone()))
}

/// Facilitator client restricted to the configured facilitator host
fn create_facilitator(config: &GateConfig) -> Result<Arc<HttpFacilitator>> {
    let client = SecureHttpClient::new(config.to_http_security_config())
        .context("Failed to create secure HTTP client")?;
    Ok(Arc::new(HttpFacilitator::new(
        &config.payment.facilitator_url,
        client,
    )))
}

/// Periodically drop stale rate-limit windows
fn spawn_rate_limiter_cleanup(state: &AppState) {
    let limiter = state.security.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(120));
        loop {
            interval.tick().await;
            limiter.cleanup();
        }
    });
}
