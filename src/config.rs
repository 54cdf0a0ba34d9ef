use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::warn;

use crate::api::http::{HttpSecurityConfig, host_of};
use crate::payment::{GatePolicy, PaymentRoutes, PaymentTerms, Price};
use crate::trust::TrustWeights;

/// Path prefix of the paid export resource
pub const EXPORT_PREFIX: &str = "/export/";
pub const EXPORT_DESCRIPTION: &str = "Full feedback export";

/// Configuration for the feedback gate service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub payment: PaymentConfig,
    pub trust: TrustConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Require HTTPS for all external communications
    pub require_https: bool,
    /// Rate limit per minute per IP
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Serve premium resources without payment. Development only.
    pub dev_bypass: bool,
    pub facilitator_url: String,
    pub facilitator_timeout_secs: u64,
    /// Recipient address - MUST be configured unless bypassing
    pub pay_to: String,
    pub token: String,
    pub currency: String,
    pub export_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Session submissions above this count are rate limited
    pub rate_limit_threshold: u32,
    /// How far back session submissions are counted
    pub session_window_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Enable PostgreSQL (if false, uses in-memory fallback)
    pub postgres_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    pub level: String,
    /// Mask addresses and client IPs in logs
    pub sanitize_logs: bool,
    /// Enable request/response logging
    pub log_requests: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: "postgresql://localhost:5432/feedback_gate".to_string(),
            postgres_enabled: false,
        }
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            rate_limit_threshold: 10,
            session_window_minutes: 60,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8787,
            },
            security: SecurityConfig {
                require_https: true,
                rate_limit_per_minute: 120,
                max_request_size: 64 * 1024,
            },
            payment: PaymentConfig {
                dev_bypass: false,
                facilitator_url: "https://x402.org/facilitator".to_string(),
                facilitator_timeout_secs: 5,
                pay_to: String::new(), // MUST be configured
                token: "eip155:84532/erc20:0x036CbD53842c5426634e7929541eC2318f3dCF7e"
                    .to_string(),
                currency: "USD".to_string(),
                export_price: Price::from_micros(10_000),
            },
            trust: TrustConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                sanitize_logs: true,
                log_requests: false, // Disabled by default for privacy
            },
        }
    }
}

impl GateConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Server configuration
        if let Ok(host) = env::var("FEEDBACK_GATE_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = env::var("FEEDBACK_GATE_PORT") {
            config.server.port = port.parse().context("Invalid FEEDBACK_GATE_PORT value")?;
        }

        // Security configuration
        if let Ok(require_https) = env::var("FEEDBACK_GATE_REQUIRE_HTTPS") {
            config.security.require_https = require_https
                .parse()
                .context("Invalid FEEDBACK_GATE_REQUIRE_HTTPS value")?;
        }

        if let Ok(rate_limit) = env::var("FEEDBACK_GATE_RATE_LIMIT_PER_MINUTE") {
            config.security.rate_limit_per_minute = rate_limit
                .parse()
                .context("Invalid FEEDBACK_GATE_RATE_LIMIT_PER_MINUTE value")?;
        }

        if let Ok(size) = env::var("FEEDBACK_GATE_MAX_REQUEST_SIZE") {
            config.security.max_request_size = size
                .parse()
                .context("Invalid FEEDBACK_GATE_MAX_REQUEST_SIZE value")?;
        }

        // Payment configuration
        if let Ok(bypass) = env::var("FEEDBACK_GATE_DEV_BYPASS") {
            config.payment.dev_bypass = bypass
                .parse()
                .context("Invalid FEEDBACK_GATE_DEV_BYPASS value")?;
        }

        if let Ok(url) = env::var("FEEDBACK_GATE_FACILITATOR_URL") {
            config.payment.facilitator_url = url;
        }

        if let Ok(timeout) = env::var("FEEDBACK_GATE_FACILITATOR_TIMEOUT_SECS") {
            config.payment.facilitator_timeout_secs = timeout
                .parse()
                .context("Invalid FEEDBACK_GATE_FACILITATOR_TIMEOUT_SECS value")?;
        }

        if let Ok(pay_to) = env::var("FEEDBACK_GATE_PAY_TO") {
            config.payment.pay_to = pay_to;
        }

        if let Ok(token) = env::var("FEEDBACK_GATE_PAYMENT_TOKEN") {
            config.payment.token = token;
        }

        if let Ok(currency) = env::var("FEEDBACK_GATE_PAYMENT_CURRENCY") {
            config.payment.currency = currency;
        }

        if let Ok(price) = env::var("FEEDBACK_GATE_EXPORT_PRICE") {
            config.payment.export_price = price
                .parse::<Price>()
                .map_err(|e| anyhow::anyhow!("{}", e))
                .context("Invalid FEEDBACK_GATE_EXPORT_PRICE value")?;
        }

        // Trust scoring
        if let Ok(threshold) = env::var("FEEDBACK_GATE_RATE_LIMIT_THRESHOLD") {
            config.trust.rate_limit_threshold = threshold
                .parse()
                .context("Invalid FEEDBACK_GATE_RATE_LIMIT_THRESHOLD value")?;
        }

        if let Ok(minutes) = env::var("FEEDBACK_GATE_SESSION_WINDOW_MINUTES") {
            config.trust.session_window_minutes = minutes
                .parse()
                .context("Invalid FEEDBACK_GATE_SESSION_WINDOW_MINUTES value")?;
        }

        // Database configuration
        if let Ok(url) = env::var("FEEDBACK_GATE_POSTGRES_URL") {
            config.database.postgres_url = url;
        }

        if let Ok(enabled) = env::var("FEEDBACK_GATE_POSTGRES_ENABLED") {
            config.database.postgres_enabled = enabled
                .parse()
                .context("Invalid FEEDBACK_GATE_POSTGRES_ENABLED value")?;
        }

        // Logging configuration
        if let Ok(log_level) = env::var("FEEDBACK_GATE_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Ok(sanitize_logs) = env::var("FEEDBACK_GATE_SANITIZE_LOGS") {
            config.logging.sanitize_logs = sanitize_logs
                .parse()
                .context("Invalid FEEDBACK_GATE_SANITIZE_LOGS value")?;
        }

        if let Ok(log_requests) = env::var("FEEDBACK_GATE_LOG_REQUESTS") {
            config.logging.log_requests = log_requests
                .parse()
                .context("Invalid FEEDBACK_GATE_LOG_REQUESTS value")?;
        }

        if config.payment.dev_bypass {
            warn!("FEEDBACK_GATE_DEV_BYPASS is set: premium resources are served without payment");
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for security and consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if self.security.max_request_size == 0 {
            return Err(anyhow::anyhow!("Maximum request size must be non-zero"));
        }

        let payment = &self.payment;

        if payment.facilitator_url.is_empty() {
            return Err(anyhow::anyhow!("Facilitator URL cannot be empty"));
        }

        if host_of(&payment.facilitator_url).is_none() {
            return Err(anyhow::anyhow!(
                "Facilitator URL is not a valid URL: {}",
                payment.facilitator_url
            ));
        }

        if self.security.require_https && !payment.facilitator_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "HTTPS is required but facilitator URL is not HTTPS: {}",
                payment.facilitator_url
            ));
        }

        if !(1..=30).contains(&payment.facilitator_timeout_secs) {
            return Err(anyhow::anyhow!(
                "Facilitator timeout must be between 1 and 30 seconds"
            ));
        }

        if payment.export_price.is_zero() {
            return Err(anyhow::anyhow!("Export price must be positive"));
        }

        // Gating is live: every requirement field must be fillable
        if !payment.dev_bypass {
            if payment.pay_to.trim().is_empty() {
                return Err(anyhow::anyhow!(
                    "FEEDBACK_GATE_PAY_TO is required unless FEEDBACK_GATE_DEV_BYPASS is set"
                ));
            }
            if payment.token.trim().is_empty() {
                return Err(anyhow::anyhow!("Payment token cannot be empty"));
            }
            if payment.currency.trim().is_empty() {
                return Err(anyhow::anyhow!("Payment currency cannot be empty"));
            }
        }

        // Requirement text travels in a response header
        for (name, value) in [
            ("pay_to", &payment.pay_to),
            ("token", &payment.token),
            ("currency", &payment.currency),
            ("facilitator_url", &payment.facilitator_url),
        ] {
            if !value.is_ascii() {
                return Err(anyhow::anyhow!("Payment {} must be ASCII", name));
            }
        }

        if self.trust.session_window_minutes == 0 {
            return Err(anyhow::anyhow!("Session window must be non-zero"));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Gate settings passed explicitly into the payment gate
    pub fn to_gate_policy(&self) -> GatePolicy {
        GatePolicy {
            dev_bypass: self.payment.dev_bypass,
            terms: PaymentTerms {
                currency: self.payment.currency.clone(),
                token: self.payment.token.clone(),
                recipient: self.payment.pay_to.clone(),
                facilitator: self.payment.facilitator_url.clone(),
            },
            facilitator_timeout: Duration::from_secs(self.payment.facilitator_timeout_secs),
        }
    }

    pub fn to_payment_routes(&self) -> PaymentRoutes {
        PaymentRoutes::new().premium(EXPORT_PREFIX, self.payment.export_price, EXPORT_DESCRIPTION)
    }

    pub fn to_trust_weights(&self) -> TrustWeights {
        TrustWeights {
            rate_limit_threshold: self.trust.rate_limit_threshold,
            ..TrustWeights::default()
        }
    }

    pub fn session_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.trust.session_window_minutes))
    }

    /// Outbound client policy: only the facilitator's host is reachable.
    ///
    /// The client timeout sits slightly above the gate timeout so the gate's
    /// own deadline is the one that fires.
    pub fn to_http_security_config(&self) -> HttpSecurityConfig {
        HttpSecurityConfig {
            require_https: self.security.require_https,
            timeout_ms: self.payment.facilitator_timeout_secs * 1000 + 500,
            allowed_domains: host_of(&self.payment.facilitator_url).into_iter().collect(),
            ..HttpSecurityConfig::default()
        }
    }
}

/// Sanitize sensitive data for logging
pub fn sanitize_for_logging(data: &str) -> String {
    let sensitive_patterns = [
        "auth",
        "key",
        "token",
        "password",
        "secret",
        "credential",
        "signature",
        "payment",
    ];

    let data_lower = data.to_lowercase();
    let looks_like_address = data.starts_with("0x") && data.len() > 12;

    if looks_like_address || sensitive_patterns.iter().any(|p| data_lower.contains(p)) {
        let chars: Vec<char> = data.chars().collect();
        let keep = if chars.len() > 20 { 6 } else { 2 };
        let keep = keep.min(chars.len() / 2);
        let head: String = chars[..keep].iter().collect();
        let tail: String = chars[chars.len() - keep..].iter().collect();
        return format!("{}***{}", head, tail);
    }

    data.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_config() -> GateConfig {
        let mut config = GateConfig::default();
        config.payment.pay_to = "0x1111111111111111111111111111111111111111".to_string();
        config
    }

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(sanitize_for_logging("api_key_secret"), "ap***et");
        assert_eq!(
            sanitize_for_logging("0x1111111111111111111111111111111111112222"),
            "0x1111***112222"
        );
        assert_eq!(sanitize_for_logging("normal_data"), "normal_data");
    }

    #[test]
    fn test_default_requires_recipient() {
        assert!(GateConfig::default().validate().is_err());
        assert!(live_config().validate().is_ok());
    }

    #[test]
    fn test_dev_bypass_without_recipient() {
        let mut config = GateConfig::default();
        config.payment.dev_bypass = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_https_enforced() {
        let mut config = live_config();
        config.payment.facilitator_url = "http://x402.org/facilitator".to_string();
        assert!(config.validate().is_err());

        config.security.require_https = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = live_config();
        config.payment.facilitator_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.payment.facilitator_timeout_secs = 31;
        assert!(config.validate().is_err());
        config.payment.facilitator_timeout_secs = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_ascii_recipient_rejected() {
        let mut config = live_config();
        config.payment.pay_to = "0x\u{e9}".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_price_rejected() {
        let mut config = live_config();
        config.payment.export_price = Price::from_micros(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_settings() {
        let config = live_config();

        let policy = config.to_gate_policy();
        assert!(!policy.dev_bypass);
        assert_eq!(policy.facilitator_timeout, Duration::from_secs(5));
        assert_eq!(policy.terms.recipient, config.payment.pay_to);

        let routes = config.to_payment_routes();
        assert!(routes.classify("/export/evt_1").is_premium());
        assert!(!routes.classify("/feedback/evt_1").is_premium());

        let http = config.to_http_security_config();
        assert_eq!(http.allowed_domains, vec!["x402.org".to_string()]);

        assert_eq!(config.to_trust_weights().rate_limit_threshold, 10);
        assert_eq!(config.session_window(), chrono::Duration::minutes(60));
    }
}
