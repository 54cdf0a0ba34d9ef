//! HTTP middleware for the feedback gate
//!
//! Provides:
//! - Payment gating of premium routes (HTTP 402)
//! - Rate limiting per IP
//! - Request size limits
//! - Security headers
//! - Request logging with sanitization

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::payment::{
    Facilitator, GateDecision, GatePolicy, GateRequest, PAYMENT_EVIDENCE_HEADERS, PaymentRoutes,
    gate, payment_required_response, service_unavailable_response,
};

/// Security configuration for middleware
#[derive(Debug, Clone)]
pub struct SecurityMiddlewareConfig {
    /// Rate limit: requests per minute per IP
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
    /// Enable request logging
    pub log_requests: bool,
    /// Mask client IPs in logs
    pub sanitize_logs: bool,
}

impl Default for SecurityMiddlewareConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 120,
            max_request_size: 64 * 1024,
            log_requests: false,
            sanitize_logs: true,
        }
    }
}

/// Rate limiter state - tracks requests per IP
#[derive(Debug)]
pub struct RateLimiter {
    /// Map of IP -> (request count, window start)
    requests: DashMap<String, (u32, Instant)>,
    /// Requests allowed per window
    limit: u32,
    /// Window duration
    window: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests: DashMap::new(),
            limit: requests_per_minute,
            window: Duration::from_secs(60),
        }
    }

    /// Check if request is allowed and update counter
    /// Returns (allowed, remaining, reset_after_secs)
    pub fn check_request(&self, ip: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(ip.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) >= self.window {
            *count = 0;
            *window_start = now;
        }

        let remaining = self.limit.saturating_sub(*count);
        let reset_after = self
            .window
            .checked_sub(now.duration_since(*window_start))
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if *count >= self.limit {
            return (false, 0, reset_after);
        }

        *count += 1;
        (true, remaining.saturating_sub(1), reset_after)
    }

    /// Drop stale windows (call periodically)
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.requests
            .retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}

/// Shared state for security middleware
#[derive(Clone)]
pub struct SecurityState {
    pub config: SecurityMiddlewareConfig,
    pub rate_limiter: Arc<RateLimiter>,
}

impl SecurityState {
    pub fn new(config: SecurityMiddlewareConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
        Self {
            config,
            rate_limiter,
        }
    }
}

/// Shared state for the payment gate
#[derive(Clone)]
pub struct PaymentGateState {
    pub policy: Arc<GatePolicy>,
    pub routes: Arc<PaymentRoutes>,
    pub facilitator: Arc<dyn Facilitator>,
}

/// Extract client IP from request, handling proxies
fn get_client_ip(headers: &HeaderMap, addr: Option<&SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.split(',').next()
    {
        return ip.trim().to_string();
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(ip) = real_ip.to_str()
    {
        return ip.trim().to_string();
    }

    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Socket address, when the server was started with connect info
fn peer_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Mask a value for logging
pub fn sanitize_for_log(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// First non-blank payment evidence header
fn payment_evidence(headers: &HeaderMap) -> Option<&str> {
    PAYMENT_EVIDENCE_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}

/// Payment gate middleware
///
/// Premium routes reach the handler only on `Allowed`; the `Access` is
/// attached to the request extensions for the handler to read.
pub async fn payment_gate_middleware(
    State(state): State<PaymentGateState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().as_str().to_string();
    let payment = payment_evidence(request.headers()).map(str::to_string);
    let resource = state.routes.classify(&path);

    let decision = gate(
        GateRequest {
            path: &path,
            method: &method,
            payment: payment.as_deref(),
        },
        &resource,
        &state.policy,
        state.facilitator.as_ref(),
    )
    .await;

    match decision {
        GateDecision::Allowed(access) => {
            request.extensions_mut().insert(access);
            next.run(request).await
        }
        GateDecision::PaymentRequired(requirement) => payment_required_response(&requirement),
        GateDecision::ServiceUnavailable { reason } => {
            warn!(path = %path, reason = %reason, "Premium request refused, facilitator unavailable");
            service_unavailable_response()
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = get_client_ip(request.headers(), peer_addr(&request).as_ref());
    let (allowed, remaining, reset_after) = state.rate_limiter.check_request(&client_ip);

    if !allowed {
        let log_ip = if state.config.sanitize_logs {
            sanitize_for_log(&client_ip)
        } else {
            client_ip
        };
        warn!(
            client_ip = %log_ip,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );

        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        let headers = response.headers_mut();
        headers.insert(
            "X-RateLimit-Limit",
            HeaderValue::from(state.config.rate_limit_per_minute),
        );
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
        headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_after));
        headers.insert("Retry-After", HeaderValue::from(reset_after));

        return response;
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from(state.config.rate_limit_per_minute),
    );
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_after));

    response
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));

    // Paid content must never be served from a shared cache
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );

    headers.remove("Server");

    response
}

/// Request logging middleware with sanitization
pub async fn logging_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.log_requests {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = get_client_ip(request.headers(), peer_addr(&request).as_ref());

    let log_ip = if state.config.sanitize_logs {
        sanitize_for_log(&client_ip)
    } else {
        client_ip
    };

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            client_ip = %log_ip,
            "Request failed"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            client_ip = %log_ip,
            "Client error"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            client_ip = %log_ip,
            "Request completed"
        );
    }

    response
}

/// Request body size validation middleware
pub async fn body_size_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let declared = request
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared
        && length > state.config.max_request_size
    {
        warn!(
            length,
            max = state.config.max_request_size,
            "Request body too large"
        );
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter() {
        let limiter = RateLimiter::new(3);

        assert!(limiter.check_request("127.0.0.1").0);
        assert!(limiter.check_request("127.0.0.1").0);
        assert!(limiter.check_request("127.0.0.1").0);

        let (allowed, remaining, _) = limiter.check_request("127.0.0.1");
        assert!(!allowed);
        assert_eq!(remaining, 0);

        assert!(limiter.check_request("192.168.1.1").0);
        assert_eq!(limiter.tracked_clients(), 2);

        // Fresh windows survive cleanup
        limiter.cleanup();
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_sanitize_for_log() {
        assert_eq!(sanitize_for_log("short"), "*****");
        assert_eq!(sanitize_for_log("abcdefghij"), "abcd...ghij");
        let result = sanitize_for_log("192.168.1.100");
        assert!(result.starts_with("192."));
        assert!(result.ends_with(".100"));
        assert!(result.contains("..."));
    }

    #[test]
    fn test_client_ip_resolution() {
        let mut headers = HeaderMap::new();
        let addr: SocketAddr = "10.0.0.9:4000".parse().unwrap();
        assert_eq!(get_client_ip(&headers, Some(&addr)), "10.0.0.9");
        assert_eq!(get_client_ip(&headers, None), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("172.16.0.2"));
        assert_eq!(get_client_ip(&headers, Some(&addr)), "172.16.0.2");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(get_client_ip(&headers, Some(&addr)), "203.0.113.7");
    }

    #[test]
    fn test_payment_evidence_lookup() {
        let mut headers = HeaderMap::new();
        assert_eq!(payment_evidence(&headers), None);

        headers.insert("payment-signature", HeaderValue::from_static("sig"));
        assert_eq!(payment_evidence(&headers), Some("sig"));

        headers.insert("x-payment", HeaderValue::from_static("  "));
        assert_eq!(payment_evidence(&headers), Some("sig"));

        headers.insert("x-payment", HeaderValue::from_static("xpay"));
        assert_eq!(payment_evidence(&headers), Some("xpay"));
    }
}
