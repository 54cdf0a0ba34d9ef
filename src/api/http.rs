//! Secure outbound HTTP client
//!
//! Used for every call to the payment facilitator. Enforces HTTPS, a domain
//! allow-list, a hard timeout and a response size cap, and classifies
//! failures so callers can tell "unreachable" from "refused".

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Security requirements for outbound communications
#[derive(Debug, Clone)]
pub struct HttpSecurityConfig {
    /// Require HTTPS for all external communications
    pub require_https: bool,
    /// Request timeout in milliseconds (connect + body)
    pub timeout_ms: u64,
    /// Maximum response size in bytes
    pub max_response_size: usize,
    /// Allowed hosts (exact or subdomain match)
    pub allowed_domains: Vec<String>,
}

impl Default for HttpSecurityConfig {
    fn default() -> Self {
        Self {
            require_https: true,
            timeout_ms: 5_000,
            max_response_size: 256 * 1024,
            allowed_domains: vec!["x402.org".to_string()],
        }
    }
}

/// Outbound call failure, classified
#[derive(Debug, Error)]
pub enum HttpError {
    /// URL rejected before any network traffic
    #[error("request blocked by policy: {0}")]
    Policy(String),

    #[error("request timed out")]
    Timeout,

    /// Connection refused, DNS failure, TLS failure, reset
    #[error("transport failure: {0}")]
    Transport(String),

    /// Remote answered with a non-success status
    #[error("remote returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("response too large: {0} bytes")]
    TooLarge(usize),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl HttpError {
    /// 4xx from the remote: it understood and refused.
    /// 408 and 429 mean the remote did not decide, so they do not count.
    pub fn is_client_rejection(&self) -> bool {
        matches!(
            self,
            HttpError::Status { status, .. }
                if status.is_client_error()
                    && *status != StatusCode::REQUEST_TIMEOUT
                    && *status != StatusCode::TOO_MANY_REQUESTS
        )
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_decode() {
            HttpError::Decode(e.to_string())
        } else {
            HttpError::Transport(e.to_string())
        }
    }
}

/// Secure HTTP client for facilitator communications
#[derive(Clone)]
pub struct SecureHttpClient {
    client: Client,
    config: HttpSecurityConfig,
}

impl SecureHttpClient {
    /// Create a new secure HTTP client
    pub fn new(config: HttpSecurityConfig) -> Result<Self, HttpError> {
        let mut client_builder = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("feedback-gate/", env!("CARGO_PKG_VERSION")));

        if config.require_https {
            client_builder = client_builder.https_only(true);
            info!("HTTPS enforcement enabled for outbound communications");
        }

        let client = client_builder
            .build()
            .map_err(|e| HttpError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Validate URL against the security policy
    pub fn validate_url(&self, url: &str) -> Result<Url, HttpError> {
        let parsed_url =
            Url::parse(url).map_err(|e| HttpError::Policy(format!("invalid URL {}: {}", url, e)))?;

        if self.config.require_https && parsed_url.scheme() != "https" {
            return Err(HttpError::Policy(format!(
                "HTTPS is required but URL uses {}: {}",
                parsed_url.scheme(),
                url
            )));
        }

        let Some(host) = parsed_url.host_str() else {
            return Err(HttpError::Policy(format!("URL must have a valid host: {}", url)));
        };

        if !self
            .config
            .allowed_domains
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{}", domain)))
        {
            return Err(HttpError::Policy(format!(
                "Domain '{}' is not in the allowed list: {:?}",
                host, self.config.allowed_domains
            )));
        }

        if host == "localhost" || host == "127.0.0.1" {
            warn!(
                "Allowing loopback URL: {} (should be disabled in production)",
                url
            );
        }

        Ok(parsed_url)
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let validated_url = self.validate_url(url)?;
        debug!("GET {}", validated_url);

        let request = self
            .client
            .get(validated_url.as_str())
            .header("Accept", "application/json");
        self.send_json(request).await
    }

    /// POST a JSON body and decode the JSON reply
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        let validated_url = self.validate_url(url)?;
        debug!("POST {}", validated_url);

        let request = self
            .client
            .post(validated_url.as_str())
            .header("Accept", "application/json")
            .json(body);
        self.send_json(request).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, HttpError> {
        let response = request.send().await?;
        let status = response.status();

        let content_length = response.content_length().unwrap_or(0);
        if content_length > self.config.max_response_size as u64 {
            return Err(HttpError::TooLarge(content_length as usize));
        }

        let bytes = response.bytes().await?;
        if bytes.len() > self.config.max_response_size {
            return Err(HttpError::TooLarge(bytes.len()));
        }

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).into_owned();
            return Err(HttpError::Status { status, body });
        }

        serde_json::from_slice(&bytes).map_err(|e| HttpError::Decode(e.to_string()))
    }

}

/// Allow-list entry for a configured URL: its host
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        let client = SecureHttpClient::new(HttpSecurityConfig::default()).unwrap();

        assert!(client.validate_url("https://x402.org/facilitator/verify").is_ok());
        assert!(client.validate_url("https://api.x402.org/verify").is_ok());

        // Plain HTTP when HTTPS is required
        assert!(matches!(
            client.validate_url("http://x402.org/facilitator/verify"),
            Err(HttpError::Policy(_))
        ));

        // Disallowed domain
        assert!(client.validate_url("https://evil.example.com/").is_err());
        // Suffix trick
        assert!(client.validate_url("https://notx402.org/").is_err());
    }

    #[test]
    fn test_loopback_allowed_when_listed() {
        let client = SecureHttpClient::new(HttpSecurityConfig {
            require_https: false,
            allowed_domains: vec!["127.0.0.1".to_string()],
            ..HttpSecurityConfig::default()
        })
        .unwrap();

        assert!(client.validate_url("http://127.0.0.1:4021/verify").is_ok());
    }

    #[test]
    fn test_rejection_classification() {
        let rejected = HttpError::Status {
            status: StatusCode::BAD_REQUEST,
            body: "invalid".to_string(),
        };
        let failed = HttpError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert!(rejected.is_client_rejection());
        assert!(!failed.is_client_rejection());
        assert!(!HttpError::Timeout.is_client_rejection());
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://x402.org/facilitator").as_deref(), Some("x402.org"));
        assert_eq!(host_of("not a url"), None);
    }
}
