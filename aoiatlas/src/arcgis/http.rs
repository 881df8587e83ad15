//! HTTP client abstraction for testability

use super::types::ArcGisError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// HTTP status codes the retry policy treats as transient.
const TRANSIENT_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Default timeout for outbound requests, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trait for asynchronous HTTP POST operations against feature services.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs a form-encoded HTTP POST request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `form` - Form parameters as (name, value) pairs
    ///
    /// # Returns
    ///
    /// The response body as bytes, or an [`ArcGisError::Transport`] whose
    /// `retriable` flag reflects the failure class: rate limiting, server
    /// 5xx and timeouts are transient; any other HTTP failure is not.
    fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> impl Future<Output = Result<Vec<u8>, ArcGisError>> + Send;
}

/// Real HTTP client implementation using reqwest.
///
/// Owns a pooled connection set reused across requests; safe for
/// concurrent callers because it performs no request-specific mutation.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with the default timeout.
    pub fn new() -> Result<Self, ArcGisError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new ReqwestClient with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ArcGisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            // Connection pooling - feature queries hit a handful of hosts
            // repeatedly, so keep warm connections around
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ArcGisError::fatal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<Vec<u8>, ArcGisError> {
        trace!(url = url, "HTTP POST request starting");

        let response = match self.client.post(url).form(form).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                // Network errors and timeouts are candidates for retry.
                return Err(ArcGisError::transient(format!("Request failed: {}", e)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = url, status = status.as_u16(), "HTTP error status");
            let message = format!("HTTP {} from {}", status, url);
            return if TRANSIENT_STATUS.contains(&status.as_u16()) {
                Err(ArcGisError::transient(message))
            } else {
                Err(ArcGisError::fatal(message))
            };
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(ArcGisError::transient(format!(
                    "Failed to read response: {}",
                    e
                )))
            }
        }
    }
}
