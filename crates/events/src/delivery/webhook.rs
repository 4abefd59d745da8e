//! Signed webhook delivery with exponential-backoff retry.
//!
//! [`WebhookDelivery`] posts the JSON envelope of a [`PlatformEvent`] to
//! an external URL. When a secret is given, the exact body bytes are
//! signed with HMAC-SHA256 and sent in `X-Webhook-Signature`. Failed
//! attempts are retried after 1 s, 2 s and 4 s.

use std::time::Duration;

use outreach_core::signing::{signature_header_value, SIGNATURE_HEADER};

use crate::bus::PlatformEvent;

/// Retry delays in seconds.
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Failed to encode webhook body: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

pub struct WebhookDelivery {
    client: reqwest::Client,
    retry_delays: Vec<Duration>,
}

impl WebhookDelivery {
    pub fn new() -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            retry_delays: RETRY_DELAYS_SECS.iter().map(|s| Duration::from_secs(*s)).collect(),
        })
    }

    /// Override the retry schedule (tests use zero delays).
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Deliver an event to a webhook URL, retrying on failure.
    ///
    /// Returns `Ok(())` on the first successful attempt.
    pub async fn deliver(
        &self,
        url: &str,
        secret: Option<&str>,
        event: &PlatformEvent,
    ) -> Result<(), WebhookError> {
        let body = serde_json::to_vec(&event.webhook_body())?;
        let signature = secret.map(|s| signature_header_value(s, &body));

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(url, &body, signature.as_deref()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        self.try_send(url, &body, signature.as_deref())
            .await
            .inspect_err(|e| {
                tracing::error!(url, error = %e, "Webhook delivery failed after all retries");
            })
    }

    async fn try_send(
        &self,
        url: &str,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), WebhookError> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        if let Some(sig) = signature {
            request = request.header(SIGNATURE_HEADER, sig);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client() {
        assert!(WebhookDelivery::new().is_ok());
    }

    #[test]
    fn http_status_error_display() {
        assert_eq!(WebhookError::HttpStatus(502).to_string(), "Webhook returned HTTP 502");
    }

    #[tokio::test]
    async fn unreachable_url_fails_after_retries() {
        let delivery = WebhookDelivery::new()
            .unwrap()
            .with_retry_delays(vec![Duration::ZERO, Duration::ZERO]);
        let result = delivery
            .deliver("http://127.0.0.1:9/hook", Some("s"), &PlatformEvent::new("x.y"))
            .await;
        assert!(matches!(result, Err(WebhookError::Request(_))));
    }
}
