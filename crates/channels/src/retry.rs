//! HTTP sending with 429 handling.
//!
//! A `429 Too Many Requests` answer is retried after the `Retry-After`
//! delay (in seconds) or, without that header, after 1 s, 2 s and 4 s.
//! Every 429 also puts the platform into backoff in the shared
//! [`RateLimiter`]; running out of retries applies the default backoff.

use std::sync::Arc;
use std::time::Duration;

use outreach_core::platform::Platform;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};

use crate::error::ChannelError;
use crate::rate_limiter::{RateLimiter, DEFAULT_BACKOFF};

/// Fallback delays when the provider sends no `Retry-After`.
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest body excerpt kept in error messages.
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct RetryingClient {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    platform: Platform,
    retry_delays: Vec<Duration>,
}

impl RetryingClient {
    pub fn new(limiter: Arc<RateLimiter>, platform: Platform) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            limiter,
            platform,
            retry_delays: RETRY_DELAYS_SECS.iter().map(|s| Duration::from_secs(*s)).collect(),
        })
    }

    /// Override the fallback schedule; its length is the retry budget.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Send the request built by `build`, rebuilding it for every retry.
    ///
    /// Non-success statuses other than 429 are returned as
    /// [`ChannelError::HttpStatus`] without retrying.
    pub async fn send<F>(&self, build: F) -> Result<Response, ChannelError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let max_retries = self.retry_delays.len() as u32;
        let mut attempt: u32 = 0;

        loop {
            let response = build(&self.client).send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= max_retries {
                    self.limiter.trigger_backoff(self.platform, DEFAULT_BACKOFF);
                    tracing::error!(
                        platform = %self.platform,
                        retries = attempt,
                        "Provider still rate limiting after retries"
                    );
                    return Err(ChannelError::RateLimited { retries: attempt });
                }
                let wait = retry_after(response.headers())
                    .unwrap_or(self.retry_delays[attempt as usize]);
                self.limiter.trigger_backoff(self.platform, wait);
                tracing::warn!(
                    platform = %self.platform,
                    attempt = attempt + 1,
                    wait_ms = wait.as_millis() as u64,
                    "Provider returned 429, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ChannelError::HttpStatus {
                    status: status.as_u16(),
                    body: truncate(body, MAX_ERROR_BODY),
                });
            }

            return Ok(response);
        }
    }
}

/// `Retry-After` as a number of seconds. HTTP dates are ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
    }
    s
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn parses_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate("héllo".to_string(), 2), "h");
        assert_eq!(truncate("abc".to_string(), 10), "abc");
    }
}
