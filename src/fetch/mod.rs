//! HTTP retrieval with retries, backoff, and shared rate limiting.

mod rate_limiter;

pub use rate_limiter::{RateLimiter, DEFAULT_WINDOW};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER};
use reqwest::StatusCode;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::FetchError;

/// Maximum backoff delay (seconds).
const MAX_BACKOFF_SECS: u64 = 60;

/// Parse a Retry-After header value (seconds form).
/// Returns the duration to wait, or None if the header is missing/invalid.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    let value = header_value?;

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs.min(MAX_BACKOFF_SECS)));
    }

    // HTTP-date form is rare enough on 429s that it falls through to
    // exponential backoff instead.
    None
}

/// Exponential backoff delay for a given attempt, capped at 60s.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_SECS * 1000))
}

/// Page fetcher shared by all validation tasks.
///
/// Every attempt claims a slot from the shared rate limiter first.
/// Response handling follows a fixed policy: 200 returns the body,
/// 404 is a definitive negative, 429 and 5xx and transport errors are
/// retried with backoff up to the retry ceiling. Consecutive 429s
/// across the whole run escalate to a fatal error.
pub struct Fetcher {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    max_retries: u32,
    retry_base_ms: u64,
    consecutive_429s: AtomicU32,
    max_consecutive_429s: u32,
}

impl Fetcher {
    pub fn new(settings: &Settings, limiter: Arc<RateLimiter>) -> anyhow::Result<Self> {
        // Browser-like header set to avoid trivial bot blocking. This is
        // a compatibility shim, not a security feature.
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            limiter,
            max_retries: settings.max_retries,
            retry_base_ms: settings.retry_base_delay_ms,
            consecutive_429s: AtomicU32::new(0),
            max_consecutive_429s: settings.max_consecutive_429s.max(1),
        })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Fetch the page body for a normalized URL.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            self.limiter.acquire().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    match status {
                        StatusCode::OK => {
                            self.consecutive_429s.store(0, Ordering::Relaxed);
                            return response.text().await.map_err(|e| FetchError::Network {
                                message: e.to_string(),
                                attempts: attempt + 1,
                            });
                        }
                        StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
                        StatusCode::TOO_MANY_REQUESTS => {
                            let consecutive =
                                self.consecutive_429s.fetch_add(1, Ordering::Relaxed) + 1;
                            if consecutive >= self.max_consecutive_429s {
                                warn!(
                                    "{consecutive} consecutive 429 responses, aborting the run"
                                );
                                return Err(FetchError::RateLimitExhausted { consecutive });
                            }
                            if attempt >= self.max_retries {
                                return Err(FetchError::RateLimited {
                                    attempts: attempt + 1,
                                });
                            }
                            let retry_after = response
                                .headers()
                                .get(RETRY_AFTER)
                                .and_then(|v| v.to_str().ok());
                            let wait = parse_retry_after(retry_after)
                                .unwrap_or_else(|| backoff_delay(attempt, self.retry_base_ms));
                            debug!("rate limited on {url}, retrying in {wait:?}");
                            sleep(wait).await;
                        }
                        s if s.is_server_error() => {
                            if attempt >= self.max_retries {
                                return Err(FetchError::Upstream {
                                    status: s.as_u16(),
                                    attempts: attempt + 1,
                                });
                            }
                            let wait = backoff_delay(attempt, self.retry_base_ms);
                            debug!("HTTP {status} from {url}, retrying in {wait:?}");
                            sleep(wait).await;
                        }
                        s => {
                            // Anything else (401, 403, 410, ...) is terminal
                            // for this URL; static content won't change.
                            return Err(FetchError::UnexpectedStatus { status: s.as_u16() });
                        }
                    }
                }
                Err(err) => {
                    if attempt >= self.max_retries {
                        return Err(FetchError::Network {
                            message: err.to_string(),
                            attempts: attempt + 1,
                        });
                    }
                    let wait = backoff_delay(attempt, self.retry_base_ms);
                    debug!("request to {url} failed ({err}), retrying in {wait:?}");
                    sleep(wait).await;
                }
            }
            attempt += 1;
        }
    }
}
