//! Error types for the validation pipeline.
//!
//! Each stage has its own error enum so the batch loop can tell
//! record-and-continue failures apart from run-aborting conditions
//! without inspecting strings.

/// Deterministic input rejection. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The authority is not in the youtube.com / youtu.be family.
    #[error("not a YouTube URL: {0:?}")]
    InvalidDomain(String),
    /// The path does not match any known channel URL shape.
    #[error("unrecognized channel path: {0:?}")]
    InvalidPathFormat(String),
}

/// Failure to retrieve page content for one URL.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP 404. A definitive negative, never retried.
    #[error("channel not found (HTTP 404)")]
    NotFound,
    /// HTTP 5xx after the retry ceiling was exhausted.
    #[error("upstream server error (HTTP {status}) after {attempts} attempts")]
    Upstream { status: u16, attempts: u32 },
    /// A status outside the handled set (401, 403, 410, ...). Terminal.
    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },
    /// Connection, DNS, or timeout failure after the retry ceiling.
    #[error("network error after {attempts} attempts: {message}")]
    Network { message: String, attempts: u32 },
    /// HTTP 429 after the retry ceiling was exhausted for this URL.
    #[error("rate limited (HTTP 429) after {attempts} attempts")]
    RateLimited { attempts: u32 },
    /// The run-wide consecutive-429 ceiling was reached. The whole run
    /// must stop; further requests waste quota.
    #[error("sustained rate limiting: {consecutive} consecutive 429 responses")]
    RateLimitExhausted { consecutive: u32 },
}

/// Result sink read/write failure.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Condition that terminates a batch run. Per-URL failures never take
/// this path; they become [`crate::models::ValidationRecord`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("run aborted after {consecutive} consecutive 429 responses")]
    RateLimitAbort { consecutive: u32 },
    #[error("result storage failed after {attempts} attempts: {source}")]
    Storage {
        attempts: u32,
        #[source]
        source: SinkError,
    },
    #[error("failed to load input URLs: {0}")]
    Input(#[source] anyhow::Error),
}
