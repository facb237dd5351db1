//! Core data types for channel validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Path shape of a normalized channel URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlShape {
    /// `/channel/UC...` with a stable 24-character channel ID.
    ChannelId,
    /// `/@handle` vanity alias.
    Handle,
    /// `/user/<name>` legacy username URL. No channel ID derivable.
    LegacyUser,
    /// `/c/<name>` legacy custom URL. No channel ID derivable.
    LegacyCustom,
}

impl UrlShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlShape::ChannelId => "channel_id",
            UrlShape::Handle => "handle",
            UrlShape::LegacyUser => "legacy_user",
            UrlShape::LegacyCustom => "legacy_custom",
        }
    }
}

/// A raw input string resolved to a canonical channel URL.
///
/// Constructed once by [`crate::normalize::normalize`], never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUrl {
    /// The input string as given.
    pub raw: String,
    /// Canonical absolute URL. Normalizing it again yields the same string.
    pub normalized: String,
    pub shape: UrlShape,
}

/// Terminal status of one validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    InvalidDomain,
    InvalidPathFormat,
    ChannelNotFound,
    UpstreamServerError,
    NetworkError,
    RateLimited,
    ExtractionFailed,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "valid",
            ValidationStatus::InvalidDomain => "invalid_domain",
            ValidationStatus::InvalidPathFormat => "invalid_path_format",
            ValidationStatus::ChannelNotFound => "channel_not_found",
            ValidationStatus::UpstreamServerError => "upstream_server_error",
            ValidationStatus::NetworkError => "network_error",
            ValidationStatus::RateLimited => "rate_limited",
            ValidationStatus::ExtractionFailed => "extraction_failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "valid" => Some(ValidationStatus::Valid),
            "invalid_domain" => Some(ValidationStatus::InvalidDomain),
            "invalid_path_format" => Some(ValidationStatus::InvalidPathFormat),
            "channel_not_found" => Some(ValidationStatus::ChannelNotFound),
            "upstream_server_error" => Some(ValidationStatus::UpstreamServerError),
            "network_error" => Some(ValidationStatus::NetworkError),
            "rate_limited" => Some(ValidationStatus::RateLimited),
            "extraction_failed" => Some(ValidationStatus::ExtractionFailed),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationStatus::Valid)
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted outcome of processing one URL.
///
/// A valid record always carries a channel ID; a failed record never
/// carries any channel field. The constructors enforce this, so a row
/// can't end up misleadingly half-populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Upsert key: the normalized URL, or the raw input when
    /// normalization itself failed.
    pub url: String,
    pub status: ValidationStatus,
    /// HTTP status of the final attempt, when a response was received.
    pub status_code: Option<u16>,
    pub status_message: String,
    pub channel_id: Option<String>,
    pub handle: Option<String>,
    /// Subscriber count as matched on the page ("1.2M"), suffix stripped.
    pub subscriber_count: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl ValidationRecord {
    /// A successful validation. `channel_id` is mandatory by contract.
    pub fn success(
        url: String,
        channel_id: String,
        handle: Option<String>,
        subscriber_count: Option<String>,
    ) -> Self {
        Self {
            url,
            status: ValidationStatus::Valid,
            status_code: Some(200),
            status_message: "ok".to_string(),
            channel_id: Some(channel_id),
            handle,
            subscriber_count,
            processed_at: Utc::now(),
        }
    }

    /// A failed validation. Channel fields are deliberately absent.
    pub fn failure(
        url: String,
        status: ValidationStatus,
        status_code: Option<u16>,
        status_message: impl Into<String>,
    ) -> Self {
        Self {
            url,
            status,
            status_code,
            status_message: status_message.into(),
            channel_id: None,
            handle: None,
            subscriber_count: None,
            processed_at: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status.is_valid()
    }
}

/// Aggregate counts for a completed (or resumed) batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunReport {
    /// URLs processed and committed in this run.
    pub processed: u64,
    pub valid: u64,
    pub invalid: u64,
    /// Input URLs skipped because a result was already recorded.
    pub skipped: u64,
    /// Duplicate inputs collapsed by normalization.
    pub deduplicated: u64,
}
