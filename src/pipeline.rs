//! Run orchestration: normalize → fetch → extract → record.
//!
//! The pipeline is the explicitly constructed context for one run. It
//! owns the HTTP client (and through it the shared rate limiter) and
//! the compiled extraction patterns; both live exactly as long as the
//! run. Per-URL failures become records at the task boundary; only
//! run-fatal conditions propagate out of the batch loop.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{FetchError, NormalizeError, RunError};
use crate::extract::Extractor;
use crate::fetch::{Fetcher, RateLimiter};
use crate::models::{RunReport, ValidationRecord, ValidationStatus};
use crate::normalize;
use crate::sink::ResultSink;
use crate::source::UrlSource;

/// Batch flush retry policy for storage errors.
const STORAGE_FLUSH_RETRIES: u32 = 3;
const STORAGE_RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct Pipeline {
    fetcher: Fetcher,
    extractor: Extractor,
    concurrency: usize,
    batch_size: usize,
}

impl Pipeline {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let limiter = Arc::new(RateLimiter::per_minute(settings.requests_per_minute));
        let fetcher = Fetcher::new(settings, limiter)?;

        Ok(Self {
            fetcher,
            extractor: Extractor::new(),
            concurrency: settings.concurrency.max(1),
            batch_size: settings.batch_size.max(1),
        })
    }

    /// Validate a single raw URL end to end.
    ///
    /// Returns a record for every per-URL outcome, success or failure.
    /// The only `Err` is the run-fatal rate-limit escalation.
    pub async fn validate_url(&self, raw: &str) -> Result<ValidationRecord, RunError> {
        let channel_url = match normalize::normalize(raw) {
            Ok(channel_url) => channel_url,
            Err(err) => {
                let status = match err {
                    NormalizeError::InvalidDomain(_) => ValidationStatus::InvalidDomain,
                    NormalizeError::InvalidPathFormat(_) => ValidationStatus::InvalidPathFormat,
                };
                return Ok(ValidationRecord::failure(
                    raw.trim().to_string(),
                    status,
                    None,
                    err.to_string(),
                ));
            }
        };

        let html = match self.fetcher.fetch_page(&channel_url.normalized).await {
            Ok(html) => html,
            Err(FetchError::RateLimitExhausted { consecutive }) => {
                return Err(RunError::RateLimitAbort { consecutive });
            }
            Err(err) => return Ok(fetch_failure(channel_url.normalized, err)),
        };

        let extracted = self.extractor.extract(&html);
        match extracted.channel_id {
            Some(channel_id) => Ok(ValidationRecord::success(
                channel_url.normalized,
                channel_id,
                extracted.handle,
                extracted.subscriber_count,
            )),
            None => Ok(ValidationRecord::failure(
                channel_url.normalized,
                ValidationStatus::ExtractionFailed,
                Some(200),
                "could not extract channel information",
            )),
        }
    }

    /// Run a resumable batch over an input source.
    ///
    /// URLs that already have a recorded result are skipped unless
    /// `force` is set. Each batch of results commits atomically; on a
    /// fatal error the in-flight batch is discarded as a unit and the
    /// error propagates with earlier commits intact.
    pub async fn run_batch(
        self: Arc<Self>,
        source: &UrlSource,
        sink: Arc<dyn ResultSink>,
        force: bool,
        progress: Option<ProgressBar>,
    ) -> Result<RunReport, RunError> {
        let inputs = source.load().map_err(RunError::Input)?;

        let recorded = if force {
            HashSet::new()
        } else {
            sink.recorded_urls().await.map_err(|err| RunError::Storage {
                attempts: 1,
                source: err,
            })?
        };

        let PendingSet {
            pending,
            skipped,
            deduplicated,
        } = partition_pending(&inputs, &recorded);

        info!(
            "{} input URLs ({} already recorded, {} duplicates), {} to process",
            inputs.len(),
            skipped,
            deduplicated,
            pending.len()
        );

        if let Some(ref bar) = progress {
            bar.set_length(pending.len() as u64);
        }

        let mut report = RunReport {
            skipped,
            deduplicated,
            ..Default::default()
        };
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        for batch in pending.chunks(self.batch_size) {
            let mut tasks = JoinSet::new();
            for raw in batch {
                let pipeline = Arc::clone(&self);
                let semaphore = Arc::clone(&semaphore);
                let raw = raw.clone();
                tasks.spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("semaphore is never closed");
                    pipeline.validate_url(&raw).await
                });
            }

            let mut results = Vec::with_capacity(batch.len());
            let mut fatal: Option<RunError> = None;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(record)) => {
                        if let Some(ref bar) = progress {
                            bar.inc(1);
                        }
                        results.push(record);
                    }
                    Ok(Err(err)) => {
                        if fatal.is_none() {
                            fatal = Some(err);
                        }
                        tasks.abort_all();
                    }
                    Err(join_err) if join_err.is_cancelled() => {}
                    Err(join_err) => warn!("validation task panicked: {join_err}"),
                }
            }

            if let Some(err) = fatal {
                // Discard the partial batch as a unit; batches committed
                // earlier stay on disk and queryable.
                warn!("aborting run, discarding {} unflushed results", results.len());
                return Err(err);
            }

            self.flush_with_retry(sink.as_ref(), &results).await?;
            report.processed += results.len() as u64;
            report.valid += results.iter().filter(|r| r.is_valid()).count() as u64;
            report.invalid = report.processed - report.valid;
            info!(
                "batch committed: {} results, {}/{} valid so far",
                results.len(),
                report.valid,
                report.processed
            );
        }

        Ok(report)
    }

    async fn flush_with_retry(
        &self,
        sink: &dyn ResultSink,
        records: &[ValidationRecord],
    ) -> Result<(), RunError> {
        let mut attempt: u32 = 0;
        loop {
            match sink.record_batch(records).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt + 1 < STORAGE_FLUSH_RETRIES => {
                    attempt += 1;
                    warn!("batch flush failed (attempt {attempt}): {err}");
                    sleep(STORAGE_RETRY_DELAY * attempt).await;
                }
                Err(err) => {
                    return Err(RunError::Storage {
                        attempts: attempt + 1,
                        source: err,
                    });
                }
            }
        }
    }
}

/// The upsert key a given input will be recorded under: the normalized
/// URL when normalization succeeds, the trimmed input otherwise.
pub fn result_key(raw: &str) -> String {
    match normalize::normalize(raw) {
        Ok(channel_url) => channel_url.normalized,
        Err(_) => raw.trim().to_string(),
    }
}

/// Outcome of the pending-URL computation.
pub struct PendingSet {
    /// Raw inputs still needing processing, in input order.
    pub pending: Vec<String>,
    /// Inputs skipped because their key already has a recorded result.
    pub skipped: u64,
    /// Inputs collapsed because an earlier input shares their key.
    pub deduplicated: u64,
}

/// Compute the unprocessed remainder of `inputs` against a sink's
/// recorded keys. Deterministic: the same inputs and recorded set
/// always produce the same pending list, in the same order.
pub fn partition_pending(inputs: &[String], recorded: &HashSet<String>) -> PendingSet {
    let mut seen = HashSet::new();
    let mut pending = Vec::new();
    let mut skipped = 0;
    let mut deduplicated = 0;

    for raw in inputs {
        let key = result_key(raw);
        if !seen.insert(key.clone()) {
            deduplicated += 1;
            continue;
        }
        if recorded.contains(&key) {
            skipped += 1;
            continue;
        }
        pending.push(raw.clone());
    }

    PendingSet {
        pending,
        skipped,
        deduplicated,
    }
}

fn fetch_failure(url: String, err: FetchError) -> ValidationRecord {
    let (status, status_code) = match &err {
        FetchError::NotFound => (ValidationStatus::ChannelNotFound, Some(404)),
        FetchError::Upstream { status, .. } => {
            (ValidationStatus::UpstreamServerError, Some(*status))
        }
        FetchError::UnexpectedStatus { status } => {
            (ValidationStatus::UpstreamServerError, Some(*status))
        }
        FetchError::Network { .. } => (ValidationStatus::NetworkError, None),
        FetchError::RateLimited { .. } | FetchError::RateLimitExhausted { .. } => {
            (ValidationStatus::RateLimited, Some(429))
        }
    };
    ValidationRecord::failure(url, status, status_code, err.to_string())
}
