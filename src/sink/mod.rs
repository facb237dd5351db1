//! Durable result sinks.
//!
//! A sink records validation outcomes keyed by normalized URL and
//! answers the resumption query: which URLs already have a recorded
//! result. Writes are batched and atomic per batch, so a crash mid-run
//! never leaves a half-written checkpoint.

mod csv_file;
mod sqlite;

pub use csv_file::CsvSink;
pub use sqlite::SqliteSink;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::models::ValidationRecord;

/// Aggregate counts over recorded results.
#[derive(Debug, Clone, Default)]
pub struct SinkStats {
    pub total: u64,
    pub valid: u64,
    /// Recorded rows per status string, for display.
    pub by_status: BTreeMap<String, u64>,
}

impl SinkStats {
    pub fn invalid(&self) -> u64 {
        self.total - self.valid
    }
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Upsert a whole batch atomically, keyed by URL. Either every
    /// record in the batch becomes visible or none do.
    async fn record_batch(&self, records: &[ValidationRecord]) -> Result<(), SinkError>;

    /// URLs that already have a recorded result.
    async fn recorded_urls(&self) -> Result<HashSet<String>, SinkError>;

    /// Counts for status display.
    async fn stats(&self) -> Result<SinkStats, SinkError>;
}

/// Open a sink for a destination path. `.csv` selects the CSV backend;
/// anything else is treated as a SQLite database.
pub fn open_sink(path: &Path) -> Result<Arc<dyn ResultSink>, SinkError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        Ok(Arc::new(CsvSink::open(path)?))
    } else {
        Ok(Arc::new(SqliteSink::open(path)?))
    }
}
