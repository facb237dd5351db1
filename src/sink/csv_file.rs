//! CSV-file result sink.
//!
//! CSV has no transactions, so batch atomicity comes from rewriting
//! the whole file: each commit serializes every row to a sibling temp
//! file and renames it over the destination. A crash mid-commit leaves
//! the previous file intact.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ResultSink, SinkStats};
use crate::error::SinkError;
use crate::models::ValidationRecord;

pub struct CsvSink {
    path: PathBuf,
    state: Mutex<CsvState>,
}

/// In-memory mirror of the file. `order` keeps first-seen row order so
/// rewrites are stable and diffs stay readable.
#[derive(Default)]
struct CsvState {
    order: Vec<String>,
    rows: HashMap<String, ValidationRecord>,
}

impl CsvSink {
    /// Open a CSV sink, loading any existing rows from a prior run.
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        let mut state = CsvState::default();

        if path.is_file() {
            let mut reader = csv::Reader::from_path(path)?;
            for row in reader.deserialize::<ValidationRecord>() {
                let record = row?;
                if !state.rows.contains_key(&record.url) {
                    state.order.push(record.url.clone());
                }
                state.rows.insert(record.url.clone(), record);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    fn write_all(&self, state: &CsvState) -> Result<(), SinkError> {
        let tmp_path = self.path.with_extension("csv.tmp");

        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            for url in &state.order {
                if let Some(record) = state.rows.get(url) {
                    writer.serialize(record)?;
                }
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for CsvSink {
    async fn record_batch(&self, records: &[ValidationRecord]) -> Result<(), SinkError> {
        let mut state = self.state.lock().unwrap();

        for record in records {
            if !state.rows.contains_key(&record.url) {
                state.order.push(record.url.clone());
            }
            state.rows.insert(record.url.clone(), record.clone());
        }

        self.write_all(&state)
    }

    async fn recorded_urls(&self) -> Result<HashSet<String>, SinkError> {
        let state = self.state.lock().unwrap();
        Ok(state.rows.keys().cloned().collect())
    }

    async fn stats(&self) -> Result<SinkStats, SinkError> {
        let state = self.state.lock().unwrap();

        let mut stats = SinkStats::default();
        for record in state.rows.values() {
            stats.total += 1;
            if record.is_valid() {
                stats.valid += 1;
            }
            *stats
                .by_status
                .entry(record.status.as_str().to_string())
                .or_insert(0) += 1;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationStatus;

    fn sample(url: &str, status: ValidationStatus) -> ValidationRecord {
        match status {
            ValidationStatus::Valid => ValidationRecord::success(
                url.to_string(),
                "UCabcdefghijklmnopqrstuv".to_string(),
                None,
                Some("42K".to_string()),
            ),
            other => {
                ValidationRecord::failure(url.to_string(), other, None, "no response")
            }
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");

        {
            let sink = CsvSink::open(&csv_path).unwrap();
            sink.record_batch(&[
                sample("https://youtube.com/@a", ValidationStatus::Valid),
                sample("https://youtube.com/@b", ValidationStatus::NetworkError),
            ])
            .await
            .unwrap();
        }

        // Reopen and verify rows survived the rewrite.
        let sink = CsvSink::open(&csv_path).unwrap();
        let urls = sink.recorded_urls().await.unwrap();
        assert_eq!(urls.len(), 2);

        let stats = sink.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.by_status.get("network_error"), Some(&1));
    }

    #[tokio::test]
    async fn test_upsert_replaces_row() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");
        let sink = CsvSink::open(&csv_path).unwrap();

        let url = "https://youtube.com/@a";
        sink.record_batch(&[sample(url, ValidationStatus::NetworkError)])
            .await
            .unwrap();
        sink.record_batch(&[sample(url, ValidationStatus::Valid)])
            .await
            .unwrap();

        let stats = sink.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.valid, 1);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::open(&dir.path().join("new.csv")).unwrap();
        assert!(sink.recorded_urls().await.unwrap().is_empty());
    }
}
