//! SQLite-backed result sink.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{ResultSink, SinkStats};
use crate::error::SinkError;
use crate::models::{ValidationRecord, ValidationStatus};

/// Result storage in a single SQLite database.
///
/// Uses WAL mode and a busy timeout so concurrent readers (the pending
/// query) don't collide with batch commits.
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    pub fn open(db_path: &Path) -> Result<Self, SinkError> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let sink = Self {
            conn: Mutex::new(conn),
        };
        sink.init_schema()?;
        Ok(sink)
    }

    fn init_schema(&self) -> Result<(), SinkError> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS validation_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                status_code INTEGER,
                status_message TEXT NOT NULL,
                channel_id TEXT,
                handle TEXT,
                subscriber_count TEXT,
                processed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_validation_results_status
                ON validation_results(status);
        "#,
        )?;

        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ValidationRecord> {
        let status: String = row.get(1)?;
        let processed_at: String = row.get(7)?;

        Ok(ValidationRecord {
            url: row.get(0)?,
            status: ValidationStatus::from_str(&status)
                .unwrap_or(ValidationStatus::NetworkError),
            status_code: row.get(2)?,
            status_message: row.get(3)?,
            channel_id: row.get(4)?,
            handle: row.get(5)?,
            subscriber_count: row.get(6)?,
            processed_at: DateTime::parse_from_rfc3339(&processed_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    /// Fetch a single record by URL.
    pub fn get(&self, url: &str) -> Result<Option<ValidationRecord>, SinkError> {
        use rusqlite::OptionalExtension;

        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT url, status, status_code, status_message, channel_id, handle,
                        subscriber_count, processed_at
                 FROM validation_results WHERE url = ?",
                params![url],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }
}

#[async_trait]
impl ResultSink for SqliteSink {
    async fn record_batch(&self, records: &[ValidationRecord]) -> Result<(), SinkError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO validation_results
                    (url, status, status_code, status_message, channel_id, handle,
                     subscriber_count, processed_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                   ON CONFLICT(url) DO UPDATE SET
                       status = excluded.status,
                       status_code = excluded.status_code,
                       status_message = excluded.status_message,
                       channel_id = excluded.channel_id,
                       handle = excluded.handle,
                       subscriber_count = excluded.subscriber_count,
                       processed_at = excluded.processed_at"#,
            )?;

            for record in records {
                stmt.execute(params![
                    record.url,
                    record.status.as_str(),
                    record.status_code,
                    record.status_message,
                    record.channel_id,
                    record.handle,
                    record.subscriber_count,
                    record.processed_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    async fn recorded_urls(&self) -> Result<HashSet<String>, SinkError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT url FROM validation_results")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;

        Ok(urls)
    }

    async fn stats(&self) -> Result<SinkStats, SinkError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM validation_results GROUP BY status")?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<rusqlite::Result<Vec<(String, u64)>>>()?;

        let mut stats = SinkStats::default();
        for (status, count) in counts {
            stats.total += count;
            if status == ValidationStatus::Valid.as_str() {
                stats.valid += count;
            }
            stats.by_status.insert(status, count);
        }

        Ok(stats)
    }
}
