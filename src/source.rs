//! Input URL sources.
//!
//! URLs arrive as literal strings, as a named column in a CSV file, or
//! as a column of a SQLite table. Loading is read-only and happens once
//! at the start of a run.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use rusqlite::{Connection, OpenFlags};

#[derive(Debug, Clone)]
pub enum UrlSource {
    /// URLs given directly on the command line.
    Literals(Vec<String>),
    /// A named column in a CSV file with a header row.
    CsvColumn { path: PathBuf, column: String },
    /// A column of a relational table.
    SqliteColumn {
        path: PathBuf,
        table: String,
        column: String,
    },
}

impl UrlSource {
    /// Load all input URLs, in source order. Empty cells are skipped.
    pub fn load(&self) -> anyhow::Result<Vec<String>> {
        match self {
            UrlSource::Literals(urls) => Ok(urls.clone()),
            UrlSource::CsvColumn { path, column } => load_csv_column(path, column),
            UrlSource::SqliteColumn {
                path,
                table,
                column,
            } => load_sqlite_column(path, table, column),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            UrlSource::Literals(urls) => format!("{} literal URL(s)", urls.len()),
            UrlSource::CsvColumn { path, column } => {
                format!("column {:?} of {}", column, path.display())
            }
            UrlSource::SqliteColumn {
                path,
                table,
                column,
            } => format!("{table}.{column} in {}", path.display()),
        }
    }
}

fn load_csv_column(path: &Path, column: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let column_index = reader
        .headers()?
        .iter()
        .position(|header| header == column)
        .with_context(|| format!("column {column:?} not found in {}", path.display()))?;

    let mut urls = Vec::new();
    for row in reader.records() {
        let row = row?;
        if let Some(value) = row.get(column_index) {
            let value = value.trim();
            if !value.is_empty() {
                urls.push(value.to_string());
            }
        }
    }

    Ok(urls)
}

fn load_sqlite_column(path: &Path, table: &str, column: &str) -> anyhow::Result<Vec<String>> {
    // Identifiers can't be bound as parameters; restrict them instead.
    for identifier in [table, column] {
        if !is_safe_identifier(identifier) {
            bail!("invalid identifier {identifier:?}");
        }
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut stmt = conn.prepare(&format!(
        "SELECT \"{column}\" FROM \"{table}\" WHERE \"{column}\" IS NOT NULL"
    ))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(rows
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect())
}

fn is_safe_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_literals_pass_through() {
        let source = UrlSource::Literals(vec!["youtube.com/@a".to_string()]);
        assert_eq!(source.load().unwrap(), vec!["youtube.com/@a"]);
    }

    #[test]
    fn test_csv_column_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "name,channel_url").unwrap();
        writeln!(file, "A,youtube.com/@a").unwrap();
        writeln!(file, "B,").unwrap();
        writeln!(file, "C, youtube.com/@c ").unwrap();

        let source = UrlSource::CsvColumn {
            path,
            column: "channel_url".to_string(),
        };
        assert_eq!(
            source.load().unwrap(),
            vec!["youtube.com/@a", "youtube.com/@c"]
        );
    }

    #[test]
    fn test_csv_missing_column_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        std::fs::write(&path, "name\nA\n").unwrap();

        let source = UrlSource::CsvColumn {
            path,
            column: "channel_url".to_string(),
        };
        assert!(source.load().is_err());
    }

    #[test]
    fn test_sqlite_column_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE channels (id INTEGER PRIMARY KEY, url TEXT);
                 INSERT INTO channels (url) VALUES ('youtube.com/@a'), (NULL), ('youtube.com/@b');",
            )
            .unwrap();
        }

        let source = UrlSource::SqliteColumn {
            path,
            table: "channels".to_string(),
            column: "url".to_string(),
        };
        assert_eq!(
            source.load().unwrap(),
            vec!["youtube.com/@a", "youtube.com/@b"]
        );
    }

    #[test]
    fn test_unsafe_identifier_rejected() {
        let source = UrlSource::SqliteColumn {
            path: PathBuf::from("ignored.db"),
            table: "channels; DROP TABLE x".to_string(),
            column: "url".to_string(),
        };
        assert!(source.load().is_err());
    }
}
