//! CSV-backed implementation of the TabularStore trait.
//!
//! The file holds one header row followed by one data row per record. Rows are
//! only ever appended; existing rows are never rewritten or reordered. All
//! access goes through a single process-wide lock since a delimited file does
//! not tolerate interleaved partial writes.

use async_trait::async_trait;
use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::{SchemaState, TabularStore, TABULAR_HEADER};
use crate::error::{AttendanceError, AttendanceResult};
use crate::types::{AttendanceRecord, AttendanceStatus, HistoryRow};

const UTF8_BOM: char = '\u{feff}';

/// CSV file store for the six-field report schema.
pub struct CsvTabularStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvTabularStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader<R: Read>(source: R) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(source)
    }

    fn writer<W: Write>(sink: W) -> csv::Writer<W> {
        csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(sink)
    }

    fn is_schema_header(header: &csv::StringRecord) -> bool {
        header.len() == TABULAR_HEADER.len()
            && header
                .iter()
                .zip(TABULAR_HEADER.iter())
                .enumerate()
                .all(|(i, (found, expected))| {
                    let found = if i == 0 {
                        found.trim_start_matches(UTF8_BOM)
                    } else {
                        found
                    };
                    found.trim() == *expected
                })
    }

    fn inspect(path: &Path) -> AttendanceResult<SchemaState> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SchemaState::Missing),
            Err(e) => return Err(read_error(path, e)),
        };
        let mut reader = Self::reader(file);
        Ok(match reader.records().next() {
            None => SchemaState::Missing,
            Some(Ok(header)) if Self::is_schema_header(&header) => SchemaState::Valid,
            Some(_) => SchemaState::Malformed,
        })
    }

    fn row_fields(record: &AttendanceRecord) -> [String; 6] {
        [
            record.identity.clone(),
            record.display_name.clone(),
            record.date_field(),
            record.time_field(),
            record.observed_address.clone(),
            record.status.as_str().to_string(),
        ]
    }

    /// True when the file is non-empty and does not end with a line break.
    fn missing_trailing_newline(path: &Path) -> io::Result<bool> {
        let mut file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(last[0] != b'\n')
    }

    fn append_blocking(path: &Path, record: &AttendanceRecord) -> AttendanceResult<()> {
        let state = Self::inspect(path).map_err(|e| write_error(path, e))?;
        if state == SchemaState::Malformed {
            return Err(write_error(path, "header row does not match the attendance schema"));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_error(path, e))?;
        }
        let repair_newline = state == SchemaState::Valid
            && Self::missing_trailing_newline(path).map_err(|e| write_error(path, e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| write_error(path, e))?;
        if repair_newline {
            file.write_all(b"\n").map_err(|e| write_error(path, e))?;
        }

        let mut writer = Self::writer(file);
        if state == SchemaState::Missing {
            debug!(path = %path.display(), "creating tabular store header");
            writer
                .write_record(TABULAR_HEADER)
                .map_err(|e| write_error(path, e))?;
        }
        writer
            .write_record(Self::row_fields(record))
            .map_err(|e| write_error(path, e))?;
        let file = writer.into_inner().map_err(|e| write_error(path, e))?;
        file.sync_data().map_err(|e| write_error(path, e))?;
        Ok(())
    }

    fn read_blocking(path: &Path) -> AttendanceResult<Vec<HistoryRow>> {
        match Self::inspect(path)? {
            SchemaState::Missing => return Ok(Vec::new()),
            SchemaState::Malformed => {
                return Err(read_error(path, "header row does not match the attendance schema"))
            }
            SchemaState::Valid => {}
        }

        let file = File::open(path).map_err(|e| read_error(path, e))?;
        let mut reader = Self::reader(file);
        let mut rows = Vec::new();
        // Skip the header row.
        for (index, result) in reader.records().enumerate().skip(1) {
            let record = result.map_err(|e| read_error(path, e))?;
            let field = |i: usize| record.get(i).unwrap_or_default().to_string();
            let identity = field(0);
            let display_name = field(1);
            if identity.is_empty() && display_name.is_empty() {
                debug!(path = %path.display(), row = index + 1, "skipping empty tabular row");
                continue;
            }
            let status = field(5)
                .parse::<AttendanceStatus>()
                .map_err(|e| read_error(path, format!("row {}: {}", index + 1, e)))?;
            rows.push(HistoryRow {
                identity,
                display_name,
                date: field(2),
                time: field(3),
                observed_address: field(4),
                status,
            });
        }
        Ok(rows)
    }
}

fn write_error(path: &Path, e: impl Display) -> AttendanceError {
    AttendanceError::TabularStoreWrite(format!("{}: {}", path.display(), e))
}

fn read_error(path: &Path, e: impl Display) -> AttendanceError {
    AttendanceError::TabularStoreRead(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl TabularStore for CsvTabularStore {
    async fn schema_state(&self) -> AttendanceResult<SchemaState> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::inspect(&path)).await?
    }

    async fn append(&self, record: &AttendanceRecord) -> AttendanceResult<()> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || Self::append_blocking(&path, &record)).await?
    }

    async fn read_all(&self) -> AttendanceResult<Vec<HistoryRow>> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::read_blocking(&path)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReasonCode;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn record(identity: &str, name: &str, address: &str, reason: ReasonCode) -> AttendanceRecord {
        AttendanceRecord::new(
            identity,
            name,
            address,
            Some("203.0.113.9".to_string()),
            false,
            false,
            reason,
            Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 15).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_first_write_creates_header() {
        let dir = tempdir().unwrap();
        let store = CsvTabularStore::new(dir.path().join("attendance.csv"));
        assert_eq!(store.schema_state().await.unwrap(), SchemaState::Missing);

        store
            .append(&record("U002", "Grace", "203.0.113.9", ReasonCode::AddressMatched))
            .await
            .unwrap();

        assert_eq!(store.schema_state().await.unwrap(), SchemaState::Valid);
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content,
            "identity,displayName,date,time,address,status\n\
             U002,Grace,2024-05-14,09:30:15,203.0.113.9,Present\n"
        );
    }

    #[tokio::test]
    async fn test_rows_round_trip_in_file_order() {
        let dir = tempdir().unwrap();
        let store = CsvTabularStore::new(dir.path().join("nested").join("attendance.csv"));
        let first = record("U001", "Lovelace, Ada", "198.51.100.4", ReasonCode::AddressMismatch);
        let second = record("U002", "Grace \"Amazing\" Hopper", "203.0.113.9", ReasonCode::AddressMatched);
        store.append(&first).await.unwrap();
        store.append(&second).await.unwrap();

        let rows = store.read_all().await.unwrap();
        assert_eq!(rows, vec![first.to_history_row(), second.to_history_row()]);
    }

    #[tokio::test]
    async fn test_empty_file_is_missing_and_gets_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        std::fs::write(&path, "").unwrap();
        let store = CsvTabularStore::new(&path);
        assert_eq!(store.schema_state().await.unwrap(), SchemaState::Missing);
        assert!(store.read_all().await.unwrap().is_empty());

        store
            .append(&record("U001", "Ada", "198.51.100.4", ReasonCode::AddressMismatch))
            .await
            .unwrap();
        assert_eq!(store.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_header_is_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        std::fs::write(&path, "name,when\nAda,yesterday\n").unwrap();
        let store = CsvTabularStore::new(&path);

        assert_eq!(store.schema_state().await.unwrap(), SchemaState::Malformed);
        let err = store
            .append(&record("U001", "Ada", "198.51.100.4", ReasonCode::AddressMismatch))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::TabularStoreWrite(_)));
        assert!(matches!(
            store.read_all().await.unwrap_err(),
            AttendanceError::TabularStoreRead(_)
        ));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "name,when\nAda,yesterday\n"
        );
    }

    #[tokio::test]
    async fn test_blank_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        std::fs::write(
            &path,
            "identity,displayName,date,time,address,status\n\
             ,,2024-05-14,09:00:00,,\n\
             U001,Ada,2024-05-14,09:00:01,198.51.100.4,Absent",
        )
        .unwrap();
        let store = CsvTabularStore::new(&path);
        let rows = store.read_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identity, "U001");

        // Appending after a file without a trailing newline starts a new line.
        store
            .append(&record("U002", "Grace", "203.0.113.9", ReasonCode::AddressMatched))
            .await
            .unwrap();
        let rows = store.read_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].identity, "U002");
    }

    #[tokio::test]
    async fn test_unknown_status_makes_store_unreadable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        std::fs::write(
            &path,
            "identity,displayName,date,time,address,status\nU001,Ada,2024-05-14,09:00:01,198.51.100.4,Maybe\n",
        )
        .unwrap();
        let store = CsvTabularStore::new(&path);
        assert!(matches!(
            store.read_all().await,
            Err(AttendanceError::TabularStoreRead(_))
        ));
    }
}
