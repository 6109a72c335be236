//! JSON-file implementation of the DocumentStore trait.
//!
//! The document has two top-level collections:
//!
//! ```json
//! { "identities": { "<identity>": { "expectedAddress": "...", "updatedAt": "..." } },
//!   "records": [ { ...full AttendanceRecord... } ] }
//! ```
//!
//! The loaded document is held in memory behind an `RwLock`, so reads never
//! wait on writers. Writes are serialized by a separate writer lock: each one
//! builds the next document from the in-memory one, persists it atomically
//! (temp file + rename) and only then publishes it to readers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::DocumentStore;
use crate::error::{AttendanceError, AttendanceResult};
use crate::types::{AttendanceRecord, ExpectedAddressEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpectedAddressDoc {
    expected_address: String,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AttendanceDocument {
    #[serde(default)]
    identities: BTreeMap<String, ExpectedAddressDoc>,
    #[serde(default)]
    records: Vec<AttendanceRecord>,
}

impl AttendanceDocument {
    fn entry(identity: &str, doc: &ExpectedAddressDoc) -> ExpectedAddressEntry {
        ExpectedAddressEntry {
            identity: identity.to_string(),
            expected_address: doc.expected_address.clone(),
            updated_at: doc.updated_at,
        }
    }
}

/// File-backed document store.
pub struct JsonDocumentStore {
    path: PathBuf,
    document: RwLock<Arc<AttendanceDocument>>,
    writer: Mutex<()>,
    /// Set when a damaged file could not be moved aside.
    blocked: Option<String>,
}

impl JsonDocumentStore {
    /// Open the store, starting empty when the file is missing, unreadable or unparsable.
    ///
    /// An unreadable or unparsable file is moved aside as `<name>.corrupt-<timestamp>`
    /// so the next write cannot destroy whatever it still contains. When it cannot
    /// be moved, the store stays readable but refuses writes.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (document, blocked) = match Self::load(&path) {
            Ok(document) => (document, None),
            Err(reason) => match Self::quarantine(&path) {
                Ok(()) => (AttendanceDocument::default(), None),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to move damaged document store aside, refusing writes");
                    (
                        AttendanceDocument::default(),
                        Some(format!("{} ({}); not moved aside: {}", path.display(), reason, e)),
                    )
                }
            },
        };
        Self {
            path,
            document: RwLock::new(Arc::new(document)),
            writer: Mutex::new(()),
            blocked,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Err` carries the reason the existing file could not be used.
    fn load(path: &Path) -> Result<AttendanceDocument, String> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "document store absent, starting empty");
                return Ok(AttendanceDocument::default());
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "document store unreadable, starting empty");
                return Err(e.to_string());
            }
        };
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(AttendanceDocument::default());
        }
        serde_json::from_slice(&content).map_err(|e| {
            warn!(path = %path.display(), error = %e, "document store corrupted, starting empty");
            e.to_string()
        })
    }

    fn quarantine(path: &Path) -> io::Result<()> {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S")));
        let target = path.with_file_name(name);
        fs::rename(path, &target)?;
        warn!(from = %path.display(), to = %target.display(), "damaged document store moved aside");
        Ok(())
    }

    fn snapshot(&self) -> AttendanceResult<Arc<AttendanceDocument>> {
        self.document
            .read()
            .map(|doc| Arc::clone(&doc))
            .map_err(|_| AttendanceError::DocumentStore("document lock poisoned".to_string()))
    }

    fn publish(&self, next: AttendanceDocument) -> AttendanceResult<()> {
        let mut current = self
            .document
            .write()
            .map_err(|_| AttendanceError::DocumentStore("document lock poisoned".to_string()))?;
        *current = Arc::new(next);
        Ok(())
    }

    /// Serialize and atomically replace the backing file.
    fn atomic_write(path: &Path, document: &AttendanceDocument) -> AttendanceResult<()> {
        let content = serde_json::to_vec_pretty(document)
            .map_err(|e| AttendanceError::DocumentStore(e.to_string()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| store_error(path, e))?;
        let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        {
            let mut f = fs::File::create(&tmp).map_err(|e| store_error(path, e))?;
            f.write_all(&content).map_err(|e| store_error(path, e))?;
            f.sync_all().map_err(|e| store_error(path, e))?;
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(store_error(path, e));
        }
        if let Ok(dir_file) = fs::File::open(&dir) {
            let _ = dir_file.sync_all();
        }
        Ok(())
    }

    /// Apply `mutate` to a copy of the current document, persist it, then publish it.
    ///
    /// The whole file is rewritten on every change since the store is a single
    /// JSON document. The writer lock makes each rewrite exclusive, so no
    /// concurrent change can be lost.
    async fn commit<F>(&self, mutate: F) -> AttendanceResult<()>
    where
        F: FnOnce(&mut AttendanceDocument) + Send,
    {
        if let Some(reason) = &self.blocked {
            return Err(AttendanceError::DocumentStore(format!(
                "writes refused, damaged file still in place: {}",
                reason
            )));
        }
        let _writer = self.writer.lock().await;
        let mut next = (*self.snapshot()?).clone();
        mutate(&mut next);
        let path = self.path.clone();
        let next = tokio::task::spawn_blocking(move || {
            Self::atomic_write(&path, &next).map(|_| next)
        })
        .await
        .map_err(|e| AttendanceError::DocumentStore(e.to_string()))??;
        self.publish(next)
    }
}

fn store_error(path: &Path, e: impl std::fmt::Display) -> AttendanceError {
    AttendanceError::DocumentStore(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn append(&self, record: &AttendanceRecord) -> AttendanceResult<()> {
        let record = record.clone();
        self.commit(move |doc| doc.records.push(record)).await
    }

    async fn all_for_identity(&self, identity: &str) -> AttendanceResult<Vec<AttendanceRecord>> {
        let doc = self.snapshot()?;
        Ok(doc
            .records
            .iter()
            .filter(|r| r.identity == identity)
            .cloned()
            .collect())
    }

    async fn all_records(&self) -> AttendanceResult<Vec<AttendanceRecord>> {
        Ok(self.snapshot()?.records.clone())
    }

    async fn set_expected(
        &self,
        identity: &str,
        address: &str,
    ) -> AttendanceResult<ExpectedAddressEntry> {
        let doc = ExpectedAddressDoc {
            expected_address: address.to_string(),
            updated_at: Utc::now(),
        };
        let entry = AttendanceDocument::entry(identity, &doc);
        let key = identity.to_string();
        self.commit(move |document| {
            document.identities.insert(key, doc);
        })
        .await?;
        Ok(entry)
    }

    async fn get_expected(&self, identity: &str) -> AttendanceResult<Option<ExpectedAddressEntry>> {
        let doc = self.snapshot()?;
        Ok(doc
            .identities
            .get(identity)
            .map(|entry| AttendanceDocument::entry(identity, entry)))
    }

    async fn list_expected(&self) -> AttendanceResult<Vec<ExpectedAddressEntry>> {
        let doc = self.snapshot()?;
        Ok(doc
            .identities
            .iter()
            .map(|(identity, entry)| AttendanceDocument::entry(identity, entry))
            .collect())
    }
}
