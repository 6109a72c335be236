//! Persistence coordinator.
//!
//! Owns write sequencing across the two stores:
//! 1. tabular append; a failure only marks the write as degraded
//! 2. document append, always attempted; a failure fails the submission
//!
//! Reads prefer the tabular store and fall back to records re-derived from
//! the document store when the tabular store is unreadable or holds fewer
//! rows than the document store.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::error::{AttendanceError, AttendanceResult};
use crate::storage::{DocumentStore, TabularStore};
use crate::types::{AttendanceRecord, HistoryRow};

/// Record written by the coordinator plus whether the tabular write was lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub record: AttendanceRecord,
    pub degraded: bool,
}

/// Which store served a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportSource {
    Tabular,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub source: ReportSource,
    pub rows: Vec<HistoryRow>,
}

pub struct PersistenceCoordinator {
    tabular: Arc<dyn TabularStore>,
    document: Arc<dyn DocumentStore>,
}

impl PersistenceCoordinator {
    pub fn new(tabular: Arc<dyn TabularStore>, document: Arc<dyn DocumentStore>) -> Self {
        Self { tabular, document }
    }

    pub async fn persist(&self, record: AttendanceRecord) -> AttendanceResult<PersistOutcome> {
        let degraded = match self.tabular.append(&record).await {
            Ok(()) => false,
            Err(e) => {
                warn!(identity = %record.identity, error = %e, "tabular store write failed, continuing in degraded mode");
                true
            }
        };

        if let Err(e) = self.document.append(&record).await {
            error!(identity = %record.identity, error = %e, "document store write failed");
            return Err(match e {
                AttendanceError::DocumentStore(_) => e,
                other => AttendanceError::DocumentStore(other.to_string()),
            });
        }

        debug!(identity = %record.identity, status = %record.status, degraded, "record persisted");
        Ok(PersistOutcome { record, degraded })
    }

    /// Every record as report rows, in store order.
    pub async fn read_all(&self) -> AttendanceResult<Report> {
        let documents = self.document.all_records().await?;
        Ok(self.select(None, documents).await)
    }

    /// Report rows for one identity, in store order.
    pub async fn history_for(&self, identity: &str) -> AttendanceResult<Report> {
        let documents = self.document.all_for_identity(identity).await?;
        Ok(self.select(Some(identity), documents).await)
    }

    /// Rows for one identity re-derived from the document store alone.
    pub async fn document_history(&self, identity: &str) -> AttendanceResult<Vec<HistoryRow>> {
        Ok(self
            .document
            .all_for_identity(identity)
            .await?
            .iter()
            .map(AttendanceRecord::to_history_row)
            .collect())
    }

    async fn select(&self, identity: Option<&str>, documents: Vec<AttendanceRecord>) -> Report {
        match self.tabular.read_all().await {
            Ok(mut rows) => {
                if let Some(identity) = identity {
                    rows.retain(|row| row.identity == identity);
                }
                if rows.len() >= documents.len() {
                    return Report {
                        source: ReportSource::Tabular,
                        rows,
                    };
                }
                warn!(
                    tabular_rows = rows.len(),
                    document_records = documents.len(),
                    "tabular store is behind the document store, reading from document store"
                );
            }
            Err(e) => {
                warn!(error = %e, "tabular store unreadable, reading from document store");
            }
        }
        Report {
            source: ReportSource::Document,
            rows: documents.iter().map(AttendanceRecord::to_history_row).collect(),
        }
    }
}
