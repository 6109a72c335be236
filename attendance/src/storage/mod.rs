//! Storage adapters for attendance records.
//!
//! Two independent stores are kept:
//! - a tabular store holding the six-field report schema, human-inspectable
//! - a document store holding full-fidelity records and the expected-address
//!   map, used as the authoritative fallback
//!
//! Handles are passed explicitly to the persistence coordinator; there is no
//! process-wide store singleton.

pub mod document_file;
pub mod document_memory;
pub mod tabular_file;

pub use document_file::JsonDocumentStore;
pub use document_memory::InMemoryDocumentStore;
pub use tabular_file::CsvTabularStore;

use async_trait::async_trait;

use crate::error::AttendanceResult;
use crate::types::{AttendanceRecord, ExpectedAddressEntry, HistoryRow};

/// Column names of the tabular schema, in declared order.
pub const TABULAR_HEADER: [&str; 6] = [
    "identity",
    "displayName",
    "date",
    "time",
    "address",
    "status",
];

/// Result of inspecting the tabular store's backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Header row present and matching the schema.
    Valid,
    /// File absent or empty; the next write creates it.
    Missing,
    /// File present but its header does not match the schema.
    Malformed,
}

/// Append-only tabular record store.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Inspect the backing file without modifying it.
    async fn schema_state(&self) -> AttendanceResult<SchemaState>;

    /// Append exactly one data row, creating the header first when missing.
    async fn append(&self, record: &AttendanceRecord) -> AttendanceResult<()>;

    /// All data rows in file order. A missing store reads as empty.
    async fn read_all(&self) -> AttendanceResult<Vec<HistoryRow>>;
}

/// Append-only document store with an expected-address map.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn append(&self, record: &AttendanceRecord) -> AttendanceResult<()>;

    async fn all_for_identity(&self, identity: &str) -> AttendanceResult<Vec<AttendanceRecord>>;

    async fn all_records(&self) -> AttendanceResult<Vec<AttendanceRecord>>;

    /// Last-write-wins.
    async fn set_expected(
        &self,
        identity: &str,
        address: &str,
    ) -> AttendanceResult<ExpectedAddressEntry>;

    async fn get_expected(&self, identity: &str) -> AttendanceResult<Option<ExpectedAddressEntry>>;

    /// Entries sorted by identity.
    async fn list_expected(&self) -> AttendanceResult<Vec<ExpectedAddressEntry>>;
}
