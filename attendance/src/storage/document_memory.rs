//! In-memory document store
//!
//! Simple in-memory storage for testing and ephemeral use cases.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::DocumentStore;
use crate::error::{AttendanceError, AttendanceResult};
use crate::types::{AttendanceRecord, ExpectedAddressEntry};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    identities: RwLock<BTreeMap<String, ExpectedAddressEntry>>,
    records: RwLock<Vec<AttendanceRecord>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> AttendanceError {
    AttendanceError::DocumentStore("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn append(&self, record: &AttendanceRecord) -> AttendanceResult<()> {
        self.records
            .write()
            .map_err(|_| poisoned())?
            .push(record.clone());
        Ok(())
    }

    async fn all_for_identity(&self, identity: &str) -> AttendanceResult<Vec<AttendanceRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .iter()
            .filter(|r| r.identity == identity)
            .cloned()
            .collect())
    }

    async fn all_records(&self) -> AttendanceResult<Vec<AttendanceRecord>> {
        Ok(self.records.read().map_err(|_| poisoned())?.clone())
    }

    async fn set_expected(
        &self,
        identity: &str,
        address: &str,
    ) -> AttendanceResult<ExpectedAddressEntry> {
        let entry = ExpectedAddressEntry {
            identity: identity.to_string(),
            expected_address: address.to_string(),
            updated_at: Utc::now(),
        };
        self.identities
            .write()
            .map_err(|_| poisoned())?
            .insert(identity.to_string(), entry.clone());
        Ok(entry)
    }

    async fn get_expected(&self, identity: &str) -> AttendanceResult<Option<ExpectedAddressEntry>> {
        Ok(self
            .identities
            .read()
            .map_err(|_| poisoned())?
            .get(identity)
            .cloned())
    }

    async fn list_expected(&self) -> AttendanceResult<Vec<ExpectedAddressEntry>> {
        Ok(self
            .identities
            .read()
            .map_err(|_| poisoned())?
            .values()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{decision_timestamp, ReasonCode};

    #[tokio::test]
    async fn test_append_and_filter_by_identity() {
        let storage = InMemoryDocumentStore::new();
        for identity in ["U001", "U002", "U001"] {
            let record = AttendanceRecord::new(
                identity,
                "Someone",
                "10.0.0.5",
                None,
                true,
                false,
                ReasonCode::PrivateAddress,
                decision_timestamp(),
            );
            storage.append(&record).await.unwrap();
        }

        assert_eq!(storage.all_records().await.unwrap().len(), 3);
        assert_eq!(storage.all_for_identity("U001").await.unwrap().len(), 2);
        assert!(storage.all_for_identity("U003").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expected_overwrite() {
        let storage = InMemoryDocumentStore::new();
        storage.set_expected("U002", "203.0.113.1").await.unwrap();
        storage.set_expected("U002", "203.0.113.9").await.unwrap();

        let entry = storage.get_expected("U002").await.unwrap().unwrap();
        assert_eq!(entry.expected_address, "203.0.113.9");
        assert_eq!(storage.list_expected().await.unwrap().len(), 1);
    }
}
