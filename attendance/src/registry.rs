//! Expected-address registry.
//!
//! Per-identity expected addresses live in the document store. Lookups fall
//! back to a single process-wide default when no entry exists. Addresses are
//! not validated beyond being non-empty.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{AttendanceError, AttendanceResult};
use crate::storage::DocumentStore;
use crate::types::ExpectedAddressEntry;

/// Where an effective expected address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressSource {
    Identity,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveAddress {
    pub expected_address: String,
    pub source: AddressSource,
}

pub struct ExpectedAddressRegistry {
    store: Arc<dyn DocumentStore>,
    default_address: Option<String>,
}

impl ExpectedAddressRegistry {
    /// A blank default is treated as no default.
    pub fn new(store: Arc<dyn DocumentStore>, default_address: Option<String>) -> Self {
        let default_address = default_address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        Self {
            store,
            default_address,
        }
    }

    pub fn default_address(&self) -> Option<&str> {
        self.default_address.as_deref()
    }

    pub async fn get(&self, identity: &str) -> AttendanceResult<Option<String>> {
        Ok(self
            .effective(identity)
            .await?
            .map(|effective| effective.expected_address))
    }

    pub async fn effective(&self, identity: &str) -> AttendanceResult<Option<EffectiveAddress>> {
        if let Some(entry) = self.store.get_expected(identity).await? {
            return Ok(Some(EffectiveAddress {
                expected_address: entry.expected_address,
                source: AddressSource::Identity,
            }));
        }
        Ok(self.default_address.clone().map(|expected_address| EffectiveAddress {
            expected_address,
            source: AddressSource::Default,
        }))
    }

    /// Overwrites any previous entry for the identity.
    pub async fn set(&self, identity: &str, address: &str) -> AttendanceResult<ExpectedAddressEntry> {
        let identity = identity.trim();
        let address = address.trim();
        if identity.is_empty() {
            return Err(AttendanceError::Validation("identity is required".to_string()));
        }
        if address.is_empty() {
            return Err(AttendanceError::Validation(
                "expected address is required".to_string(),
            ));
        }
        let entry = self.store.set_expected(identity, address).await?;
        info!(identity = %entry.identity, expected = %entry.expected_address, "expected address updated");
        Ok(entry)
    }

    pub async fn list(&self) -> AttendanceResult<Vec<ExpectedAddressEntry>> {
        let mut entries = self.store.list_expected().await?;
        entries.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDocumentStore;

    fn registry(default_address: Option<&str>) -> ExpectedAddressRegistry {
        ExpectedAddressRegistry::new(
            Arc::new(InMemoryDocumentStore::new()),
            default_address.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_falls_back_to_default() {
        let registry = registry(Some("198.51.100.1"));
        assert_eq!(
            registry.effective("U009").await.unwrap(),
            Some(EffectiveAddress {
                expected_address: "198.51.100.1".into(),
                source: AddressSource::Default,
            })
        );

        registry.set("U009", "203.0.113.9").await.unwrap();
        let effective = registry.effective("U009").await.unwrap().unwrap();
        assert_eq!(effective.expected_address, "203.0.113.9");
        assert_eq!(effective.source, AddressSource::Identity);
    }

    #[tokio::test]
    async fn test_no_entry_and_no_default() {
        let registry = registry(Some("   "));
        assert_eq!(registry.default_address(), None);
        assert_eq!(registry.get("U001").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_rejects_blank_values() {
        let registry = registry(None);
        assert!(matches!(
            registry.set("", "203.0.113.9").await,
            Err(AttendanceError::Validation(_))
        ));
        assert!(matches!(
            registry.set("U001", " ").await,
            Err(AttendanceError::Validation(_))
        ));
        // Any non-empty string is accepted.
        registry.set("U001", "not-an-address").await.unwrap();
        assert_eq!(
            registry.get("U001").await.unwrap().as_deref(),
            Some("not-an-address")
        );
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let registry = registry(None);
        registry.set("U003", "203.0.113.3").await.unwrap();
        registry.set("U001", "203.0.113.1").await.unwrap();
        let identities: Vec<String> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.identity)
            .collect();
        assert_eq!(identities, vec!["U001", "U003"]);
    }
}
