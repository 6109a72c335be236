//! Attendance service - the surface consumed by a routing layer.
//!
//! A submission flows through:
//! 1. input validation (no I/O)
//! 2. address classification (no I/O)
//! 3. expected-address lookup and decision
//! 4. under the identity lock: history guard, then persistence

use std::sync::Arc;
use tracing::{debug, info};

use crate::address::classify;
use crate::config::AttendanceConfig;
use crate::coordinator::{PersistenceCoordinator, Report};
use crate::decision::Evaluation;
use crate::error::{AttendanceError, AttendanceResult};
use crate::history::{self, GuardVerdict};
use crate::locks::IdentityLocks;
use crate::registry::{EffectiveAddress, ExpectedAddressRegistry};
use crate::storage::{CsvTabularStore, DocumentStore, JsonDocumentStore, TabularStore};
use crate::types::{
    decision_timestamp, AttendanceRecord, ExpectedAddressEntry, HistoryRow, Submission,
    SubmissionOutcome,
};

pub struct AttendanceService {
    registry: ExpectedAddressRegistry,
    coordinator: PersistenceCoordinator,
    locks: IdentityLocks,
}

impl AttendanceService {
    pub fn new(
        tabular: Arc<dyn TabularStore>,
        document: Arc<dyn DocumentStore>,
        default_expected_address: Option<String>,
    ) -> Self {
        Self {
            registry: ExpectedAddressRegistry::new(Arc::clone(&document), default_expected_address),
            coordinator: PersistenceCoordinator::new(tabular, document),
            locks: IdentityLocks::new(),
        }
    }

    /// Open the file-backed stores described by `config`.
    pub fn open(config: &AttendanceConfig) -> AttendanceResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            AttendanceError::Config(format!(
                "Failed to create data directory {:?}: {}",
                config.data_dir, e
            ))
        })?;
        let tabular = Arc::new(CsvTabularStore::new(config.tabular_path()));
        let document = Arc::new(JsonDocumentStore::open(config.document_path()));
        info!(
            tabular = %config.tabular_path().display(),
            document = %config.document_path().display(),
            "attendance stores opened"
        );
        Ok(Self::new(
            tabular,
            document,
            config.default_expected().map(str::to_string),
        ))
    }

    pub fn registry(&self) -> &ExpectedAddressRegistry {
        &self.registry
    }

    /// Decide and record one attendance submission.
    pub async fn submit(&self, submission: Submission) -> AttendanceResult<SubmissionOutcome> {
        let identity = submission.identity.trim();
        let display_name = submission.display_name.trim();
        if identity.is_empty() {
            return Err(AttendanceError::Validation("identity is required".to_string()));
        }
        if display_name.is_empty() {
            return Err(AttendanceError::Validation(
                "displayName is required".to_string(),
            ));
        }
        let classified = classify(&submission.address)?;

        let expected = self.registry.get(identity).await?;
        let evaluation = Evaluation::new(classified, expected);
        debug!(
            identity,
            observed = %evaluation.observed_address,
            reason = %evaluation.reason_code,
            "submission evaluated"
        );

        let _guard = self.locks.lock(identity).await;
        let now = decision_timestamp();
        if let GuardVerdict::AlreadyMarked(marked_at) =
            history::check(&self.coordinator, identity, evaluation.status(), now).await?
        {
            return Ok(Self::outcome(&evaluation, true, false, marked_at));
        }

        let record = AttendanceRecord::new(
            identity,
            display_name,
            evaluation.observed_address.clone(),
            evaluation.expected_address.clone(),
            evaluation.is_private,
            evaluation.is_proxied,
            evaluation.reason_code,
            now,
        );
        let persisted = self.coordinator.persist(record).await?;
        info!(
            identity,
            status = %persisted.record.status,
            reason = %persisted.record.reason_code,
            degraded = persisted.degraded,
            "attendance recorded"
        );
        Ok(Self::outcome(
            &evaluation,
            false,
            persisted.degraded,
            persisted.record.timestamp,
        ))
    }

    fn outcome(
        evaluation: &Evaluation,
        already_marked: bool,
        degraded: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> SubmissionOutcome {
        SubmissionOutcome {
            status: evaluation.status(),
            reason_code: evaluation.reason_code,
            observed_address: evaluation.observed_address.clone(),
            expected_address: evaluation.expected_address.clone(),
            is_private: evaluation.is_private,
            is_proxied: evaluation.is_proxied,
            already_marked,
            degraded,
            timestamp,
        }
    }

    /// Authorization is the caller's responsibility.
    pub async fn set_expected(
        &self,
        identity: &str,
        address: &str,
    ) -> AttendanceResult<ExpectedAddressEntry> {
        self.registry.set(identity, address).await
    }

    pub async fn expected_for(&self, identity: &str) -> AttendanceResult<Option<EffectiveAddress>> {
        self.registry.effective(identity).await
    }

    pub async fn list_expected(&self) -> AttendanceResult<Vec<ExpectedAddressEntry>> {
        self.registry.list().await
    }

    /// Every record in store order; not re-sorted.
    pub async fn report(&self) -> AttendanceResult<Report> {
        self.coordinator.read_all().await
    }

    pub async fn history_for(&self, identity: &str) -> AttendanceResult<Vec<HistoryRow>> {
        Ok(self.coordinator.history_for(identity.trim()).await?.rows)
    }
}
