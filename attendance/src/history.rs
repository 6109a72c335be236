//! At-most-one-Present-per-day guard.
//!
//! Only a newly computed `Present` outcome can be suppressed. `Absent`
//! outcomes are always written, so repeated unsuccessful attempts remain
//! visible in the history.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::info;

use crate::coordinator::{PersistenceCoordinator, ReportSource};
use crate::error::AttendanceResult;
use crate::types::{AttendanceStatus, HistoryRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    Proceed,
    /// A `Present` record already exists for the day; carries its timestamp.
    AlreadyMarked(DateTime<Utc>),
}

/// Timestamp of the first `Present` row for `identity` on `day`, in file order.
pub fn existing_presence(rows: &[HistoryRow], identity: &str, day: NaiveDate) -> Option<DateTime<Utc>> {
    rows.iter()
        .filter(|row| row.identity == identity && row.status == AttendanceStatus::Present)
        .find(|row| row.day() == Some(day))
        .map(|row| {
            row.timestamp()
                .unwrap_or_else(|| day.and_time(NaiveTime::MIN).and_utc())
        })
}

/// Check a newly computed outcome against the identity's history.
///
/// Callers must hold the identity's lock from this check until the write completes.
pub async fn check(
    coordinator: &PersistenceCoordinator,
    identity: &str,
    status: AttendanceStatus,
    now: DateTime<Utc>,
) -> AttendanceResult<GuardVerdict> {
    if status != AttendanceStatus::Present {
        return Ok(GuardVerdict::Proceed);
    }
    let day = now.date_naive();
    let history = coordinator.history_for(identity).await?;
    let mut found = existing_presence(&history.rows, identity, day);
    if found.is_none() && history.source == ReportSource::Tabular {
        // A Present written in degraded mode exists only in the document store.
        let documents = coordinator.document_history(identity).await?;
        found = existing_presence(&documents, identity, day);
    }
    match found {
        Some(timestamp) => {
            info!(identity, marked_at = %timestamp, "presence already recorded today, suppressing write");
            Ok(GuardVerdict::AlreadyMarked(timestamp))
        }
        None => Ok(GuardVerdict::Proceed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttendanceError;
    use crate::storage::{InMemoryDocumentStore, SchemaState, TabularStore};
    use crate::types::{AttendanceRecord, ReasonCode};
    use async_trait::async_trait;
    use chrono::{Duration, SubsecRound};
    use std::sync::Arc;

    /// Tabular store holding fixed rows and rejecting every append.
    struct ReadOnlyTabular {
        rows: Vec<HistoryRow>,
    }

    #[async_trait]
    impl TabularStore for ReadOnlyTabular {
        async fn schema_state(&self) -> AttendanceResult<SchemaState> {
            Ok(SchemaState::Valid)
        }

        async fn append(&self, _record: &AttendanceRecord) -> AttendanceResult<()> {
            Err(AttendanceError::TabularStoreWrite("read-only".into()))
        }

        async fn read_all(&self) -> AttendanceResult<Vec<HistoryRow>> {
            Ok(self.rows.clone())
        }
    }

    fn row(identity: &str, date: &str, time: &str, status: AttendanceStatus) -> HistoryRow {
        HistoryRow {
            identity: identity.into(),
            display_name: "Grace".into(),
            date: date.into(),
            time: time.into(),
            observed_address: "203.0.113.9".into(),
            status,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_finds_first_present_of_the_day() {
        let rows = vec![
            row("U002", "2024-05-13", "09:00:00", AttendanceStatus::Present),
            row("U002", "2024-05-14", "08:00:00", AttendanceStatus::Absent),
            row("U002", "2024-05-14", "09:15:00", AttendanceStatus::Present),
            row("U002", "2024-05-14", "10:00:00", AttendanceStatus::Present),
        ];
        let found = existing_presence(&rows, "U002", day("2024-05-14")).unwrap();
        assert_eq!(found.to_rfc3339(), "2024-05-14T09:15:00+00:00");
    }

    #[test]
    fn test_absent_rows_and_other_identities_do_not_count() {
        let rows = vec![
            row("U002", "2024-05-14", "08:00:00", AttendanceStatus::Absent),
            row("U003", "2024-05-14", "09:00:00", AttendanceStatus::Present),
        ];
        assert_eq!(existing_presence(&rows, "U002", day("2024-05-14")), None);
    }

    #[tokio::test]
    async fn test_degraded_presence_is_seen_when_tabular_is_not_behind() {
        let now = Utc::now().trunc_subsecs(0);
        let yesterday = AttendanceRecord::new(
            "U002",
            "Grace",
            "203.0.113.9",
            Some("203.0.113.9".into()),
            false,
            false,
            ReasonCode::AddressMatched,
            now - Duration::days(1),
        );
        // The tabular store holds a row the document store never received.
        let tabular = Arc::new(ReadOnlyTabular {
            rows: vec![yesterday.to_history_row()],
        });
        let coordinator =
            PersistenceCoordinator::new(tabular, Arc::new(InMemoryDocumentStore::new()));

        let today = AttendanceRecord::new(
            "U002",
            "Grace",
            "203.0.113.9",
            Some("203.0.113.9".into()),
            false,
            false,
            ReasonCode::AddressMatched,
            now,
        );
        let persisted = coordinator.persist(today).await.unwrap();
        assert!(persisted.degraded);

        let verdict = check(&coordinator, "U002", AttendanceStatus::Present, now)
            .await
            .unwrap();
        assert_eq!(verdict, GuardVerdict::AlreadyMarked(now));
    }

    #[test]
    fn test_unparsable_time_still_counts_for_the_day() {
        let rows = vec![row("U002", "2024-05-14", "morning", AttendanceStatus::Present)];
        let found = existing_presence(&rows, "U002", day("2024-05-14")).unwrap();
        assert_eq!(found.to_rfc3339(), "2024-05-14T00:00:00+00:00");
    }
}
