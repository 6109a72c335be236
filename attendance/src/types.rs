//! Core attendance types
//!
//! `AttendanceRecord` is the full-fidelity decision outcome kept by the
//! document store. `HistoryRow` is the six-field projection kept by the
//! tabular store and returned by reports.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::address::ClientAddress;

/// Calendar date format used in the tabular `date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Time-of-day format used in the tabular `time` column.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Outcome of an attendance decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            other => Err(format!("Unknown attendance status '{}'", other)),
        }
    }
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    AddressMatched,
    AddressMismatch,
    PrivateAddress,
    NoExpectedAddressConfigured,
}

impl ReasonCode {
    /// Only `AddressMatched` yields `Present`.
    pub fn status(&self) -> AttendanceStatus {
        match self {
            ReasonCode::AddressMatched => AttendanceStatus::Present,
            ReasonCode::AddressMismatch
            | ReasonCode::PrivateAddress
            | ReasonCode::NoExpectedAddressConfigured => AttendanceStatus::Absent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::AddressMatched => "AddressMatched",
            ReasonCode::AddressMismatch => "AddressMismatch",
            ReasonCode::PrivateAddress => "PrivateAddress",
            ReasonCode::NoExpectedAddressConfigured => "NoExpectedAddressConfigured",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decision outcome. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub identity: String,
    pub display_name: String,
    pub observed_address: String,
    #[serde(default)]
    pub expected_address: Option<String>,
    pub is_private_address: bool,
    pub is_proxied: bool,
    pub status: AttendanceStatus,
    pub reason_code: ReasonCode,
    pub timestamp: DateTime<Utc>,
}

impl AttendanceRecord {
    /// The status is always derived from the reason code.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: impl Into<String>,
        display_name: impl Into<String>,
        observed_address: impl Into<String>,
        expected_address: Option<String>,
        is_private_address: bool,
        is_proxied: bool,
        reason_code: ReasonCode,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: identity.into(),
            display_name: display_name.into(),
            observed_address: observed_address.into(),
            expected_address,
            is_private_address,
            is_proxied,
            status: reason_code.status(),
            reason_code,
            timestamp,
        }
    }

    pub fn date_field(&self) -> String {
        self.timestamp.format(DATE_FORMAT).to_string()
    }

    pub fn time_field(&self) -> String {
        self.timestamp.format(TIME_FORMAT).to_string()
    }

    /// Project onto the six-field tabular schema.
    pub fn to_history_row(&self) -> HistoryRow {
        HistoryRow {
            identity: self.identity.clone(),
            display_name: self.display_name.clone(),
            date: self.date_field(),
            time: self.time_field(),
            observed_address: self.observed_address.clone(),
            status: self.status,
        }
    }
}

/// Six-field report row: identity, displayName, date, time, address, status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    pub identity: String,
    pub display_name: String,
    pub date: String,
    pub time: String,
    #[serde(rename = "address")]
    pub observed_address: String,
    pub status: AttendanceStatus,
}

impl HistoryRow {
    pub fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }

    /// Reassemble the UTC instant from the split date and time fields.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let date = self.day()?;
        let time = NaiveTime::parse_from_str(&self.time, TIME_FORMAT).ok()?;
        Some(NaiveDateTime::new(date, time).and_utc())
    }
}

/// Admin-configured expected address for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedAddressEntry {
    pub identity: String,
    pub expected_address: String,
    pub updated_at: DateTime<Utc>,
}

/// An attendance submission as handed over by the routing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub identity: String,
    pub display_name: String,
    pub address: ClientAddress,
}

impl Submission {
    pub fn new(
        identity: impl Into<String>,
        display_name: impl Into<String>,
        address: ClientAddress,
    ) -> Self {
        Self {
            identity: identity.into(),
            display_name: display_name.into(),
            address,
        }
    }
}

/// Result of a submission returned to the caller.
///
/// When `already_marked` is set, no record was written and `timestamp` is the
/// timestamp of the existing `Present` record for the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub status: AttendanceStatus,
    pub reason_code: ReasonCode,
    pub observed_address: String,
    pub expected_address: Option<String>,
    pub is_private: bool,
    pub is_proxied: bool,
    pub already_marked: bool,
    pub degraded: bool,
    pub timestamp: DateTime<Utc>,
}

/// Current instant truncated to whole seconds, so the time column holds it exactly.
pub fn decision_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
