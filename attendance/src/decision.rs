//! Attendance decision rules.
//!
//! The rules are evaluated in a fixed order: a private origin always wins,
//! then a missing expectation, then exact-string comparison.

use crate::address::ClassifiedAddress;
use crate::types::{AttendanceStatus, ReasonCode};

/// Decide the reason code for an observed address.
pub fn decide(observed_address: &str, is_private: bool, expected_address: Option<&str>) -> ReasonCode {
    if is_private {
        return ReasonCode::PrivateAddress;
    }
    match expected_address {
        None => ReasonCode::NoExpectedAddressConfigured,
        Some(expected) if observed_address == expected => ReasonCode::AddressMatched,
        Some(_) => ReasonCode::AddressMismatch,
    }
}

/// A classified address together with the decision taken on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub observed_address: String,
    pub expected_address: Option<String>,
    pub is_private: bool,
    pub is_proxied: bool,
    pub reason_code: ReasonCode,
}

impl Evaluation {
    pub fn new(classified: ClassifiedAddress, expected_address: Option<String>) -> Self {
        let reason_code = decide(
            &classified.address,
            classified.is_private,
            expected_address.as_deref(),
        );
        Self {
            observed_address: classified.address,
            expected_address,
            is_private: classified.is_private,
            is_proxied: classified.is_proxied,
            reason_code,
        }
    }

    pub fn status(&self) -> AttendanceStatus {
        self.reason_code.status()
    }
}
