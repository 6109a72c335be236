// Attendance Library
// Network-location based attendance decisions with dual-store persistence

pub mod address;
pub mod config;
pub mod coordinator;
pub mod decision;
pub mod error;
pub mod history;
pub mod locks;
pub mod registry;
pub mod service;
pub mod storage;
pub mod types;

pub use address::{ClassifiedAddress, ClientAddress};
pub use config::AttendanceConfig;
pub use coordinator::{PersistOutcome, PersistenceCoordinator, Report, ReportSource};
pub use error::{AttendanceError, AttendanceResult};
pub use registry::{AddressSource, EffectiveAddress, ExpectedAddressRegistry};
pub use service::AttendanceService;
pub use types::{
    AttendanceRecord, AttendanceStatus, ExpectedAddressEntry, HistoryRow, ReasonCode, Submission,
    SubmissionOutcome,
};
