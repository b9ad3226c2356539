//! Canonical entities for the Crewdeck dashboard.
//!
//! These are the strongly-typed shapes the rest of the application works
//! with. Raw remote records (which vary in field naming and enum encoding
//! across historical schema versions) only exist at the normalizer
//! boundary; everything past it uses these types.

mod audit;
mod deliverable;
mod pto;
mod staff;
mod workstream;

pub use audit::AuditLog;
pub use deliverable::{Deliverable, DeliverableStatus, Risk};
pub use pto::{PtoRequest, PtoStatus};
pub use staff::{Staff, StaffTitle, UserRole};
pub use workstream::{assign_colors, palette, Workstream};

/// Generate a prefixed short id (e.g. `stf_1a2b3c4d5e6f`).
///
/// Ids are client-generated so optimistic creates can cache the entity
/// before the remote write confirms.
#[must_use]
pub(crate) fn prefixed_id(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// Current time as Unix milliseconds.
#[must_use]
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
