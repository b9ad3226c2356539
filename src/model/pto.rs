//! PTO request model.

use serde::{Deserialize, Serialize};

/// PTO request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PtoStatus {
    Pending,
    Approved,
    Rejected,
}

impl PtoStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    /// Parse any historical representation; unrecognized input maps to
    /// `Pending`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "1" | "approved" | "approve" => Self::Approved,
            "2" | "rejected" | "denied" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

impl Default for PtoStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A paid-time-off request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PtoRequest {
    /// Unique identifier (prefixed short id, e.g. `pto_...`)
    pub id: String,

    /// Requesting staff reference (staff id once resolved, raw otherwise)
    pub staff_id: String,

    /// First day off (date-only ISO string)
    pub start_date: Option<String>,

    /// Last day off (date-only ISO string)
    pub end_date: Option<String>,

    /// Request type (vacation, sick, ...) — free-form label
    pub pto_type: String,

    /// Approval status
    pub status: PtoStatus,

    /// Free-form notes
    pub notes: String,

    /// Approver reference, if approved
    pub approved_by: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl PtoRequest {
    /// Create a new pending request with a client-generated id.
    #[must_use]
    pub fn new(staff_id: &str) -> Self {
        Self {
            id: super::prefixed_id("pto"),
            staff_id: staff_id.to_string(),
            start_date: None,
            end_date: None,
            pto_type: String::new(),
            status: PtoStatus::Pending,
            notes: String::new(),
            approved_by: None,
            created_at: super::now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(PtoStatus::parse("approved"), PtoStatus::Approved);
        assert_eq!(PtoStatus::parse("denied"), PtoStatus::Rejected);
        assert_eq!(PtoStatus::parse("whatever"), PtoStatus::Pending);
    }

    #[test]
    fn test_new_request_is_pending() {
        let req = PtoRequest::new("stf_abc");
        assert!(req.id.starts_with("pto_"));
        assert_eq!(req.status, PtoStatus::Pending);
        assert!(req.approved_by.is_none());
    }
}
