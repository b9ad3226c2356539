//! Deliverable model.
//!
//! Deliverables carry the two cross-entity references the resolver exists
//! for: `workstream_id` and `owner_id`. Both hold a canonical id when
//! resolution succeeded and the original raw token otherwise — never null.

use serde::{Deserialize, Serialize};

/// Deliverable status.
///
/// Unrecognized input parses to `NotStarted` rather than an "Unknown"
/// bucket. This mirrors how historical data was read and avoids surfacing
/// false alarms, at the cost of masking genuinely unknown states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliverableStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "At Risk")]
    AtRisk,
    Blocked,
    Completed,
}

impl DeliverableStatus {
    /// Display label (also the canonical storage form).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::AtRisk => "At Risk",
            Self::Blocked => "Blocked",
            Self::Completed => "Completed",
        }
    }

    /// Parse numeric codes (0-4), legacy tokens, and display labels.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "1" | "in progress" | "in_progress" | "inprogress" | "on track" | "on_track"
            | "wip" | "active" => Self::InProgress,
            "2" | "at risk" | "at_risk" | "atrisk" => Self::AtRisk,
            "3" | "blocked" | "on hold" | "on_hold" => Self::Blocked,
            "4" | "completed" | "complete" | "done" | "closed" => Self::Completed,
            _ => Self::NotStarted,
        }
    }
}

impl Default for DeliverableStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

/// Risk rating.
///
/// Unrecognized input parses to `Low` — the least-alarming label, same
/// compatibility policy as [`DeliverableStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Risk {
    Low,
    Medium,
    High,
    Critical,
}

impl Risk {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Parse numeric codes (1-4), legacy tokens, and display labels.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "2" | "medium" | "med" | "moderate" => Self::Medium,
            "3" | "high" => Self::High,
            "4" | "critical" | "severe" => Self::Critical,
            _ => Self::Low,
        }
    }
}

impl Default for Risk {
    fn default() -> Self {
        Self::Low
    }
}

/// A deliverable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    /// Unique identifier (prefixed short id, e.g. `dlv_...`)
    pub id: String,

    /// Title
    pub title: String,

    /// Optional description
    pub description: String,

    /// Workstream reference (workstream id once resolved, raw token otherwise)
    pub workstream_id: String,

    /// Owner reference (staff id once resolved, raw token otherwise)
    pub owner_id: String,

    /// Current status
    pub status: DeliverableStatus,

    /// Free-form priority label (never normalized; historical data is too
    /// inconsistent to enumerate)
    pub priority: String,

    /// Risk rating
    pub risk: Risk,

    /// Start date (date-only ISO string)
    pub start_date: Option<String>,

    /// Due date (date-only ISO string)
    pub due_date: Option<String>,

    /// Review date, if the deliverable reached review
    pub review_date: Option<String>,

    /// Testing date, if the deliverable reached testing
    pub testing_date: Option<String>,

    /// Completion date, if completed
    pub completed_date: Option<String>,

    /// Percent complete, 0-100
    pub progress: u8,

    /// Ids of deliverables this one depends on
    pub dependencies: Vec<String>,

    /// Free-form comment
    pub comment: String,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Deliverable {
    /// Create a new deliverable with a client-generated id.
    #[must_use]
    pub fn new(title: &str, workstream_id: &str, owner_id: &str) -> Self {
        let now = super::now_millis();
        Self {
            id: super::prefixed_id("dlv"),
            title: title.to_string(),
            description: String::new(),
            workstream_id: workstream_id.to_string(),
            owner_id: owner_id.to_string(),
            status: DeliverableStatus::default(),
            priority: String::new(),
            risk: Risk::default(),
            start_date: None,
            due_date: None,
            review_date: None,
            testing_date: None,
            completed_date: None,
            progress: 0,
            dependencies: Vec::new(),
            comment: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
