//! Audit log model.
//!
//! Audit entries record who changed what. They are append-only: the crate
//! exposes no update or delete path for them, and the sync pass never
//! rewrites an existing entry's fields.

use serde::{Deserialize, Serialize};

/// An audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    /// Unique identifier (prefixed short id, e.g. `log_...`)
    pub id: String,

    /// Acting user's id
    pub user_id: String,

    /// Acting user's display name at the time of the action
    pub user_name: String,

    /// Action verb (e.g. "update", "create", "delete")
    pub action: String,

    /// Entity type acted on (collection key, e.g. "deliverables")
    pub entity_type: String,

    /// Id of the entity acted on, when there is one
    pub entity_id: Option<String>,

    /// Free-form details (e.g. "status: In Progress -> Completed")
    pub details: String,

    /// When the action happened (Unix milliseconds)
    pub timestamp: i64,
}

impl AuditLog {
    /// Create a new entry stamped with the current time.
    #[must_use]
    pub fn new(user_id: &str, user_name: &str, action: &str, entity_type: &str) -> Self {
        Self {
            id: super::prefixed_id("log"),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: None,
            details: String::new(),
            timestamp: super::now_millis(),
        }
    }

    /// Attach the id of the entity acted on.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: &str) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    /// Attach free-form details.
    #[must_use]
    pub fn with_details(mut self, details: &str) -> Self {
        self.details = details.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_audit_entry() {
        let entry = AuditLog::new("stf_1", "Ann Lee", "update", "deliverables")
            .with_entity_id("dlv_9")
            .with_details("progress: 40 -> 60");

        assert!(entry.id.starts_with("log_"));
        assert_eq!(entry.entity_id.as_deref(), Some("dlv_9"));
        assert!(entry.timestamp > 0);
    }
}
