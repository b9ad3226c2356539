//! Sync orchestration.
//!
//! One sync pass pulls every remote collection in dependency order,
//! normalizes and resolves the records, and publishes them into the local
//! cache. Connectivity is tracked on a status surface with its own
//! broadcast channel, separate from the store's data-changed channel.

mod engine;

pub use engine::SyncEngine;

use serde::Serialize;

/// Connectivity state machine.
///
/// `Disconnected -> Connecting -> Connected` on success, or
/// `Connecting -> Error` on failure. `Error` retains the last successful
/// sync timestamp if one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// The status surface exposed to external collaborators, refreshed on
/// every orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    /// Current state-machine position.
    pub state: ConnectionState,
    /// Convenience flag: `state == Connected`.
    pub connected: bool,
    /// When the last successful sync pass finished (Unix milliseconds).
    pub last_sync: Option<i64>,
    /// Failure description from the most recent pass, if any.
    pub error: Option<String>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            connected: false,
            last_sync: None,
            error: None,
        }
    }
}

/// What one sync pass pulled and what failed.
///
/// Per-collection failures do not abort the pass; they are recorded here
/// and summarized on the status surface.
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    /// (table name, record count) per successfully pulled collection.
    pub pulled: Vec<(&'static str, usize)>,
    /// (table name, error) per failed pull.
    pub failures: Vec<(&'static str, String)>,
}

impl SyncReport {
    /// Whether at least one collection pulled successfully.
    #[must_use]
    pub fn any_success(&self) -> bool {
        !self.pulled.is_empty()
    }

    /// One-line summary of the failures, or `None` if there were none.
    #[must_use]
    pub fn failure_summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .failures
            .iter()
            .map(|(table, err)| format!("{table}: {err}"))
            .collect();
        Some(parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_disconnected() {
        let status = SyncStatus::default();
        assert_eq!(status.state, ConnectionState::Disconnected);
        assert!(!status.connected);
        assert!(status.last_sync.is_none());
    }

    #[test]
    fn test_failure_summary() {
        let mut report = SyncReport::default();
        assert_eq!(report.failure_summary(), None);

        report.failures.push(("Staff", "timeout".to_string()));
        report.failures.push(("Deliverables", "503".to_string()));
        assert_eq!(
            report.failure_summary().unwrap(),
            "Staff: timeout; Deliverables: 503"
        );
    }
}
