//! Reference resolution.
//!
//! Cross-entity references arrive in whatever shape the record's vintage
//! used: a canonical id, an email address, a display name, or a structured
//! lookup object. A directory built from the cached entities turns any of
//! those into a stable local id. Misses keep the original token — dropping
//! a value the UI needs to display is worse than showing an unresolved
//! one — but are tagged so callers can surface a warning.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::model::{Staff, Workstream};
use crate::normalize::{fallback, RawRecord};

/// Outcome of resolving a reference value.
///
/// Both arms carry a string and both are displayed by the UI; the tag only
/// records whether the string is a canonical id or the original raw token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A canonical entity id (or the empty string for an absent reference).
    Resolved(String),
    /// The original raw token; no known entity matched.
    Unresolved(String),
}

impl Resolution {
    /// Collapse to the reference string, resolved or not. This is the
    /// never-drop contract: every input produces an output string.
    #[must_use]
    pub fn into_id(self) -> String {
        match self {
            Self::Resolved(id) | Self::Unresolved(id) => id,
        }
    }

    /// Whether resolution found a known entity (absent references count as
    /// resolved — they are definite, just empty).
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Normalize a display name for matching: lowercase, parenthetical
/// suffixes such as "(Contractor)" stripped, whitespace collapsed.
#[must_use]
pub fn normalize_person_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0u32;
    for c in name.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn email_from_lookup(obj: &RawRecord) -> Option<String> {
    let value = fallback(obj, &["email", "Email", "lookupEmail", "value"])?;
    match value {
        Value::String(s) if s.contains('@') => Some(s.trim().to_lowercase()),
        _ => None,
    }
}

/// Lookup maps over the staff collection.
#[derive(Debug, Default)]
pub struct StaffDirectory {
    ids: HashSet<String>,
    by_email: HashMap<String, String>,
    by_name: HashMap<String, String>,
}

impl StaffDirectory {
    /// Build the id / email / normalized-name maps from a staff snapshot.
    #[must_use]
    pub fn new(staff: &[Staff]) -> Self {
        let mut dir = Self::default();
        for member in staff {
            dir.ids.insert(member.id.clone());
            let email = member.email.trim().to_lowercase();
            if !email.is_empty() {
                dir.by_email.insert(email, member.id.clone());
            }
            let name = normalize_person_name(&member.name);
            if !name.is_empty() {
                dir.by_name.insert(name, member.id.clone());
            }
        }
        dir
    }

    /// Resolve a reference value of unknown shape.
    ///
    /// Absent/null input resolves to the empty string. Structured lookup
    /// objects are matched by their email field; raw strings are tried as
    /// id, then email, then normalized display name. Total and idempotent:
    /// an already-resolved id matches the id set and comes back unchanged.
    #[must_use]
    pub fn resolve_value(&self, value: Option<&Value>) -> Resolution {
        match value {
            None | Some(Value::Null) => Resolution::Resolved(String::new()),
            Some(Value::Object(obj)) => {
                if let Some(email) = email_from_lookup(obj) {
                    if let Some(id) = self.by_email.get(&email) {
                        return Resolution::Resolved(id.clone());
                    }
                }
                // Fall back to whatever token the object reduces to.
                self.resolve_str(&crate::normalize::raw_reference(value))
            }
            Some(other) => self.resolve_str(&crate::normalize::coerce_string(Some(other))),
        }
    }

    /// Resolve a raw string reference.
    #[must_use]
    pub fn resolve_str(&self, raw: &str) -> Resolution {
        let raw = raw.trim();
        if raw.is_empty() {
            return Resolution::Resolved(String::new());
        }
        if self.ids.contains(raw) {
            return Resolution::Resolved(raw.to_string());
        }
        if let Some(id) = self.by_email.get(&raw.to_lowercase()) {
            return Resolution::Resolved(id.clone());
        }
        if let Some(id) = self.by_name.get(&normalize_person_name(raw)) {
            return Resolution::Resolved(id.clone());
        }
        debug!(reference = raw, "staff reference did not resolve");
        Resolution::Unresolved(raw.to_string())
    }
}

/// Lookup maps over the workstream collection. Same shape as
/// [`StaffDirectory`] with fewer strategies: id, then case-insensitive name.
#[derive(Debug, Default)]
pub struct WorkstreamDirectory {
    ids: HashSet<String>,
    by_name: HashMap<String, String>,
}

impl WorkstreamDirectory {
    /// Build the id / name maps from a workstream snapshot.
    #[must_use]
    pub fn new(workstreams: &[Workstream]) -> Self {
        let mut dir = Self::default();
        for ws in workstreams {
            dir.ids.insert(ws.id.clone());
            let name = ws.name.trim().to_lowercase();
            if !name.is_empty() {
                dir.by_name.insert(name, ws.id.clone());
            }
        }
        dir
    }

    /// Resolve a reference value of unknown shape.
    #[must_use]
    pub fn resolve_value(&self, value: Option<&Value>) -> Resolution {
        match value {
            None | Some(Value::Null) => Resolution::Resolved(String::new()),
            Some(other) => self.resolve_str(&crate::normalize::raw_reference(Some(other))),
        }
    }

    /// Resolve a raw string reference: id, then case-insensitive name.
    #[must_use]
    pub fn resolve_str(&self, raw: &str) -> Resolution {
        let raw = raw.trim();
        if raw.is_empty() {
            return Resolution::Resolved(String::new());
        }
        if self.ids.contains(raw) {
            return Resolution::Resolved(raw.to_string());
        }
        if let Some(id) = self.by_name.get(&raw.to_lowercase()) {
            return Resolution::Resolved(id.clone());
        }
        debug!(reference = raw, "workstream reference did not resolve");
        Resolution::Unresolved(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn directory() -> StaffDirectory {
        let staff = vec![Staff {
            id: "s1".to_string(),
            email: "A@X.com".to_string(),
            name: "Ann Lee (Contractor)".to_string(),
            ..Staff::new("", "")
        }];
        StaffDirectory::new(&staff)
    }

    #[test]
    fn test_resolve_by_id() {
        let dir = directory();
        assert_eq!(dir.resolve_str("s1"), Resolution::Resolved("s1".to_string()));
    }

    #[test]
    fn test_resolve_by_email_case_insensitive() {
        let dir = directory();
        assert_eq!(dir.resolve_str("a@x.COM"), Resolution::Resolved("s1".to_string()));
    }

    #[test]
    fn test_resolve_by_normalized_name() {
        // "ann lee" must match "Ann Lee (Contractor)": the parenthetical
        // suffix is stripped and case is ignored.
        let dir = directory();
        assert_eq!(dir.resolve_str("ann lee"), Resolution::Resolved("s1".to_string()));
        assert_eq!(
            dir.resolve_str("  Ann   Lee "),
            Resolution::Resolved("s1".to_string())
        );
    }

    #[test]
    fn test_resolve_structured_lookup_object() {
        let dir = directory();
        let value = json!({"lookupEmail": "a@x.com", "name": "whoever"});
        assert_eq!(
            dir.resolve_value(Some(&value)),
            Resolution::Resolved("s1".to_string())
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let dir = directory();
        for input in ["s1", "a@x.com", "ann lee"] {
            let once = dir.resolve_str(input).into_id();
            let twice = dir.resolve_str(&once).into_id();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_miss_returns_raw_unchanged() {
        let dir = directory();
        let miss = dir.resolve_str("ghost@nowhere.com");
        assert_eq!(miss, Resolution::Unresolved("ghost@nowhere.com".to_string()));
        assert_eq!(miss.into_id(), "ghost@nowhere.com");
    }

    #[test]
    fn test_empty_input_resolves_to_empty() {
        let dir = directory();
        assert_eq!(dir.resolve_str(""), Resolution::Resolved(String::new()));
        assert_eq!(dir.resolve_value(None), Resolution::Resolved(String::new()));
        assert_eq!(
            dir.resolve_value(Some(&serde_json::Value::Null)),
            Resolution::Resolved(String::new())
        );
    }

    #[test]
    fn test_workstream_directory_by_name() {
        let workstreams = vec![Workstream {
            id: "ws1".to_string(),
            name: "Audit".to_string(),
            ..Workstream::new("")
        }];
        let dir = WorkstreamDirectory::new(&workstreams);
        assert_eq!(dir.resolve_str("audit"), Resolution::Resolved("ws1".to_string()));
        assert_eq!(dir.resolve_str("ws1"), Resolution::Resolved("ws1".to_string()));
        assert_eq!(
            dir.resolve_str("Mystery"),
            Resolution::Unresolved("Mystery".to_string())
        );
    }

    #[test]
    fn test_normalize_person_name() {
        assert_eq!(normalize_person_name("Ann Lee (Contractor)"), "ann lee");
        assert_eq!(normalize_person_name("  Bob   Smith  "), "bob smith");
        assert_eq!(normalize_person_name("Eve (On Leave) Jones"), "eve jones");
    }
}
