//! Staff model.
//!
//! Staff records are pulled first in every sync pass because nearly every
//! other entity references them (deliverable owners, PTO requesters,
//! workstream leads).

use serde::{Deserialize, Serialize};

/// Job title ladder.
///
/// Historical records encode titles three ways: numeric codes (1-6 in
/// seniority order), legacy snake_case tokens, and current display labels.
/// `parse` accepts all of them and never fails; unrecognized input maps to
/// the most junior title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaffTitle {
    Partner,
    Director,
    #[serde(rename = "Senior Manager")]
    SeniorManager,
    Manager,
    #[serde(rename = "Senior Associate")]
    SeniorAssociate,
    Associate,
}

impl StaffTitle {
    /// Display label (also the canonical storage form).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Partner => "Partner",
            Self::Director => "Director",
            Self::SeniorManager => "Senior Manager",
            Self::Manager => "Manager",
            Self::SeniorAssociate => "Senior Associate",
            Self::Associate => "Associate",
        }
    }

    /// Parse any historical representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "1" | "partner" => Self::Partner,
            "2" | "director" => Self::Director,
            "3" | "senior manager" | "senior_manager" | "sr manager" | "sr. manager" => {
                Self::SeniorManager
            }
            "4" | "manager" => Self::Manager,
            "5" | "senior associate" | "senior_associate" | "sr associate" | "sr. associate" => {
                Self::SeniorAssociate
            }
            _ => Self::Associate,
        }
    }
}

impl Default for StaffTitle {
    fn default() -> Self {
        Self::Associate
    }
}

/// Application role controlling what the UI lets a user do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    Manager,
    User,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::User => "User",
        }
    }

    /// Parse any historical representation; unrecognized input maps to the
    /// least privileged role.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "1" | "admin" | "administrator" => Self::Admin,
            "2" | "manager" => Self::Manager,
            _ => Self::User,
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::User
    }
}

/// A staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    /// Unique identifier (prefixed short id, e.g. `stf_...`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Job title
    pub title: StaffTitle,

    /// Email address (resolution key; compared case-insensitively)
    pub email: String,

    /// Department name
    pub department: String,

    /// Supervisor reference (staff id once resolved, raw token otherwise)
    pub supervisor_id: Option<String>,

    /// Workstream memberships (workstream ids once resolved)
    pub workstream_ids: Vec<String>,

    /// Application role
    pub user_role: UserRole,

    /// Whether the member is active
    pub is_active: bool,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Staff {
    /// Create a new staff member with a client-generated id.
    #[must_use]
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            id: super::prefixed_id("stf"),
            name: name.to_string(),
            title: StaffTitle::default(),
            email: email.to_string(),
            department: String::new(),
            supervisor_id: None,
            workstream_ids: Vec::new(),
            user_role: UserRole::default(),
            is_active: true,
            created_at: super::now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_parsing_accepts_all_encodings() {
        assert_eq!(StaffTitle::parse("3"), StaffTitle::SeniorManager);
        assert_eq!(StaffTitle::parse("senior_manager"), StaffTitle::SeniorManager);
        assert_eq!(StaffTitle::parse("Senior Manager"), StaffTitle::SeniorManager);
        assert_eq!(StaffTitle::parse("PARTNER"), StaffTitle::Partner);
    }

    #[test]
    fn test_title_parsing_defaults_to_associate() {
        assert_eq!(StaffTitle::parse(""), StaffTitle::Associate);
        assert_eq!(StaffTitle::parse("intern"), StaffTitle::Associate);
    }

    #[test]
    fn test_role_parsing_defaults_to_user() {
        assert_eq!(UserRole::parse("admin"), UserRole::Admin);
        assert_eq!(UserRole::parse("2"), UserRole::Manager);
        assert_eq!(UserRole::parse("superuser"), UserRole::User);
    }

    #[test]
    fn test_new_staff() {
        let staff = Staff::new("Ann Lee", "ann@example.com");
        assert!(staff.id.starts_with("stf_"));
        assert!(staff.is_active);
        assert_eq!(staff.title, StaffTitle::Associate);
    }
}
