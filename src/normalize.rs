//! Record normalization.
//!
//! Raw remote records are loosely typed: field names vary across historical
//! schema versions, enums arrive as numeric codes or labels, dates arrive
//! in several formats. This module maps one raw record into one canonical
//! entity and is total — a record missing every field still normalizes,
//! it just normalizes to defaults.
//!
//! Reference fields (owner, lead, supervisor, ...) are resolved here when
//! the caller already holds the relevant directory, or carried as raw
//! tokens for a later pass (staff cross-references need the workstream
//! directory that doesn't exist yet on the first pull).

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::model::{
    AuditLog, Deliverable, DeliverableStatus, PtoRequest, PtoStatus, Risk, Staff, StaffTitle,
    UserRole, Workstream,
};
use crate::resolve::{StaffDirectory, WorkstreamDirectory};

/// A raw remote record: arbitrary keys, arbitrary value shapes.
pub type RawRecord = serde_json::Map<String, Value>;

// ── Field fallback ────────────────────────────────────────────

/// Return the first candidate key that is present, non-null, and (for
/// strings) non-empty after trimming. Total: no candidate matching is a
/// normal outcome, not an error.
#[must_use]
pub fn fallback<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ── Scalar coercions ──────────────────────────────────────────

/// Coerce a value to a trimmed string. Numbers and booleans stringify;
/// nulls, objects, and arrays coerce to empty.
#[must_use]
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Coerce to a date-only ISO string (`YYYY-MM-DD`).
///
/// Accepts ISO dates, ISO datetimes (time-of-day is stripped), and
/// slash-formatted `M/D/YYYY` dates. The year-0001 "zero date" sentinel
/// some historical exports use for "no date" coerces to `None`, as does
/// anything unparseable.
#[must_use]
pub fn coerce_date(value: Option<&Value>) -> Option<String> {
    let raw = coerce_string(value);
    if raw.is_empty() {
        return None;
    }

    // Split a datetime down to its date part.
    let date_part = raw
        .split(['T', ' '])
        .next()
        .unwrap_or(&raw);

    let parsed = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%m/%d/%Y"))
        .ok()?;

    if parsed.format("%Y").to_string() == "0001" {
        return None;
    }

    Some(parsed.format("%Y-%m-%d").to_string())
}

/// Coerce to a list: strings split on `;` or `,` with empties dropped;
/// JSON arrays take their string-able items; anything else is empty.
#[must_use]
pub fn coerce_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split([';', ','])
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToString::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| coerce_string(Some(item)))
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Coerce to a boolean: `true`/`yes`/`1` (any case) and JSON `true` are
/// true; everything else, including absence, is false.
#[must_use]
pub fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => {
            matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1")
        }
        _ => false,
    }
}

/// Coerce to a 0-100 progress integer, clamping out-of-range input.
#[must_use]
pub fn coerce_progress(value: Option<&Value>) -> u8 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    // Clamp before casting; sign and range are both unchecked upstream.
    let clamped = n.clamp(0.0, 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let progress = clamped.round() as u8;
    progress
}

/// Coerce a timestamp: Unix millis pass through, date strings convert,
/// everything else is 0 (stable across repeated sync passes).
///
/// Accepts RFC 3339 (`Z` or offset suffix), bare ISO datetimes (read as
/// UTC), and date-only strings (midnight UTC).
#[must_use]
pub fn coerce_millis(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.timestamp_millis())
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                        .map(|dt| dt.and_utc().timestamp_millis())
                })
                .or_else(|_| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp_millis())
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Extract a raw reference token from a value of unknown shape, without
/// resolving it. Structured lookup objects reduce to their email-like
/// field so a later resolution pass can still match them.
#[must_use]
pub fn raw_reference(value: Option<&Value>) -> String {
    match value {
        Some(Value::Object(obj)) => {
            coerce_string(fallback(obj, &["email", "Email", "lookupEmail", "value"]))
        }
        other => coerce_string(other),
    }
}

// ── Per-entity normalizers ────────────────────────────────────

/// Normalize a raw staff record.
///
/// `supervisor_id` and `workstream_ids` are carried as raw tokens here;
/// the sync pass re-resolves them once both directories exist (staff and
/// workstreams mutually reference each other).
#[must_use]
pub fn staff_from_record(record: &RawRecord) -> Staff {
    let id = coerce_string(fallback(record, &["id", "ID", "Id", "Record ID", "recordId"]));

    let supervisor = raw_reference(fallback(
        record,
        &["supervisorId", "supervisor_id", "Supervisor", "Reports To", "reportsTo", "Manager"],
    ));

    Staff {
        id: if id.is_empty() { crate::model::prefixed_id("stf") } else { id },
        name: coerce_string(fallback(
            record,
            &["name", "Name", "Full Name", "fullName", "Staff Name", "staff_name"],
        )),
        title: StaffTitle::parse(&coerce_string(fallback(
            record,
            &["title", "Title", "Job Title", "jobTitle", "Level", "level"],
        ))),
        email: coerce_string(fallback(
            record,
            &["email", "Email", "Email Address", "emailAddress", "Work Email"],
        )),
        department: coerce_string(fallback(record, &["department", "Department", "Dept", "dept"])),
        supervisor_id: if supervisor.is_empty() { None } else { Some(supervisor) },
        workstream_ids: coerce_list(fallback(
            record,
            &["workstreamIds", "workstream_ids", "Workstreams", "workstreams", "Teams"],
        )),
        user_role: UserRole::parse(&coerce_string(fallback(
            record,
            &["userRole", "user_role", "Role", "role", "Access Level", "accessLevel"],
        ))),
        is_active: fallback(record, &["isActive", "is_active", "Active", "active"])
            .map_or(true, |v| coerce_bool(Some(v))),
        created_at: coerce_millis(fallback(
            record,
            &["createdAt", "created_at", "Created", "Created At"],
        )),
    }
}

/// Normalize a raw workstream record, resolving its lead against the staff
/// directory. Color is assigned afterwards by [`crate::model::assign_colors`]
/// once the whole collection is in hand.
#[must_use]
pub fn workstream_from_record(record: &RawRecord, staff: &StaffDirectory) -> Workstream {
    let id = coerce_string(fallback(record, &["id", "ID", "Id", "Record ID", "recordId"]));
    let lead = fallback(record, &["lead", "Lead", "leadId", "lead_id", "Owner", "owner"]);

    Workstream {
        id: if id.is_empty() { crate::model::prefixed_id("ws") } else { id },
        name: coerce_string(fallback(
            record,
            &["name", "Name", "Workstream Name", "workstream_name", "Team"],
        )),
        description: coerce_string(fallback(record, &["description", "Description", "Notes"])),
        lead_id: staff.resolve_value(lead).into_id(),
        color: String::new(),
        created_at: coerce_millis(fallback(
            record,
            &["createdAt", "created_at", "Created", "Created At"],
        )),
    }
}

/// Normalize a raw deliverable record, resolving both of its references.
#[must_use]
pub fn deliverable_from_record(
    record: &RawRecord,
    staff: &StaffDirectory,
    workstreams: &WorkstreamDirectory,
) -> Deliverable {
    let id = coerce_string(fallback(record, &["id", "ID", "Id", "Record ID", "recordId"]));
    let owner = fallback(
        record,
        &["ownerId", "owner_id", "Owner", "owner", "Assigned To", "assignedTo"],
    );
    let workstream = fallback(
        record,
        &["workstreamId", "workstream_id", "Workstream", "workstream", "Team"],
    );

    Deliverable {
        id: if id.is_empty() { crate::model::prefixed_id("dlv") } else { id },
        title: coerce_string(fallback(
            record,
            &["title", "Title", "name", "Name", "Deliverable"],
        )),
        description: coerce_string(fallback(record, &["description", "Description"])),
        workstream_id: workstreams.resolve_value(workstream).into_id(),
        owner_id: staff.resolve_value(owner).into_id(),
        status: DeliverableStatus::parse(&coerce_string(fallback(
            record,
            &["status", "Status", "State", "state"],
        ))),
        priority: coerce_string(fallback(record, &["priority", "Priority"])),
        risk: Risk::parse(&coerce_string(fallback(
            record,
            &["risk", "Risk", "Risk Level", "riskLevel"],
        ))),
        start_date: coerce_date(fallback(record, &["startDate", "start_date", "Start Date", "Start"])),
        due_date: coerce_date(fallback(record, &["dueDate", "due_date", "Due Date", "Due", "Deadline"])),
        review_date: coerce_date(fallback(record, &["reviewDate", "review_date", "Review Date"])),
        testing_date: coerce_date(fallback(record, &["testingDate", "testing_date", "Testing Date"])),
        completed_date: coerce_date(fallback(
            record,
            &["completedDate", "completed_date", "Completed Date", "Completion Date"],
        )),
        progress: coerce_progress(fallback(record, &["progress", "Progress", "% Complete", "percentComplete"])),
        dependencies: coerce_list(fallback(record, &["dependencies", "Dependencies", "Depends On", "dependsOn"])),
        comment: coerce_string(fallback(record, &["comment", "Comment", "Comments", "Notes"])),
        created_at: coerce_millis(fallback(record, &["createdAt", "created_at", "Created"])),
        updated_at: coerce_millis(fallback(record, &["updatedAt", "updated_at", "Updated", "Last Modified"])),
    }
}

/// Normalize a raw PTO request record.
#[must_use]
pub fn pto_from_record(record: &RawRecord, staff: &StaffDirectory) -> PtoRequest {
    let id = coerce_string(fallback(record, &["id", "ID", "Id", "Record ID", "recordId"]));
    let requester = fallback(
        record,
        &["staffId", "staff_id", "Staff", "staff", "Requested By", "requestedBy", "Employee"],
    );
    let approver = fallback(record, &["approvedBy", "approved_by", "Approved By", "Approver"]);
    let approved_by = match approver {
        Some(value) => {
            let resolved = staff.resolve_value(Some(value)).into_id();
            if resolved.is_empty() { None } else { Some(resolved) }
        }
        None => None,
    };

    PtoRequest {
        id: if id.is_empty() { crate::model::prefixed_id("pto") } else { id },
        staff_id: staff.resolve_value(requester).into_id(),
        start_date: coerce_date(fallback(record, &["startDate", "start_date", "Start Date", "From"])),
        end_date: coerce_date(fallback(record, &["endDate", "end_date", "End Date", "To"])),
        pto_type: coerce_string(fallback(record, &["type", "Type", "ptoType", "pto_type", "Category"])),
        status: PtoStatus::parse(&coerce_string(fallback(record, &["status", "Status"]))),
        notes: coerce_string(fallback(record, &["notes", "Notes", "Reason", "reason"])),
        approved_by,
        created_at: coerce_millis(fallback(record, &["createdAt", "created_at", "Created"])),
    }
}

/// Normalize a raw audit log record. Entries are append-only; no reference
/// resolution is applied (the user name was captured at write time).
#[must_use]
pub fn audit_from_record(record: &RawRecord) -> AuditLog {
    let id = coerce_string(fallback(record, &["id", "ID", "Id", "Record ID", "recordId"]));
    let entity_id = coerce_string(fallback(record, &["entityId", "entity_id", "Entity ID"]));

    AuditLog {
        id: if id.is_empty() { crate::model::prefixed_id("log") } else { id },
        user_id: coerce_string(fallback(record, &["userId", "user_id", "User ID", "User"])),
        user_name: coerce_string(fallback(record, &["userName", "user_name", "User Name"])),
        action: coerce_string(fallback(record, &["action", "Action"])),
        entity_type: coerce_string(fallback(record, &["entityType", "entity_type", "Entity Type"])),
        entity_id: if entity_id.is_empty() { None } else { Some(entity_id) },
        details: coerce_string(fallback(record, &["details", "Details", "Description"])),
        timestamp: coerce_millis(fallback(record, &["timestamp", "Timestamp", "createdAt", "created_at"])),
    }
}
