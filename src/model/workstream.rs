//! Workstream model and deterministic color assignment.

use serde::{Deserialize, Serialize};

/// A workstream (a named body of work that deliverables belong to).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workstream {
    /// Unique identifier (prefixed short id, e.g. `ws_...`)
    pub id: String,

    /// Display name (also a resolution key, compared case-insensitively)
    pub name: String,

    /// Optional description
    pub description: String,

    /// Lead reference (staff id once resolved, raw token otherwise)
    pub lead_id: String,

    /// Hex color assigned deterministically by name-sorted position
    pub color: String,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Workstream {
    /// Create a new workstream with a client-generated id.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: super::prefixed_id("ws"),
            name: name.to_string(),
            description: String::new(),
            lead_id: String::new(),
            color: String::new(),
            created_at: super::now_millis(),
        }
    }
}

/// The fixed workstream color palette.
#[must_use]
pub const fn palette() -> &'static [&'static str] {
    &[
        "#4F86C6", "#E8743B", "#6BBE6C", "#D14D57", "#9B6BC3",
        "#8A6D5B", "#E377C2", "#7F7F7F", "#BCBD22", "#17BECF",
    ]
}

/// Assign colors by position in name-sorted order over the fixed palette.
///
/// The assignment is a pure function of the input's name set: re-deriving
/// it from the same workstreams always yields the same colors, regardless
/// of the order the remote returned them in. The slice is left sorted by
/// name as a side effect (the sync pass caches it that way).
pub fn assign_colors(workstreams: &mut [Workstream]) {
    workstreams.sort_by(|a, b| a.name.cmp(&b.name));
    let colors = palette();
    for (i, ws) in workstreams.iter_mut().enumerate() {
        ws.color = colors[i % colors.len()].to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_assigned_by_sorted_name_order() {
        let mut workstreams = vec![Workstream::new("Beta"), Workstream::new("Alpha")];
        assign_colors(&mut workstreams);

        // "Alpha" sorts first and gets palette color 0 even though it was
        // listed second.
        assert_eq!(workstreams[0].name, "Alpha");
        assert_eq!(workstreams[0].color, palette()[0]);
        assert_eq!(workstreams[1].name, "Beta");
        assert_eq!(workstreams[1].color, palette()[1]);
    }

    #[test]
    fn test_color_assignment_is_deterministic() {
        let mut first = vec![
            Workstream::new("Ops"),
            Workstream::new("Audit"),
            Workstream::new("Tax"),
        ];
        let mut second = first.clone();
        second.reverse();

        assign_colors(&mut first);
        assign_colors(&mut second);

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.color, b.color);
        }
    }

    #[test]
    fn test_palette_wraps() {
        let mut workstreams: Vec<Workstream> = (0..12)
            .map(|i| Workstream::new(&format!("ws-{i:02}")))
            .collect();
        assign_colors(&mut workstreams);
        assert_eq!(workstreams[10].color, palette()[0]);
        assert_eq!(workstreams[11].color, palette()[1]);
    }
}
