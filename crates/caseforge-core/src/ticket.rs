//! Ticket input and test-case output types.
//!
//! A [`Ticket`] is the opaque work item fed into the pipeline — the core
//! performs no validation beyond deserialization. A [`TestCase`] is the
//! structured artifact the generator stage produces.

use serde::{Deserialize, Serialize};

/// Kind of work item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketKind {
    /// Defect report.
    Bug,
    /// New functionality.
    Feature,
    /// General work item.
    #[default]
    Task,
}

impl std::fmt::Display for TicketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bug => write!(f, "bug"),
            Self::Feature => write!(f, "feature"),
            Self::Task => write!(f, "task"),
        }
    }
}

/// A comment on a ticket (author + body, nothing more).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Display name of the commenter.
    pub author: String,
    /// Comment text.
    pub body: String,
}

/// Input work item from a ticket system.
///
/// Passed through the pipeline as-is; `priority` and `status` keep the
/// source system's vocabulary (`"P0"`, `"In Progress"`, …).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier, e.g. `"BUG-1234"`.
    pub id: String,
    /// Short summary.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Kind of work item.
    #[serde(default)]
    pub kind: TicketKind,
    /// Source-system priority string.
    #[serde(default)]
    pub priority: String,
    /// Source-system status string.
    #[serde(default)]
    pub status: String,
    /// Acceptance criteria (may be empty).
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// Attachment file names.
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Comments, oldest first.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Identifiers of linked tickets.
    #[serde(default)]
    pub linked_tickets: Vec<String>,
}

/// Priority of a generated test case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must-run case.
    High,
    /// Default priority.
    #[default]
    Medium,
    /// Nice-to-have case.
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A single generated test case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Case identifier: `{ticket_id}_TC{NNN}` with a zero-padded counter
    /// that keeps counting across categories within one run.
    pub id: String,
    /// Descriptive title.
    pub title: String,
    /// Roadmap category this case belongs to (`happy_path`, `negative`, …).
    pub category: String,
    /// Case priority; unknown or missing values default to medium.
    #[serde(default)]
    pub priority: Priority,
    /// Ordered execution steps.
    pub steps: Vec<String>,
    /// Expected outcome.
    pub expected_result: String,
    /// Requirement texts this case covers.
    #[serde(default)]
    pub requirement_refs: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_kind_serde_lowercase() {
        assert_eq!(serde_json::to_string(&TicketKind::Bug).unwrap(), "\"bug\"");
        let kind: TicketKind = serde_json::from_str("\"feature\"").unwrap();
        assert_eq!(kind, TicketKind::Feature);
    }

    #[test]
    fn ticket_deserializes_with_missing_optionals() {
        let json = r#"{"id": "TASK-1", "title": "t", "description": "d"}"#;
        let ticket: Ticket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.kind, TicketKind::Task);
        assert!(ticket.acceptance_criteria.is_empty());
        assert!(ticket.comments.is_empty());
        assert!(ticket.linked_tickets.is_empty());
    }

    #[test]
    fn priority_unknown_defaults_to_medium() {
        // Deserialization of an unknown string fails; callers fall back to
        // the default, which must be medium.
        assert_eq!(Priority::default(), Priority::Medium);
        assert!(serde_json::from_str::<Priority>("\"urgent\"").is_err());
    }

    #[test]
    fn priority_orders_high_first() {
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
    }

    #[test]
    fn test_case_roundtrip() {
        let tc = TestCase {
            id: "BUG-1234_TC001".into(),
            title: "Login with special characters".into(),
            category: "happy_path".into(),
            priority: Priority::High,
            steps: vec!["Open login form".into(), "Submit credentials".into()],
            expected_result: "User is logged in".into(),
            requirement_refs: vec!["Users can login with special characters".into()],
        };
        let json = serde_json::to_string(&tc).unwrap();
        let back: TestCase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tc);
    }
}
