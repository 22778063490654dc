//! Built-in sample tickets for demos and smoke runs.

use clap::ValueEnum;

use caseforge_core::ticket::{Comment, Ticket, TicketKind};

/// Which sample ticket to print.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SampleKind {
    /// A defect report (login failure).
    Bug,
    /// A feature request (PDF export).
    Feature,
    /// An API change task (profile picture upload).
    Task,
}

/// The sample ticket for `kind`.
#[must_use]
pub fn sample(kind: SampleKind) -> Ticket {
    match kind {
        SampleKind::Bug => bug_fix(),
        SampleKind::Feature => feature(),
        SampleKind::Task => api_change(),
    }
}

fn comment(author: &str, body: &str) -> Comment {
    Comment {
        author: author.to_owned(),
        body: body.to_owned(),
    }
}

fn bug_fix() -> Ticket {
    Ticket {
        id: "BUG-1234".into(),
        title: "User login fails with special characters in password".into(),
        description: "\
**Issue:**
Users are unable to login when their password contains special characters \
like @, #, $, %. The login form shows \"Invalid credentials\" error even \
when the password is correct.

**Steps to Reproduce:**
1. Create a user account with password containing special characters (e.g., Test@123#)
2. Logout
3. Try to login with the same credentials
4. Error: \"Invalid credentials\" is displayed

**Expected Behavior:**
Users should be able to login successfully with passwords containing special characters.

**Environment:**
- Browser: Chrome 120
- OS: Windows 11
- Version: 2.5.3"
            .into(),
        kind: TicketKind::Bug,
        priority: "P0".into(),
        status: "In Progress".into(),
        acceptance_criteria: vec![
            "Users can login with passwords containing special characters (@, #, $, %, &, *)"
                .into(),
            "No error message is shown for valid credentials".into(),
            "Login process completes within 2 seconds".into(),
            "Existing users with special characters in passwords can login".into(),
        ],
        attachments: vec!["screenshot_login_error.png".into(), "network_logs.har".into()],
        comments: vec![
            comment(
                "QA Lead",
                "This is affecting 15% of our user base. High priority fix needed.",
            ),
            comment(
                "Dev Team",
                "Looks like URL encoding issue in the authentication API. Working on fix.",
            ),
        ],
        linked_tickets: vec!["STORY-456".into(), "BUG-1100".into()],
    }
}

fn feature() -> Ticket {
    Ticket {
        id: "FEAT-5678".into(),
        title: "Add export to PDF functionality for reports".into(),
        description: "\
**Feature Request:**
Users want to export their analytics reports as PDF files for sharing and \
offline viewing.

**User Story:**
As a business analyst, I want to export my reports as PDF so that I can \
share them with stakeholders who don't have system access.

**Proposed Solution:**
Add an \"Export to PDF\" button on the reports page that generates a \
formatted PDF with:
- Company logo and branding
- Report title and date range
- All charts and graphs
- Data tables
- Footer with page numbers

**Technical Notes:**
- Use existing report data API
- Support charts: bar, line, pie charts
- Maximum report size: 50 pages
- Include download progress indicator"
            .into(),
        kind: TicketKind::Feature,
        priority: "P1".into(),
        status: "Ready for Development".into(),
        acceptance_criteria: vec![
            "Export button is visible on all report pages".into(),
            "PDF includes company logo and branding".into(),
            "All charts render correctly in PDF".into(),
            "PDF generation completes within 10 seconds for reports up to 50 pages".into(),
            "Downloaded PDF filename includes report name and date".into(),
            "Progress indicator shows during PDF generation".into(),
        ],
        attachments: vec!["mockup_export_button.png".into(), "pdf_template.pdf".into()],
        comments: vec![
            comment(
                "Product Manager",
                "This is one of our most requested features. Let's prioritize it.",
            ),
            comment(
                "Designer",
                "Mockups are ready. Button should be placed next to the 'Share' button.",
            ),
        ],
        linked_tickets: vec!["EPIC-123".into()],
    }
}

fn api_change() -> Ticket {
    Ticket {
        id: "TASK-9012".into(),
        title: "Update user profile API to include profile picture upload".into(),
        description: "\
**Task:**
Extend the existing /api/v2/users/{userId}/profile endpoint to support \
profile picture uploads via multipart/form-data.

**Requirements:**
- Support image formats: JPG, PNG, WebP
- Max file size: 5MB
- Auto-resize to 500x500px
- Store in cloud storage (S3)
- Return image URL in response
- Validate file type and size

**Security Considerations:**
- Validate file extension and MIME type
- Scan for malware
- Prevent path traversal attacks"
            .into(),
        kind: TicketKind::Task,
        priority: "P1".into(),
        status: "In Development".into(),
        acceptance_criteria: vec![
            "API accepts multipart/form-data requests".into(),
            "Only JPG, PNG, WebP formats are accepted".into(),
            "Files larger than 5MB are rejected with 413 error".into(),
            "Images are automatically resized to 500x500px".into(),
            "Profile picture URL is returned in the response".into(),
            "Old profile pictures are deleted when new ones are uploaded".into(),
            "API returns appropriate error codes for validation failures".into(),
        ],
        attachments: vec!["api_spec.yaml".into()],
        comments: vec![
            comment(
                "Tech Lead",
                "Make sure to implement rate limiting for this endpoint.",
            ),
            comment(
                "Security Team",
                "Don't forget to add virus scanning for uploaded files.",
            ),
        ],
        linked_tickets: vec!["FEAT-5000".into(), "BUG-8900".into()],
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_serialize_and_roundtrip() {
        for kind in [SampleKind::Bug, SampleKind::Feature, SampleKind::Task] {
            let ticket = sample(kind);
            assert!(!ticket.id.is_empty());
            assert!(!ticket.acceptance_criteria.is_empty());
            let json = serde_json::to_string_pretty(&ticket).unwrap();
            let back: Ticket = serde_json::from_str(&json).unwrap();
            assert_eq!(back, ticket);
        }
    }

    #[test]
    fn kinds_match_their_fixture() {
        assert_eq!(sample(SampleKind::Bug).kind, TicketKind::Bug);
        assert_eq!(sample(SampleKind::Feature).kind, TicketKind::Feature);
        assert_eq!(sample(SampleKind::Task).kind, TicketKind::Task);
    }
}
