//! Prompt templates for the five stages.
//!
//! Each template embeds the relevant slice of pipeline state as pretty
//! JSON and instructs JSON-only output in the shape the stage's reply DTO
//! expects. The prompt text is an opaque payload to everything below the
//! stage layer.

use caseforge_core::state::PipelineState;
use caseforge_core::ticket::Ticket;

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_owned())
}

/// Requirements extraction prompt.
#[must_use]
pub fn ticket_reader(ticket: &Ticket) -> String {
    format!(
        r#"You are an expert QA analyst specializing in requirement extraction.

Analyze this {kind} ticket and:
1. Extract all testable requirements (look for edge cases and implicit requirements)
2. Identify missing or ambiguous acceptance criteria
3. Raise clarifying questions for anything unclear

Ticket:
{ticket}

Return only a JSON object:
{{
  "requirements": ["requirement 1", "requirement 2"],
  "criteria_gaps": ["gap 1"],
  "clarifications": ["question 1"]
}}"#,
        kind = ticket.kind,
        ticket = pretty(ticket),
    )
}

/// System-context analysis prompt.
#[must_use]
pub fn context_builder(state: &PipelineState) -> String {
    format!(
        r#"You are an expert system architect and QA strategist.

For the change below, identify:
1. All system modules/components impacted (frontend, backend, data, auth)
2. Dependencies (APIs, databases, third-party services, UI components)
3. Risk areas that need extra testing attention

Ticket:
{ticket}

Extracted requirements:
{requirements}

Return only a JSON object:
{{
  "impacted_modules": ["module 1"],
  "dependencies": ["dependency 1"],
  "risk_areas": ["risk 1"]
}}"#,
        ticket = pretty(&state.ticket),
        requirements = pretty(&state.requirements),
    )
}

/// Roadmap-building prompt.
#[must_use]
pub fn test_strategy(state: &PipelineState) -> String {
    format!(
        r#"You are an expert QA strategist who creates comprehensive testing roadmaps.

Build a QA roadmap for the change below, organized by category. Use
snake_case category names such as happy_path, negative, edge_case,
regression, integration; add performance or security only when relevant.
Each scenario must clearly state what to test.

Ticket:
{ticket}

Requirements:
{requirements}

Impacted modules:
{modules}

Dependencies:
{dependencies}

Risk areas:
{risks}

Return only a JSON object:
{{
  "roadmap": {{
    "happy_path": ["scenario 1", "scenario 2"],
    "negative": ["scenario 1"]
  }},
  "clarifications": ["question 1"]
}}"#,
        ticket = pretty(&state.ticket),
        requirements = pretty(&state.requirements),
        modules = pretty(&state.impacted_modules),
        dependencies = pretty(&state.dependencies),
        risks = pretty(&state.risk_areas),
    )
}

/// Per-category test-case generation prompt.
#[must_use]
pub fn test_generator(state: &PipelineState, category: &str, scenarios: &[String]) -> String {
    format!(
        r#"You are an expert QA engineer who writes detailed, executable test cases.

Generate complete test cases for every scenario in the "{category}" category.
Each case needs a clear title, a priority (high, medium, or low), numbered
actionable steps, a specific measurable expected result, and the
requirement texts it covers.

Ticket:
{ticket}

Requirements:
{requirements}

Scenarios for {category}:
{scenarios}

Return only a JSON object:
{{
  "test_cases": [
    {{
      "title": "Test case title",
      "priority": "high",
      "steps": ["Step 1", "Step 2"],
      "expected_result": "What should happen",
      "requirement_refs": ["requirement text"]
    }}
  ]
}}"#,
        ticket = pretty(&state.ticket),
        requirements = pretty(&state.requirements),
        scenarios = pretty(&scenarios),
    )
}

/// Coverage-audit prompt.
#[must_use]
pub fn coverage_auditor(state: &PipelineState) -> String {
    let case_summaries: Vec<String> = state
        .test_cases
        .iter()
        .map(|tc| format!("[{}] ({}) {}", tc.priority, tc.category, tc.title))
        .collect();

    format!(
        r#"You are an expert QA auditor who reviews test coverage for completeness.

Review the generated test cases against the requirements and risk areas.
Identify coverage gaps: untested requirements, missing error scenarios,
uncovered boundary conditions, missed integration paths. Raise additional
clarifying questions if coverage cannot be judged.

Requirements:
{requirements}

Risk areas:
{risks}

Test cases ({count} total):
{cases}

Return only a JSON object:
{{
  "coverage_gaps": ["gap 1"],
  "clarifications": ["question 1"]
}}"#,
        requirements = pretty(&state.requirements),
        risks = pretty(&state.risk_areas),
        count = state.test_cases.len(),
        cases = pretty(&case_summaries),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use caseforge_core::ticket::TicketKind;

    fn ticket() -> Ticket {
        Ticket {
            id: "BUG-1234".into(),
            title: "Login fails with special characters".into(),
            description: "Users cannot login when the password contains @ or #.".into(),
            kind: TicketKind::Bug,
            ..Ticket::default()
        }
    }

    #[test]
    fn ticket_reader_embeds_the_ticket() {
        let prompt = ticket_reader(&ticket());
        assert!(prompt.contains("BUG-1234"));
        assert!(prompt.contains("bug ticket"));
        assert!(prompt.contains("\"criteria_gaps\""));
    }

    #[test]
    fn strategy_embeds_accumulated_context() {
        let mut state = PipelineState::new(ticket());
        state.requirements = vec!["Passwords accept special characters".into()];
        state.impacted_modules = vec!["auth-service".into()];
        state.risk_areas = vec!["session handling".into()];

        let prompt = test_strategy(&state);
        assert!(prompt.contains("Passwords accept special characters"));
        assert!(prompt.contains("auth-service"));
        assert!(prompt.contains("session handling"));
    }

    #[test]
    fn generator_embeds_category_and_scenarios() {
        let state = PipelineState::new(ticket());
        let scenarios = vec!["login with @ in password".to_owned()];
        let prompt = test_generator(&state, "happy_path", &scenarios);
        assert!(prompt.contains("\"happy_path\" category"));
        assert!(prompt.contains("login with @ in password"));
    }
}
