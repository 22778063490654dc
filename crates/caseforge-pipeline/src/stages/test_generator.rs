//! Stage 4: test-case generation.
//!
//! Runs one model call per roadmap category. A category whose reply
//! cannot be parsed is skipped with a log entry and generation continues;
//! only a failed invoke aborts the stage.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use caseforge_core::state::{PipelineState, StageLogEntry, StageName, StageUpdate};
use caseforge_core::ticket::{Priority, TestCase};
use caseforge_llm::invoker::Invoker;

use crate::prompts;
use crate::stage::{ModelSpec, Stage, StageError, generate_parsed};

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    test_cases: Vec<GeneratedCase>,
}

#[derive(Deserialize)]
struct GeneratedCase {
    title: String,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    expected_result: String,
    #[serde(default)]
    requirement_refs: Vec<String>,
}

fn parse_priority(raw: Option<&str>) -> Priority {
    match raw.map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("high") => Priority::High,
        Some(s) if s.eq_ignore_ascii_case("low") => Priority::Low,
        _ => Priority::Medium,
    }
}

/// Generates concrete test cases for every roadmap category, assigning
/// `{ticket_id}_TC{NNN}` identifiers that keep counting across categories.
pub struct TestGenerator {
    invoker: Arc<Invoker>,
    model: ModelSpec,
}

impl TestGenerator {
    /// Create the stage.
    #[must_use]
    pub fn new(invoker: Arc<Invoker>, model: impl Into<ModelSpec>) -> Self {
        Self {
            invoker,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Stage for TestGenerator {
    fn name(&self) -> StageName {
        StageName::TestGenerator
    }

    async fn run(
        &self,
        state: &PipelineState,
        cancel: &CancellationToken,
    ) -> Result<StageUpdate, StageError> {
        let mut cases: Vec<TestCase> = Vec::new();
        let mut log: Vec<StageLogEntry> = Vec::new();
        let mut counter = state.test_cases.len();

        for (category, scenarios) in &state.roadmap {
            if scenarios.is_empty() {
                log.push(StageLogEntry::new(
                    self.name(),
                    "category_skipped",
                    format!("{category}: no scenarios"),
                ));
                continue;
            }

            let prompt = prompts::test_generator(state, category, scenarios);
            let parsed: Option<Reply> =
                generate_parsed(&self.invoker, self.name(), &self.model, prompt, cancel).await?;

            let Some(reply) = parsed else {
                warn!(category = %category, "category reply unparseable, skipping");
                log.push(StageLogEntry::new(
                    self.name(),
                    "category_skipped",
                    format!("{category}: reply could not be parsed"),
                ));
                continue;
            };

            let generated = reply.test_cases.len();
            for raw in reply.test_cases {
                counter += 1;
                cases.push(TestCase {
                    id: format!("{}_TC{:03}", state.ticket.id, counter),
                    title: raw.title,
                    category: category.clone(),
                    priority: parse_priority(raw.priority.as_deref()),
                    steps: raw.steps,
                    expected_result: raw.expected_result,
                    requirement_refs: raw.requirement_refs,
                });
            }
            log.push(StageLogEntry::new(
                self.name(),
                "generated_cases",
                format!("{category}: {generated} cases"),
            ));
        }

        info!(total = cases.len(), "test cases generated");
        Ok(StageUpdate {
            test_cases: cases,
            stage_log: log,
            ..StageUpdate::default()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
