//! Stage 5: coverage audit.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use caseforge_core::state::{PipelineState, StageLogEntry, StageName, StageUpdate};
use caseforge_llm::invoker::Invoker;

use crate::prompts;
use crate::stage::{ModelSpec, Stage, StageError, generate_parsed};

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    coverage_gaps: Vec<String>,
    #[serde(default)]
    clarifications: Vec<String>,
}

/// Reviews the generated cases against requirements and risk areas and
/// reports coverage gaps.
pub struct CoverageAuditor {
    invoker: Arc<Invoker>,
    model: ModelSpec,
}

impl CoverageAuditor {
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
impl Stage for CoverageAuditor {
    fn name(&self) -> StageName {
        StageName::CoverageAuditor
    }

    async fn run(
        &self,
        state: &PipelineState,
        cancel: &CancellationToken,
    ) -> Result<StageUpdate, StageError> {
        let prompt = prompts::coverage_auditor(state);
        let parsed: Option<Reply> =
            generate_parsed(&self.invoker, self.name(), &self.model, prompt, cancel).await?;

        let Some(reply) = parsed else {
            return Ok(StageUpdate {
                stage_log: vec![StageLogEntry::new(
                    self.name(),
                    "unparseable_reply",
                    "reply could not be parsed; contributed nothing",
                )],
                ..StageUpdate::default()
            });
        };

        info!(
            coverage_gaps = reply.coverage_gaps.len(),
            clarifications = reply.clarifications.len(),
            "coverage audited"
        );
        let detail = format!(
            "{} coverage gaps, {} clarifications",
            reply.coverage_gaps.len(),
            reply.clarifications.len(),
        );
        Ok(StageUpdate {
            coverage_gaps: reply.coverage_gaps,
            clarifications: reply.clarifications,
            stage_log: vec![StageLogEntry::new(self.name(), "audited_coverage", detail)],
            ..StageUpdate::default()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::{FixedProvider, invoker_for};
    use caseforge_core::ticket::Ticket;

    #[tokio::test]
    async fn gaps_and_clarifications_append() {
        let reply = r#"{
  "coverage_gaps": ["no concurrency scenario", "no localization check"],
  "clarifications": ["is offline mode in scope?"]
}"#;
        let stage = CoverageAuditor::new(
            Arc::new(invoker_for(FixedProvider::new(vec![reply.into()]))),
            "test-model",
        );
        let state = PipelineState::new(Ticket::default());

        let update = stage.run(&state, &CancellationToken::new()).await.unwrap();

        assert_eq!(update.coverage_gaps.len(), 2);
        assert_eq!(update.clarifications.len(), 1);
        assert_eq!(update.stage_log[0].action, "audited_coverage");
    }
}
