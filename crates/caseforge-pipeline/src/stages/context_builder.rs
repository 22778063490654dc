//! Stage 2: system-context analysis.

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
    impacted_modules: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    risk_areas: Vec<String>,
}

/// Identifies impacted modules, external dependencies, and risk areas
/// for the change described by the ticket and its requirements.
pub struct ContextBuilder {
    invoker: Arc<Invoker>,
    model: ModelSpec,
}

impl ContextBuilder {
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
impl Stage for ContextBuilder {
    fn name(&self) -> StageName {
        StageName::ContextBuilder
    }

    async fn run(
        &self,
        state: &PipelineState,
        cancel: &CancellationToken,
    ) -> Result<StageUpdate, StageError> {
        let prompt = prompts::context_builder(state);
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
            impacted_modules = reply.impacted_modules.len(),
            dependencies = reply.dependencies.len(),
            risk_areas = reply.risk_areas.len(),
            "context analyzed"
        );
        let detail = format!(
            "{} modules, {} dependencies, {} risk areas",
            reply.impacted_modules.len(),
            reply.dependencies.len(),
            reply.risk_areas.len(),
        );
        Ok(StageUpdate {
            impacted_modules: Some(reply.impacted_modules),
            dependencies: Some(reply.dependencies),
            risk_areas: reply.risk_areas,
            stage_log: vec![StageLogEntry::new(self.name(), "analyzed_context", detail)],
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
    async fn maps_reply_into_replace_and_append_fields() {
        let reply = r#"{
  "impacted_modules": ["auth-service", "login-form"],
  "dependencies": ["users database"],
  "risk_areas": ["session invalidation"]
}"#;
        let stage = ContextBuilder::new(
            Arc::new(invoker_for(FixedProvider::new(vec![reply.into()]))),
            "test-model",
        );
        let state = PipelineState::new(Ticket::default());

        let update = stage.run(&state, &CancellationToken::new()).await.unwrap();

        assert_eq!(
            update.impacted_modules.as_deref().map(<[String]>::len),
            Some(2),
        );
        assert_eq!(update.dependencies.as_deref().map(<[String]>::len), Some(1));
        assert_eq!(update.risk_areas, ["session invalidation"]);
        assert_eq!(update.stage_log[0].action, "analyzed_context");
    }
}
