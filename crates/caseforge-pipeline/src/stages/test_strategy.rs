//! Stage 3: roadmap building.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
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
    roadmap: IndexMap<String, Vec<String>>,
    #[serde(default)]
    clarifications: Vec<String>,
}

/// Builds the test roadmap: an ordered map of category to planned
/// scenarios that drives the generator stage.
pub struct TestStrategy {
    invoker: Arc<Invoker>,
    model: ModelSpec,
}

impl TestStrategy {
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
impl Stage for TestStrategy {
    fn name(&self) -> StageName {
        StageName::TestStrategy
    }

    async fn run(
        &self,
        state: &PipelineState,
        cancel: &CancellationToken,
    ) -> Result<StageUpdate, StageError> {
        let prompt = prompts::test_strategy(state);
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

        let scenario_count: usize = reply.roadmap.values().map(Vec::len).sum();
        info!(
            categories = reply.roadmap.len(),
            scenarios = scenario_count,
            "roadmap built"
        );
        let detail = format!(
            "{} categories, {} scenarios",
            reply.roadmap.len(),
            scenario_count,
        );
        Ok(StageUpdate {
            roadmap: Some(reply.roadmap),
            clarifications: reply.clarifications,
            stage_log: vec![StageLogEntry::new(self.name(), "built_roadmap", detail)],
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
    async fn roadmap_keeps_reply_category_order() {
        let reply = r#"```json
{
  "roadmap": {
    "happy_path": ["login with special characters"],
    "negative": ["wrong password", "locked account"],
    "edge_case": ["255-character password"]
  },
  "clarifications": []
}
```"#;
        let stage = TestStrategy::new(
            Arc::new(invoker_for(FixedProvider::new(vec![reply.into()]))),
            "test-model",
        );
        let state = PipelineState::new(Ticket::default());

        let update = stage.run(&state, &CancellationToken::new()).await.unwrap();

        let roadmap = update.roadmap.unwrap();
        let keys: Vec<&str> = roadmap.keys().map(String::as_str).collect();
        assert_eq!(keys, ["happy_path", "negative", "edge_case"]);
        assert_eq!(roadmap["negative"].len(), 2);
        assert_eq!(update.stage_log[0].action, "built_roadmap");
        assert!(update.stage_log[0].detail.contains("3 categories"));
        assert!(update.stage_log[0].detail.contains("4 scenarios"));
    }
}
