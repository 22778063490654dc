//! Stage 1: requirement extraction.

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
    requirements: Vec<String>,
    #[serde(default)]
    criteria_gaps: Vec<String>,
    #[serde(default)]
    clarifications: Vec<String>,
}

/// Extracts testable requirements, acceptance-criteria gaps, and
/// clarifying questions from the raw ticket.
pub struct TicketReader {
    invoker: Arc<Invoker>,
    model: ModelSpec,
}

impl TicketReader {
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
impl Stage for TicketReader {
    fn name(&self) -> StageName {
        StageName::TicketReader
    }

    async fn run(
        &self,
        state: &PipelineState,
        cancel: &CancellationToken,
    ) -> Result<StageUpdate, StageError> {
        let prompt = prompts::ticket_reader(&state.ticket);
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
            requirements = reply.requirements.len(),
            criteria_gaps = reply.criteria_gaps.len(),
            clarifications = reply.clarifications.len(),
            "requirements extracted"
        );
        let detail = format!(
            "{} requirements, {} criteria gaps, {} clarifications",
            reply.requirements.len(),
            reply.criteria_gaps.len(),
            reply.clarifications.len(),
        );
        Ok(StageUpdate {
            requirements: Some(reply.requirements),
            criteria_gaps: reply.criteria_gaps,
            clarifications: reply.clarifications,
            stage_log: vec![StageLogEntry::new(
                self.name(),
                "extracted_requirements",
                detail,
            )],
            ..StageUpdate::default()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
