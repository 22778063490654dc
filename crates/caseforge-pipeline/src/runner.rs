//! Sequential pipeline runner.
//!
//! Drives the five stages in order over one [`PipelineState`]. A stage
//! failure or a cancellation stops the run but never discards state: the
//! report always carries everything merged so far, with `elapsed` stamped.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use caseforge_core::state::{PipelineState, StageName};
use caseforge_core::ticket::Ticket;
use caseforge_llm::invoker::{InvokeError, Invoker};

use crate::stage::{ModelSpec, Stage};
use crate::stages::{
    ContextBuilder, CoverageAuditor, TestGenerator, TestStrategy, TicketReader,
};

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// All five stages ran and merged.
    Completed,
    /// A stage's invoke failed; later stages did not run.
    Failed {
        /// The stage that failed.
        stage: StageName,
        /// The underlying invoke failure.
        source: InvokeError,
    },
    /// Cancellation was observed before or during a stage.
    Cancelled {
        /// The stage that was running (or about to run) when cancelled.
        stage: StageName,
    },
}

/// Result of one pipeline run: the accumulated state plus how it ended.
#[derive(Debug)]
pub struct RunReport {
    /// Everything merged up to the point the run stopped.
    pub state: PipelineState,
    /// How the run ended.
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Whether every stage completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed)
    }
}

/// The five-stage generation pipeline.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Build the standard five-stage pipeline over one shared invoker.
    #[must_use]
    pub fn new(invoker: Arc<Invoker>, model: impl Into<ModelSpec>) -> Self {
        let model = model.into();
        Self {
            stages: vec![
                Box::new(TicketReader::new(Arc::clone(&invoker), model.clone())),
                Box::new(ContextBuilder::new(Arc::clone(&invoker), model.clone())),
                Box::new(TestStrategy::new(Arc::clone(&invoker), model.clone())),
                Box::new(TestGenerator::new(Arc::clone(&invoker), model.clone())),
                Box::new(CoverageAuditor::new(invoker, model)),
            ],
        }
    }

    /// Build a pipeline from explicit stages, in the order given.
    #[must_use]
    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Run the pipeline over `ticket` until completion, failure, or
    /// cancellation.
    ///
    /// `on_progress` fires synchronously after each stage's contribution
    /// is merged. The returned report always carries the partial state; the
    /// run never deletes contributions from stages that already finished.
    #[instrument(skip_all, fields(ticket = %ticket.id))]
    pub async fn run(
        &self,
        ticket: Ticket,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(StageName, &PipelineState) + Send,
    ) -> RunReport {
        let started = Instant::now();
        let mut state = PipelineState::new(ticket);
        info!(run_id = %state.run_id, stages = self.stages.len(), "run started");

        for stage in &self.stages {
            let name = stage.name();

            if cancel.is_cancelled() {
                warn!(stage = %name, "run cancelled before stage");
                return Self::finish(state, RunOutcome::Cancelled { stage: name }, started);
            }

            state.current_stage = Some(name);

            let stage_started = Instant::now();
            match stage.run(&state, cancel).await {
                Ok(update) => {
                    state.apply(update);
                    info!(
                        stage = %name,
                        elapsed_ms = stage_started.elapsed().as_millis(),
                        "stage completed"
                    );
                    on_progress(name, &state);
                }
                Err(e) if e.is_cancelled() => {
                    warn!(stage = %name, "run cancelled during stage");
                    return Self::finish(state, RunOutcome::Cancelled { stage: name }, started);
                }
                Err(e) => {
                    let source = e.into_source();
                    warn!(stage = %name, error = %source, "stage failed, stopping run");
                    return Self::finish(
                        state,
                        RunOutcome::Failed {
                            stage: name,
                            source,
                        },
                        started,
                    );
                }
            }
        }

        state.current_stage = None;
        info!(
            test_cases = state.test_cases.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "run completed"
        );
        Self::finish(state, RunOutcome::Completed, started)
    }

    fn finish(mut state: PipelineState, outcome: RunOutcome, started: Instant) -> RunReport {
        state.elapsed = Some(started.elapsed());
        RunReport { state, outcome }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use caseforge_core::classify::ErrorCategory;
    use caseforge_core::state::StageUpdate;
    use caseforge_llm::provider::ProviderError;
    use parking_lot::Mutex;

    use crate::stage::StageError;

    enum Script {
        Contribute(StageUpdate),
        Fail,
        Cancel,
    }

    struct ScriptedStage {
        name: StageName,
        script: Mutex<Option<Script>>,
    }

    impl ScriptedStage {
        fn boxed(name: StageName, script: Script) -> Box<dyn Stage> {
            Box::new(Self {
                name,
                script: Mutex::new(Some(script)),
            })
        }
    }

    #[async_trait]
    impl Stage for ScriptedStage {
        fn name(&self) -> StageName {
            self.name
        }

        async fn run(
            &self,
            _state: &PipelineState,
            _cancel: &CancellationToken,
        ) -> Result<StageUpdate, StageError> {
            match self.script.lock().take().expect("stage run twice") {
                Script::Contribute(update) => Ok(update),
                Script::Fail => Err(StageError::from(InvokeError::Fatal {
                    source: ProviderError::Api {
                        status: 401,
                        message: "401 bad key".into(),
                        category: ErrorCategory::InvalidCredentials,
                    },
                })),
                Script::Cancel => Err(StageError::from(InvokeError::Cancelled)),
            }
        }
    }

    fn ticket() -> Ticket {
        Ticket {
            id: "TASK-1".into(),
            title: "t".into(),
            description: "d".into(),
            ..Ticket::default()
        }
    }

    fn contribution(requirement: &str) -> Script {
        Script::Contribute(StageUpdate {
            clarifications: vec![requirement.to_owned()],
            ..StageUpdate::default()
        })
    }

    #[tokio::test]
    async fn completed_run_merges_all_stages_in_order() {
        let pipeline = Pipeline::with_stages(vec![
            ScriptedStage::boxed(StageName::TicketReader, contribution("from reader")),
            ScriptedStage::boxed(StageName::ContextBuilder, contribution("from builder")),
        ]);

        let mut seen = Vec::new();
        let report = pipeline
            .run(ticket(), &CancellationToken::new(), |stage, _| {
                seen.push(stage);
            })
            .await;

        assert!(report.is_complete());
        assert_eq!(seen, [StageName::TicketReader, StageName::ContextBuilder]);
        assert_eq!(report.state.clarifications, ["from reader", "from builder"]);
        assert!(report.state.current_stage.is_none());
        assert!(report.state.elapsed.is_some());
    }

    #[tokio::test]
    async fn failed_stage_stops_the_run_but_keeps_prior_state() {
        let pipeline = Pipeline::with_stages(vec![
            ScriptedStage::boxed(StageName::TicketReader, contribution("kept")),
            ScriptedStage::boxed(StageName::ContextBuilder, Script::Fail),
            ScriptedStage::boxed(StageName::TestStrategy, contribution("never runs")),
        ]);

        let report = pipeline
            .run(ticket(), &CancellationToken::new(), |_, _| {})
            .await;

        assert_matches!(
            report.outcome,
            RunOutcome::Failed {
                stage: StageName::ContextBuilder,
                ..
            }
        );
        assert_eq!(report.state.clarifications, ["kept"]);
        assert!(report.state.elapsed.is_some());
    }

    #[tokio::test]
    async fn pre_cancelled_token_stops_before_the_first_stage() {
        let pipeline = Pipeline::with_stages(vec![ScriptedStage::boxed(
            StageName::TicketReader,
            contribution("never runs"),
        )]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = pipeline.run(ticket(), &cancel, |_, _| {}).await;

        assert_matches!(
            report.outcome,
            RunOutcome::Cancelled {
                stage: StageName::TicketReader,
            }
        );
        assert!(report.state.clarifications.is_empty());
        assert!(report.state.elapsed.is_some());
    }

    #[tokio::test]
    async fn cancellation_during_a_stage_is_reported_as_cancelled() {
        let pipeline = Pipeline::with_stages(vec![
            ScriptedStage::boxed(StageName::TicketReader, contribution("kept")),
            ScriptedStage::boxed(StageName::ContextBuilder, Script::Cancel),
        ]);

        let report = pipeline
            .run(ticket(), &CancellationToken::new(), |_, _| {})
            .await;

        assert_matches!(
            report.outcome,
            RunOutcome::Cancelled {
                stage: StageName::ContextBuilder,
            }
        );
        assert_eq!(report.state.clarifications, ["kept"]);
    }
}
