//! Pipeline state and merge semantics.
//!
//! One [`PipelineState`] value is threaded through all five stages. Each
//! stage returns a [`StageUpdate`]; the runner merges it with
//! [`PipelineState::apply`]. Fields fall into two families:
//!
//! - **Replace fields** — a stage's contribution overwrites the previous
//!   value (`Some(v)` wins, `None` preserves).
//! - **Append fields** — contributions accumulate in arrival order, never
//!   deduplicated.
//!
//! `apply` destructures the update exhaustively, so adding a field to
//! [`StageUpdate`] without deciding its merge family is a compile error.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ids::RunId;
use crate::ticket::{TestCase, Ticket};

// ─────────────────────────────────────────────────────────────────────────────
// Stage names
// ─────────────────────────────────────────────────────────────────────────────

/// The five pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Extracts requirements and acceptance-criteria gaps from the ticket.
    TicketReader,
    /// Identifies impacted modules, dependencies, and risk areas.
    ContextBuilder,
    /// Builds the roadmap of test categories and scenarios.
    TestStrategy,
    /// Generates test cases per roadmap category.
    TestGenerator,
    /// Audits the generated cases for coverage gaps.
    CoverageAuditor,
}

impl StageName {
    /// All stages in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::TicketReader,
        Self::ContextBuilder,
        Self::TestStrategy,
        Self::TestGenerator,
        Self::CoverageAuditor,
    ];

    /// Stable snake_case identifier (also the `Display` form).
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::TicketReader => "ticket_reader",
            Self::ContextBuilder => "context_builder",
            Self::TestStrategy => "test_strategy",
            Self::TestGenerator => "test_generator",
            Self::CoverageAuditor => "coverage_auditor",
        }
    }

    /// Human-readable label for progress output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::TicketReader => "Ticket Reader",
            Self::ContextBuilder => "Context Builder",
            Self::TestStrategy => "Test Strategy",
            Self::TestGenerator => "Test Generator",
            Self::CoverageAuditor => "Coverage Auditor",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage log
// ─────────────────────────────────────────────────────────────────────────────

/// One audit-log entry recorded by a stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLogEntry {
    /// Stage that produced the entry.
    pub stage: StageName,
    /// Short action tag, e.g. `"extracted_requirements"`.
    pub action: String,
    /// Free-form detail (counts, skip reasons).
    pub detail: String,
    /// When the entry was recorded.
    pub at: DateTime<Utc>,
}

impl StageLogEntry {
    /// Create an entry timestamped now.
    #[must_use]
    pub fn new(stage: StageName, action: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            stage,
            action: action.into(),
            detail: detail.into(),
            at: Utc::now(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage update
// ─────────────────────────────────────────────────────────────────────────────

/// A stage's partial contribution to the pipeline state.
///
/// `StageUpdate::default()` is the merge identity: applying it changes
/// nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StageUpdate {
    // Replace fields: `Some` overwrites, `None` leaves the state as-is.
    /// Extracted testable requirements.
    pub requirements: Option<Vec<String>>,
    /// Modules impacted by the change.
    pub impacted_modules: Option<Vec<String>>,
    /// External dependencies (APIs, databases, services).
    pub dependencies: Option<Vec<String>>,
    /// Test roadmap: category → planned scenarios, insertion-ordered.
    pub roadmap: Option<IndexMap<String, Vec<String>>>,

    // Append fields: extended onto the state, empty contributes nothing.
    /// Gaps found in the acceptance criteria.
    pub criteria_gaps: Vec<String>,
    /// Risk areas needing extra attention.
    pub risk_areas: Vec<String>,
    /// Generated test cases.
    pub test_cases: Vec<TestCase>,
    /// Coverage gaps found by the auditor.
    pub coverage_gaps: Vec<String>,
    /// Open questions for the ticket author.
    pub clarifications: Vec<String>,
    /// Audit-log entries.
    pub stage_log: Vec<StageLogEntry>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline state
// ─────────────────────────────────────────────────────────────────────────────

/// The accumulating record threaded through the pipeline.
///
/// Owned exclusively by one run; never shared across concurrent runs.
/// Fields a stage has not yet produced hold their empty defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique identifier for this run.
    pub run_id: RunId,
    /// The input work item.
    pub ticket: Ticket,

    // Replace fields.
    /// Extracted testable requirements.
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Modules impacted by the change.
    #[serde(default)]
    pub impacted_modules: Vec<String>,
    /// External dependencies.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Test roadmap: category → planned scenarios, insertion-ordered.
    #[serde(default)]
    pub roadmap: IndexMap<String, Vec<String>>,
    /// Stage currently executing; `None` when idle or finished.
    #[serde(default)]
    pub current_stage: Option<StageName>,

    // Append fields.
    /// Gaps found in the acceptance criteria.
    #[serde(default)]
    pub criteria_gaps: Vec<String>,
    /// Risk areas needing extra attention.
    #[serde(default)]
    pub risk_areas: Vec<String>,
    /// Generated test cases, in generation order.
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    /// Coverage gaps found by the auditor.
    #[serde(default)]
    pub coverage_gaps: Vec<String>,
    /// Open questions for the ticket author.
    #[serde(default)]
    pub clarifications: Vec<String>,
    /// Audit log, one or more entries per stage.
    #[serde(default)]
    pub stage_log: Vec<StageLogEntry>,

    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Total wall-clock time, stamped by the runner on every outcome.
    #[serde(default)]
    pub elapsed: Option<Duration>,
}

impl PipelineState {
    /// Create the initial state for a ticket: append fields empty, replace
    /// fields at their defaults.
    #[must_use]
    pub fn new(ticket: Ticket) -> Self {
        Self {
            run_id: RunId::new(),
            ticket,
            requirements: Vec::new(),
            impacted_modules: Vec::new(),
            dependencies: Vec::new(),
            roadmap: IndexMap::new(),
            current_stage: None,
            criteria_gaps: Vec::new(),
            risk_areas: Vec::new(),
            test_cases: Vec::new(),
            coverage_gaps: Vec::new(),
            clarifications: Vec::new(),
            stage_log: Vec::new(),
            started_at: Utc::now(),
            elapsed: None,
        }
    }

    /// Merge a stage's contribution into the state.
    ///
    /// Replace fields: `Some` overwrites, `None` preserves. Append fields:
    /// extended in call order, no deduplication.
    pub fn apply(&mut self, update: StageUpdate) {
        let StageUpdate {
            requirements,
            impacted_modules,
            dependencies,
            roadmap,
            criteria_gaps,
            risk_areas,
            test_cases,
            coverage_gaps,
            clarifications,
            stage_log,
        } = update;

        if let Some(v) = requirements {
            self.requirements = v;
        }
        if let Some(v) = impacted_modules {
            self.impacted_modules = v;
        }
        if let Some(v) = dependencies {
            self.dependencies = v;
        }
        if let Some(v) = roadmap {
            self.roadmap = v;
        }

        self.criteria_gaps.extend(criteria_gaps);
        self.risk_areas.extend(risk_areas);
        self.test_cases.extend(test_cases);
        self.coverage_gaps.extend(coverage_gaps);
        self.clarifications.extend(clarifications);
        self.stage_log.extend(stage_log);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
