//! # caseforge-pipeline
//!
//! The five-stage pipeline that turns a ticket into a test suite:
//!
//! 1. **Ticket Reader** — requirements and acceptance-criteria gaps
//! 2. **Context Builder** — impacted modules, dependencies, risks
//! 3. **Test Strategy** — roadmap of categories and scenarios
//! 4. **Test Generator** — test cases, one call per category
//! 5. **Coverage Auditor** — coverage gaps and open questions
//!
//! The [`Pipeline`] runner sequences the stages, merges each
//! [`StageUpdate`] into the shared state, reports progress after every
//! merge, and honors cooperative cancellation at stage boundaries and
//! inside every wait.
//!
//! [`StageUpdate`]: caseforge_core::StageUpdate

#![deny(unsafe_code)]

pub mod extract;
pub mod prompts;
pub mod runner;
pub mod stage;
pub mod stages;

pub use runner::{Pipeline, RunOutcome, RunReport};
pub use stage::{ModelSpec, Stage, StageError};
