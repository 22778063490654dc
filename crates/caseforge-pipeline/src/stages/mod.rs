//! The five pipeline stages.
//!
//! Each stage is a thin adapter: build a prompt from the state slice it
//! reads, invoke the model, parse the reply DTO, and translate it into a
//! [`StageUpdate`](caseforge_core::state::StageUpdate) plus a log entry.

pub mod context_builder;
pub mod coverage_auditor;
pub mod test_generator;
pub mod test_strategy;
pub mod ticket_reader;

pub use context_builder::ContextBuilder;
pub use coverage_auditor::CoverageAuditor;
pub use test_generator::TestGenerator;
pub use test_strategy::TestStrategy;
pub use ticket_reader::TicketReader;
