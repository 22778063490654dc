//! # caseforge-core
//!
//! Foundation types for the CaseForge pipeline.
//!
//! This crate provides the shared vocabulary the other CaseForge crates
//! depend on:
//!
//! - **Tickets**: [`Ticket`], [`TestCase`], and their enums
//! - **Pipeline state**: [`PipelineState`] with replace/append merge via
//!   [`StageUpdate`]
//! - **Error classification**: [`classify::ErrorCategory`] mapping provider
//!   error text to actionable categories
//! - **Retry math**: [`retry::RetryConfig`], backoff calculation, and
//!   server-suggested delay extraction
//!
//! [`Ticket`]: ticket::Ticket
//! [`TestCase`]: ticket::TestCase
//! [`PipelineState`]: state::PipelineState
//! [`StageUpdate`]: state::StageUpdate

#![deny(unsafe_code)]

pub mod classify;
pub mod ids;
pub mod retry;
pub mod state;
pub mod ticket;

pub use classify::{ErrorCategory, classify};
pub use ids::RunId;
pub use retry::RetryConfig;
pub use state::{PipelineState, StageLogEntry, StageName, StageUpdate};
pub use ticket::{Comment, Priority, TestCase, Ticket, TicketKind};
