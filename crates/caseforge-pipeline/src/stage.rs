//! Stage trait and shared stage plumbing.
//!
//! A stage reads the pipeline state, builds a prompt, calls the invoker,
//! and parses the reply into a [`StageUpdate`]. The only way a stage fails
//! is a failed invoke — a reply that cannot be parsed degrades to an empty
//! contribution with a log entry, and the pipeline continues.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use caseforge_core::state::{PipelineState, StageName, StageUpdate};
use caseforge_llm::invoker::{InvokeError, Invoker};
use caseforge_llm::provider::{GenerationOptions, GenerationRequest};

use crate::extract::extract_json_block;

/// Model id plus the generation options shared by every call a stage makes.
///
/// Options are part of the cache fingerprint, so two runs configured with
/// different temperatures never share cache entries.
#[derive(Clone, Debug)]
pub struct ModelSpec {
    /// Model identifier passed to the provider.
    pub id: String,
    /// Options applied to every request.
    pub options: GenerationOptions,
}

impl ModelSpec {
    /// A spec with default options.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            options: GenerationOptions::default(),
        }
    }

    /// A spec with explicit options.
    #[must_use]
    pub fn with_options(id: impl Into<String>, options: GenerationOptions) -> Self {
        Self {
            id: id.into(),
            options,
        }
    }
}

impl From<&str> for ModelSpec {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModelSpec {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Error from a stage run: the underlying invoke failed.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct StageError {
    #[from]
    source: InvokeError,
}

impl StageError {
    /// Whether the failure was a cancellation rather than an error.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, InvokeError::Cancelled)
    }

    /// Unwrap the underlying invoke error.
    #[must_use]
    pub fn into_source(self) -> InvokeError {
        self.source
    }
}

/// One unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Which stage this is.
    fn name(&self) -> StageName;

    /// Run against the current state and return a partial update.
    async fn run(
        &self,
        state: &PipelineState,
        cancel: &CancellationToken,
    ) -> Result<StageUpdate, StageError>;
}

/// Invoke the model with `prompt` and parse the reply into `T`.
///
/// Returns `Ok(None)` when the reply has no parseable JSON block or the
/// block does not match `T` — the stage then contributes its merge
/// identity. Invoke failures propagate.
pub(crate) async fn generate_parsed<T: DeserializeOwned>(
    invoker: &Invoker,
    stage: StageName,
    model: &ModelSpec,
    prompt: String,
    cancel: &CancellationToken,
) -> Result<Option<T>, StageError> {
    let request = GenerationRequest {
        target: model.id.clone(),
        payload: prompt,
        options: model.options.clone(),
    };
    let generation = invoker.invoke(&request, cancel).await?;

    let Some(block) = extract_json_block(&generation.text) else {
        warn!(stage = %stage, "reply contains no JSON block, contributing nothing");
        return Ok(None);
    };
    match serde_json::from_str::<T>(block) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            warn!(stage = %stage, error = %e, "reply JSON did not match the expected shape");
            Ok(None)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
