//! # Provider Trait
//!
//! Object-safe abstraction over the remote inference call. A provider takes
//! a [`GenerationRequest`] and returns the raw response text or a
//! [`ProviderError`] whose message drives classification and retry-delay
//! extraction upstream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use caseforge_core::classify::{ErrorCategory, classify};

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Sampling and output options for a generation call.
///
/// Part of the cache fingerprint: two requests with different options are
/// different cache entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature (default: 0.3).
    pub temperature: f32,
    /// Maximum tokens to generate; provider default when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Ask the model for a JSON-only response (default: true).
    pub json_output: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: None,
            json_output: true,
        }
    }
}

/// One logical request to the remote dependency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier, e.g. `"gemini-2.0-flash"`.
    pub target: String,
    /// The prompt text (opaque to this layer).
    pub payload: String,
    /// Generation options.
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Convenience constructor with default options.
    #[must_use]
    pub fn new(target: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            payload: payload.into(),
            options: GenerationOptions::default(),
        }
    }
}

/// Errors that can occur during a provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
        /// Classification of the message.
        category: ErrorCategory,
    },

    /// The API returned a 2xx with no usable candidate text.
    #[error("empty response from provider")]
    EmptyResponse,

    /// The call was cancelled.
    #[error("call cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Error category used for retry decisions and user-facing messages.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            // Transport failures never reached the service; classify treats
            // them as network problems, which are fatal here.
            Self::Http(e) => classify(&e.to_string()),
            Self::Api { category, .. } => *category,
            Self::EmptyResponse | Self::Cancelled => ErrorCategory::Unknown,
        }
    }

    /// Whether a retry after waiting can help.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }

    /// The text that classification and suggested-delay extraction run over.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// The remote inference boundary.
///
/// Implementors must be `Send + Sync`; one instance is shared by every
/// stage of a run (and may be shared across runs).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider identifier, e.g. `"gemini"`.
    fn name(&self) -> &str;

    /// Issue one generation call and return the raw response text.
    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
