//! The invoker: one logical remote call with hygiene.
//!
//! Composition order per call: fingerprint → cache lookup (a hit skips the
//! limiter entirely) → rate-limit acquire → provider call with bounded
//! retries → cache store. Only quota/rate exhaustion is retried; every
//! other failure is fatal on the first occurrence.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use caseforge_core::classify::ErrorCategory;
use caseforge_core::retry::{RetryConfig, retry_delay_for};

use crate::cache::ResponseCache;
use crate::fingerprint::fingerprint;
use crate::limiter::{AcquireError, RateLimiter};
use crate::provider::{GenerationRequest, Provider, ProviderError};

/// Result of one successful [`Invoker::invoke`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
    /// The raw response text.
    pub text: String,
    /// Whether the response came from the cache (no remote call issued).
    pub from_cache: bool,
    /// Provider attempts made (0 for a cache hit).
    pub attempts: u32,
}

/// Errors from [`Invoker::invoke`].
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// A non-transient provider failure; retrying cannot help.
    #[error("provider call failed: {source}")]
    Fatal {
        /// The underlying provider error.
        source: ProviderError,
    },

    /// Still failing transiently after the maximum attempt count.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// The final transient error.
        source: ProviderError,
    },

    /// The cancellation token fired.
    #[error("call cancelled")]
    Cancelled,
}

impl InvokeError {
    /// Category of the underlying failure, for user-facing messages.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fatal { source } | Self::RetriesExhausted { source, .. } => source.category(),
            Self::Cancelled => ErrorCategory::Unknown,
        }
    }
}

impl From<AcquireError> for InvokeError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::Cancelled => Self::Cancelled,
        }
    }
}

/// Composes provider, rate limiter, response cache, and retry policy
/// around a single entry point.
///
/// Shared by every stage of a run; safe to share across concurrent runs.
pub struct Invoker {
    provider: Arc<dyn Provider>,
    limiter: Arc<RateLimiter>,
    cache: Option<Arc<ResponseCache>>,
    retry: RetryConfig,
    bypass_lookup: bool,
}

impl Invoker {
    /// Create an invoker. Pass `cache: None` to disable caching entirely.
    #[must_use]
    pub fn new(
        provider: Arc<dyn Provider>,
        limiter: Arc<RateLimiter>,
        cache: Option<Arc<ResponseCache>>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            limiter,
            cache,
            retry,
            bypass_lookup: false,
        }
    }

    /// Skip cache lookups for this invoker while still storing fresh
    /// responses, so a forced re-run refreshes entries for later runs.
    #[must_use]
    pub fn with_bypass_lookup(mut self, bypass: bool) -> Self {
        self.bypass_lookup = bypass;
        self
    }

    /// Issue one logical call: cache → limiter → provider with retry.
    #[instrument(skip_all, fields(target = %request.target))]
    pub async fn invoke(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Generation, InvokeError> {
        let fp = fingerprint(request);

        if let Some(cache) = self.cache.as_deref() {
            if !self.bypass_lookup {
                if let Some(text) = cache.load(&fp) {
                    debug!(fingerprint = %fp, "cache hit");
                    metrics::counter!("caseforge_cache_hits_total").increment(1);
                    return Ok(Generation {
                        text,
                        from_cache: true,
                        attempts: 0,
                    });
                }
            }
            metrics::counter!("caseforge_cache_misses_total").increment(1);
        }

        let mut attempt = 0u32;
        loop {
            let _waited = self.limiter.acquire(cancel).await?;
            metrics::counter!("caseforge_provider_calls_total").increment(1);

            let result = tokio::select! {
                r = self.provider.generate(request) => r,
                () = cancel.cancelled() => return Err(InvokeError::Cancelled),
            };

            match result {
                Ok(text) => {
                    if let Some(cache) = self.cache.as_deref() {
                        cache.store(&fp, &text);
                    }
                    return Ok(Generation {
                        text,
                        from_cache: false,
                        attempts: attempt + 1,
                    });
                }
                Err(ProviderError::Cancelled) => return Err(InvokeError::Cancelled),
                Err(err) if !err.is_transient() => {
                    return Err(InvokeError::Fatal { source: err });
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(InvokeError::RetriesExhausted {
                            attempts: attempt,
                            source: err,
                        });
                    }

                    let delay = retry_delay_for(&self.retry, attempt - 1, &err.message());
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "transient provider failure, retrying",
                    );
                    metrics::counter!(
                        "caseforge_provider_retries_total",
                        "category" => err.category().to_string(),
                    )
                    .increment(1);

                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = cancel.cancelled() => return Err(InvokeError::Cancelled),
                    }
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
