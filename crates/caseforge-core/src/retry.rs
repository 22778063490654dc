//! Retry configuration and backoff calculation.
//!
//! Portable, sync-only building blocks; the async retry loop itself lives
//! in `caseforge-llm`'s invoker (which has access to tokio):
//!
//! - [`RetryConfig`]: attempt cap and delay parameters
//! - [`backoff_delay`]: exponential backoff, capped, no jitter
//! - [`extract_suggested_delay`]: server-suggested delay parsed from error text
//! - [`retry_delay_for`]: precedence of suggestion over backoff

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default maximum attempts per logical call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base backoff delay in seconds.
pub const DEFAULT_BASE_DELAY_SECS: u64 = 15;
/// Default backoff cap in seconds.
pub const DEFAULT_MAX_DELAY_SECS: u64 = 60;
/// Default buffer added on top of a server-suggested delay, in seconds.
pub const DEFAULT_SUGGESTION_BUFFER_SECS: u64 = 1;

/// Configuration for the invoker's retry loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff (default: 15s).
    #[serde(default = "default_base_delay")]
    pub base_delay: Duration,
    /// Cap on the backoff delay (default: 60s).
    #[serde(default = "default_max_delay")]
    pub max_delay: Duration,
    /// Buffer added to a server-suggested delay (default: 1s).
    #[serde(default = "default_suggestion_buffer")]
    pub suggestion_buffer: Duration,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_base_delay() -> Duration {
    Duration::from_secs(DEFAULT_BASE_DELAY_SECS)
}
fn default_max_delay() -> Duration {
    Duration::from_secs(DEFAULT_MAX_DELAY_SECS)
}
fn default_suggestion_buffer() -> Duration {
    Duration::from_secs(DEFAULT_SUGGESTION_BUFFER_SECS)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            suggestion_buffer: default_suggestion_buffer(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backoff calculation
// ─────────────────────────────────────────────────────────────────────────────

/// Exponential backoff delay for a zero-based attempt index.
///
/// Formula: `min(max_delay, base_delay * 2^attempt)`. With the defaults this
/// yields 15s, 30s, 60s, 60s, …
#[must_use]
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
    config.base_delay.saturating_mul(factor).min(config.max_delay)
}

// ─────────────────────────────────────────────────────────────────────────────
// Suggested-delay extraction
// ─────────────────────────────────────────────────────────────────────────────

/// `... Please retry in 13.868766102s.`
static RETRY_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)retry in (\d+\.?\d*)\s*s").unwrap());

/// Protobuf-rendered detail: `retry_delay { seconds: 13 }`.
static RETRY_DELAY_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)retry_delay.*?seconds:\s*(\d+)").unwrap());

/// Scan error text for a server-suggested retry delay.
///
/// Recognizes the two formats quota errors carry: a human-readable
/// `retry in 13.8s` sentence and a protobuf-style `retry_delay` detail.
/// First match wins.
#[must_use]
pub fn extract_suggested_delay(message: &str) -> Option<Duration> {
    for re in [&*RETRY_IN, &*RETRY_DELAY_FIELD] {
        if let Some(captures) = re.captures(message) {
            if let Ok(secs) = captures[1].parse::<f64>() {
                return Some(Duration::from_secs_f64(secs.max(0.0)));
            }
        }
    }
    None
}

/// Delay before the next attempt.
///
/// A server-suggested delay (plus the configured buffer) takes precedence;
/// exponential backoff is the fallback.
#[must_use]
pub fn retry_delay_for(config: &RetryConfig, attempt: u32, message: &str) -> Duration {
    match extract_suggested_delay(message) {
        Some(suggested) => suggested + config.suggestion_buffer,
        None => backoff_delay(config, attempt),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
