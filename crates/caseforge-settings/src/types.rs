//! Settings type definitions.
//!
//! Each type implements [`Default`] with production default values and is
//! marked `#[serde(default)]`, so a settings file may contain any subset
//! of keys. Unknown keys are ignored.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use caseforge_core::retry::RetryConfig;

/// Root settings type.
///
/// Loaded from `~/.caseforge/settings.json` with defaults applied for
/// missing fields. Environment variables can override specific values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model selection and generation parameters.
    pub model: ModelSettings,
    /// Remote-call rate limiting.
    pub rate_limit: RateLimitSettings,
    /// Response cache behavior.
    pub cache: CacheSettings,
    /// Retry policy for transient failures.
    pub retry: RetrySettings,
}

/// Model selection and generation parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate; provider default when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.3,
            max_output_tokens: None,
        }
    }
}

/// Remote-call rate limiting.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Maximum calls per window.
    pub max_calls: usize,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitSettings {
    /// The window as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_calls: 5,
            window_secs: 60,
        }
    }
}

/// Response cache behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether responses are cached at all.
    pub enabled: bool,
    /// Cache directory; `~/.caseforge/cache` when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,
}

impl CacheSettings {
    /// The cache directory, falling back to `~/.caseforge/cache`.
    #[must_use]
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".caseforge").join("cache")
        })
    }

    /// The entry TTL as a [`Duration`].
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            ttl_secs: 3600,
        }
    }
}

/// Retry policy for transient failures.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts before giving up.
    pub max_attempts: u32,
    /// First backoff delay in seconds.
    pub base_delay_secs: u64,
    /// Backoff cap in seconds.
    pub max_delay_secs: u64,
}

impl RetrySettings {
    /// Convert into the core retry configuration.
    #[must_use]
    pub fn to_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs(self.base_delay_secs),
            max_delay: Duration::from_secs(self.max_delay_secs),
            ..RetryConfig::default()
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 15,
            max_delay_secs: 60,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
