//! Provider error classification.
//!
//! Matches error text against known patterns to produce an
//! [`ErrorCategory`]. The category drives two decisions: whether the
//! invoker retries (only quota/rate exhaustion is transient) and which
//! actionable message the CLI shows instead of raw failure text.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of a provider error message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rate limit or quota exhaustion. The only transient category.
    QuotaExceeded,
    /// Invalid or missing credentials.
    InvalidCredentials,
    /// Malformed request.
    InvalidRequest,
    /// Server-side failure or overload.
    ServiceUnavailable,
    /// Connectivity failure before the service was reached.
    NetworkUnavailable,
    /// Unrecognized error.
    Unknown,
}

impl ErrorCategory {
    /// Whether the invoker should retry after waiting.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }

    /// Short actionable message shown to users in place of raw error text.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::QuotaExceeded => "API quota exceeded — wait a moment and try again",
            Self::InvalidCredentials => "Invalid credentials — check your API key",
            Self::InvalidRequest => "Invalid request — the prompt or options were rejected",
            Self::ServiceUnavailable => "Service unavailable — try again in a moment",
            Self::NetworkUnavailable => "Network unavailable — check your connection",
            Self::Unknown => "An unexpected error occurred",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded => write!(f, "quota_exceeded"),
            Self::InvalidCredentials => write!(f, "invalid_credentials"),
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::NetworkUnavailable => write!(f, "network_unavailable"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern matching
// ─────────────────────────────────────────────────────────────────────────────

struct ErrorPattern {
    check: fn(&str) -> bool,
    category: ErrorCategory,
}

/// All known error patterns, checked in order. Quota patterns come first so
/// a `429` inside a longer server message still classifies as transient.
static PATTERNS: &[ErrorPattern] = &[
    // Quota / rate exhaustion
    ErrorPattern {
        check: |s| s.contains("429"),
        category: ErrorCategory::QuotaExceeded,
    },
    ErrorPattern {
        check: |s| s.contains("quota"),
        category: ErrorCategory::QuotaExceeded,
    },
    ErrorPattern {
        check: |s| s.contains("rate"),
        category: ErrorCategory::QuotaExceeded,
    },
    // Credentials
    ErrorPattern {
        check: |s| s.contains("401") || s.contains("403"),
        category: ErrorCategory::InvalidCredentials,
    },
    ErrorPattern {
        check: |s| s.contains("unauthorized") || s.contains("api key"),
        category: ErrorCategory::InvalidCredentials,
    },
    // Server errors
    ErrorPattern {
        check: |s| s.contains("500") || s.contains("503"),
        category: ErrorCategory::ServiceUnavailable,
    },
    ErrorPattern {
        check: |s| s.contains("internal error") || s.contains("overloaded"),
        category: ErrorCategory::ServiceUnavailable,
    },
    // Invalid request
    ErrorPattern {
        check: |s| s.contains("400") || s.contains("invalid argument"),
        category: ErrorCategory::InvalidRequest,
    },
    // Network
    ErrorPattern {
        check: |s| {
            s.contains("dns") || s.contains("connection") || s.contains("timed out") || s.contains("network")
        },
        category: ErrorCategory::NetworkUnavailable,
    },
];

/// Classify an error message. First matching pattern wins; anything
/// unrecognized is [`ErrorCategory::Unknown`]. Matching is case-insensitive.
#[must_use]
pub fn classify(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    for pattern in PATTERNS {
        if (pattern.check)(&lower) {
            return pattern.category;
        }
    }
    ErrorCategory::Unknown
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
