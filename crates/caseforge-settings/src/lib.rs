//! # caseforge-settings
//!
//! Configuration management with layered sources for CaseForge.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`Settings::default()`]
//! 2. **User file** — `~/.caseforge/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `CASEFORGE_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_the_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.model.model, "gemini-2.0-flash");
        assert_eq!(settings.model.api_key_env, "GEMINI_API_KEY");
        assert!((settings.model.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.rate_limit.max_calls, 5);
        assert_eq!(settings.rate_limit.window_secs, 60);
        assert!(settings.cache.enabled);
        assert!(settings.cache.dir.is_none());
        assert_eq!(settings.cache.ttl_secs, 3600);
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.base_delay_secs, 15);
        assert_eq!(settings.retry.max_delay_secs, 60);
    }

    #[test]
    fn deep_merge_re_exported() {
        let a = serde_json::json!({"x": 1});
        let b = serde_json::json!({"y": 2});
        let merged = deep_merge(a, b);
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }
}
