//! Content-addressed response cache.
//!
//! One `<fingerprint>.json` file per entry under the cache directory.
//! Expiry is lazy: an entry older than the TTL is deleted by the lookup
//! that finds it. Corrupt or unreadable entries are treated as misses and
//! removed. Stores are best-effort — IO failures are logged and swallowed,
//! never surfaced to the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default entry time-to-live: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// On-disk shape of one cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    response: String,
    created_at: DateTime<Utc>,
}

/// Live/expired entry counts, for observability only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries still within the TTL.
    pub live: usize,
    /// Entries past the TTL (not yet lazily deleted).
    pub expired: usize,
}

/// File-backed response cache keyed by request fingerprint.
///
/// Safe to share across concurrent pipeline runs: the read-modify-write
/// sequences (lookup + expiry-delete, store-overwrite) run under a mutex.
pub struct ResponseCache {
    dir: PathBuf,
    ttl: chrono::TimeDelta,
    lock: Mutex<()>,
}

impl ResponseCache {
    /// Open (creating if necessary) a cache directory.
    pub fn open(dir: impl Into<PathBuf>, ttl: Duration) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let ttl = chrono::TimeDelta::from_std(ttl)
            .unwrap_or_else(|_| chrono::TimeDelta::seconds(i64::MAX / 1_000));
        Ok(Self {
            dir,
            ttl,
            lock: Mutex::new(()),
        })
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{fingerprint}.json"))
    }

    /// Look up a response by fingerprint.
    ///
    /// Returns `None` on absence, expiry (deleting the stale file), or a
    /// corrupt entry (also deleted).
    pub fn load(&self, fingerprint: &str) -> Option<String> {
        let _guard = self.lock.lock();
        let path = self.entry_path(fingerprint);
        if !path.exists() {
            return None;
        }

        match read_entry(&path) {
            Ok(entry) => {
                if Utc::now() - entry.created_at > self.ttl {
                    debug!(fingerprint, "cache entry expired, removing");
                    remove_quietly(&path);
                    return None;
                }
                Some(entry.response)
            }
            Err(e) => {
                warn!(fingerprint, error = %e, "unreadable cache entry, removing");
                remove_quietly(&path);
                None
            }
        }
    }

    /// Store a response, overwriting any prior entry for the fingerprint.
    ///
    /// Best-effort: failures are logged and swallowed.
    pub fn store(&self, fingerprint: &str, response: &str) {
        let _guard = self.lock.lock();
        let entry = CacheEntry {
            fingerprint: fingerprint.to_owned(),
            response: response.to_owned(),
            created_at: Utc::now(),
        };
        let path = self.entry_path(fingerprint);
        let result = serde_json::to_string_pretty(&entry)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&path, json));
        if let Err(e) = result {
            warn!(fingerprint, error = %e, "failed to write cache entry");
        }
    }

    /// Count live and expired entries without deleting anything.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let _guard = self.lock.lock();
        let mut stats = CacheStats::default();
        for path in self.entry_files() {
            match read_entry(&path) {
                Ok(entry) if Utc::now() - entry.created_at <= self.ttl => stats.live += 1,
                _ => stats.expired += 1,
            }
        }
        stats
    }

    /// Remove all entry files. Returns the number removed.
    pub fn clear(&self) -> usize {
        let _guard = self.lock.lock();
        let mut removed = 0;
        for path in self.entry_files() {
            if std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }
}

fn read_entry(path: &Path) -> std::io::Result<CacheEntry> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove cache entry");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
