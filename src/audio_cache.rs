//! Content-addressed cache for synthesized audio
//!
//! Artifacts are keyed by a hash of the synthesis identity (text, voice,
//! model), so identical requests reuse the file on disk instead of calling
//! the provider again. Cleanup is on-demand only.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::error::Result;

/// Age after which cached audio is eligible for cleanup by default
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Directory of cached MP3 artifacts
pub struct AudioCache {
    dir: PathBuf,
}

impl AudioCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache under the system temp directory
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join("lexio-audio"))
    }

    /// Build the cache key for a synthesis identity tuple
    pub fn key(prefix: &str, parts: &[&str]) -> String {
        let hash = blake3::hash(parts.join("-").as_bytes());
        format!("{prefix}{}", hash.to_hex())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.mp3"))
    }

    /// Path of an existing artifact for this key, if one was synthesized before
    pub fn lookup(&self, key: &str) -> Option<PathBuf> {
        let path = self.path_for(key);
        if path.exists() {
            debug!("Audio cache hit: {}", path.display());
            Some(path)
        } else {
            None
        }
    }

    /// Store synthesized bytes and return the artifact path
    pub fn store(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        fs::write(&path, bytes)?;
        debug!("Cached {} byte(s) at {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Remove artifacts whose modification time is older than `max_age`
    pub fn cleanup_older_than(&self, max_age: Duration) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
            return Ok(0);
        };

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if modified < cutoff {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(err) => {
                        warn!("Failed to remove cached audio {}: {}", path.display(), err);
                    }
                }
            }
        }

        if removed > 0 {
            debug!("Removed {} expired audio file(s)", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());

        let key = AudioCache::key("", &["hello", "en-US", "default"]);
        assert!(cache.lookup(&key).is_none());

        let path = cache.store(&key, b"mp3-bytes").unwrap();
        assert_eq!(cache.lookup(&key), Some(path.clone()));
        assert_eq!(fs::read(&path).unwrap(), b"mp3-bytes");
    }

    #[test]
    fn test_key_depends_on_every_part() {
        let base = AudioCache::key("", &["hello", "en-US", "alloy"]);
        assert_eq!(base, AudioCache::key("", &["hello", "en-US", "alloy"]));
        assert_ne!(base, AudioCache::key("", &["hello", "en-GB", "alloy"]));
        assert_ne!(base, AudioCache::key("", &["hello", "en-US", "echo"]));
        assert_ne!(base, AudioCache::key("openai_", &["hello", "en-US", "alloy"]));
        assert!(AudioCache::key("openai_", &["x"]).starts_with("openai_"));
    }

    #[test]
    fn test_cleanup_by_age() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());

        cache.store("old", b"a").unwrap();
        cache.store("older", b"b").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        // nothing is old enough yet
        assert_eq!(cache.cleanup_older_than(Duration::from_secs(3600)).unwrap(), 0);
        assert!(cache.lookup("old").is_some());

        // with a zero horizon everything expires
        assert_eq!(cache.cleanup_older_than(Duration::ZERO).unwrap(), 2);
        assert!(cache.lookup("old").is_none());
        assert!(cache.lookup("older").is_none());
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let cache = AudioCache::new("/nonexistent/lexio-test-cache");
        assert_eq!(cache.cleanup_older_than(DEFAULT_MAX_AGE).unwrap(), 0);
    }
}
