//! On-disk result cache.
//!
//! A flat directory of JSON files, one per key. There is no invalidation:
//! entries live until [`ResultCache::delete`] removes them. When no
//! directory is configured, or the directory is not writable, the cache is
//! disabled and every operation is a no-op that reports "not cached".

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::models::{FootprintMetadata, ProviderRequest};

#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: Option<PathBuf>,
}

impl ResultCache {
    /// A cache rooted at `dir`, created if missing. Disabled if `dir` is
    /// `None` or cannot be written to.
    pub fn new(dir: Option<&Path>) -> Self {
        let dir = dir.and_then(|d| match fs::create_dir_all(d) {
            Ok(()) if is_writable(d) => Some(d.to_path_buf()),
            Ok(()) => {
                warn!(dir = %d.display(), "cache directory is not writable, caching disabled");
                None
            }
            Err(e) => {
                warn!(dir = %d.display(), error = %e, "cannot create cache directory, caching disabled");
                None
            }
        });
        Self { dir }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn is_in_cache(&self, key: &str) -> bool {
        match self.path_for(key) {
            Some(path) => path.is_file(),
            None => false,
        }
    }

    /// Previously written value for `key`, or `None` when absent.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(path) = self.path_for(key) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read(&path)
            .with_context(|| format!("Failed to read cache entry: {}", path.display()))?;
        let value = serde_json::from_slice(&raw)
            .with_context(|| format!("Corrupt cache entry: {}", path.display()))?;
        Ok(Some(value))
    }

    /// Stores `value` under `key`, replacing any previous entry. Returns the
    /// key, or `None` if the cache is disabled.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<Option<String>> {
        validate_key(key)?;
        let Some(path) = self.path_for(key) else {
            return Ok(None);
        };
        let raw = serde_json::to_vec(value)?;
        fs::write(&path, raw)
            .with_context(|| format!("Failed to write cache entry: {}", path.display()))?;
        Ok(Some(key.to_string()))
    }

    /// Removes the entry for `key`. Missing entries are not an error.
    pub fn delete(&self, key: &str) -> Result<()> {
        let Some(path) = self.path_for(key) else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete cache entry: {}", path.display())),
        }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        validate_key(key).ok()?;
        Some(dir.join(key))
    }
}

fn is_writable(dir: &Path) -> bool {
    fs::metadata(dir)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false)
}

fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !ok {
        bail!("invalid cache key: '{}'", key);
    }
    Ok(())
}

/// Deterministic key for a tagging request: hex SHA-256 over the footprint,
/// timestamp, and the ordered tagger names with their options.
pub fn request_key(metadata: &FootprintMetadata, request: &ProviderRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(metadata.footprint.as_deref().unwrap_or("").as_bytes());
    hasher.update([0u8]);
    hasher.update(metadata.timestamp.as_deref().unwrap_or("").as_bytes());
    for (name, options) in request.iter() {
        hasher.update([0u8]);
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(serde_json::Value::Object(options.clone()).to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}
