// On-disk ETag cache for GET responses.
//
// Each entry is a JSON file holding the response body, the ETag the server
// sent with it and when it was stored. The next GET of the same path sends
// `If-None-Match`; a 304 answer is served from the entry.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cached response body with its validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub etag: String,
    pub body: Value,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(etag: String, body: Value) -> Self {
        Self {
            etag,
            body,
            cached_at: Utc::now(),
        }
    }
}

/// Cache rooted at a directory. Keys are scoped by user so two accounts
/// sharing a machine never see each other's data.
#[derive(Debug, Clone)]
pub struct HttpCache {
    root: PathBuf,
}

impl HttpCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File holding the entry for `path` as seen by `user`.
    pub fn entry_path(&self, user: &str, path: &str) -> PathBuf {
        let key = URL_SAFE_NO_PAD.encode(format!("{user}:{path}"));
        self.root.join(format!("{key}.json"))
    }

    /// Read an entry; `None` when nothing is cached yet.
    pub fn read(&self, user: &str, path: &str) -> Result<Option<CacheEntry>> {
        let file = self.entry_path(user, path);
        if !file.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&file)
            .with_context(|| format!("Failed to read cache file: {}", file.display()))?;
        let entry = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", file.display()))?;
        Ok(Some(entry))
    }

    /// Store an entry, writing to a temp file first and renaming it in place.
    pub fn write(&self, user: &str, path: &str, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create cache directory: {}", self.root.display())
        })?;
        let file = self.entry_path(user, path);
        let contents = serde_json::to_string(entry).context("Failed to serialize cache entry")?;
        let temp = file.with_extension("tmp");
        fs::write(&temp, contents)
            .with_context(|| format!("Failed to write cache temp file: {}", temp.display()))?;
        fs::rename(&temp, &file)
            .with_context(|| format!("Failed to rename cache file: {}", file.display()))?;
        Ok(())
    }
}
