//! Conversion cache storage
//!
//! Records which pages were already converted so interrupted or repeated runs
//! resume instead of starting over. The file store mirrors every change to disk
//! immediately; the memory store exists for tests and dry runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the cache inside the output directory
pub const CACHE_FILE_NAME: &str = ".conversion_cache.json";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Set of converted page ids, each mapped to the path its Markdown was written to
pub trait CacheStore {
    fn contains(&self, page_id: &str) -> bool;

    /// Location a page was written to in an earlier run
    fn get(&self, page_id: &str) -> Option<&str>;

    /// Every recorded location
    fn written_paths(&self) -> Vec<&str>;

    /// Record a page as converted. Implementations persist the entry before returning.
    fn mark_done(&mut self, page_id: &str, written_to: &str) -> Result<(), CacheError>;

    fn flush(&mut self) -> Result<(), CacheError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache path for an output directory
pub fn cache_path(output_dir: &Path) -> PathBuf {
    output_dir.join(CACHE_FILE_NAME)
}

/// JSON file backed cache
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileCache {
    /// Load the cache at `path`. A missing or unreadable file yields an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => parse_entries(&raw).unwrap_or_else(|| {
                log::warn!(
                    "Ignoring malformed cache file {}, starting with an empty cache",
                    path.display()
                );
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                log::warn!("Unable to read cache file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        log::debug!("Loaded {} cache entries from {}", entries.len(), path.display());
        Self { path, entries }
    }

    /// Empty the cache file at `path` if it exists.
    ///
    /// Returns `false` when there was no cache file.
    pub fn clear(path: &Path) -> Result<bool, CacheError> {
        if !path.exists() {
            return Ok(false);
        }
        let mut cache = FileCache {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
        };
        cache.flush()?;
        Ok(true)
    }
}

impl CacheStore for FileCache {
    fn contains(&self, page_id: &str) -> bool {
        self.entries.contains_key(page_id)
    }

    fn get(&self, page_id: &str) -> Option<&str> {
        self.entries.get(page_id).map(String::as_str)
    }

    fn written_paths(&self) -> Vec<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    fn mark_done(&mut self, page_id: &str, written_to: &str) -> Result<(), CacheError> {
        self.entries
            .insert(page_id.to_string(), written_to.to_string());
        self.flush()
    }

    fn flush(&mut self) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomically(&self.path, json.as_bytes()).map_err(|source| CacheError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// In-memory cache, never persisted
#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    entries: BTreeMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl CacheStore for MemoryCache {
    fn contains(&self, page_id: &str) -> bool {
        self.entries.contains_key(page_id)
    }

    fn get(&self, page_id: &str) -> Option<&str> {
        self.entries.get(page_id).map(String::as_str)
    }

    fn written_paths(&self) -> Vec<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    fn mark_done(&mut self, page_id: &str, written_to: &str) -> Result<(), CacheError> {
        self.entries
            .insert(page_id.to_string(), written_to.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CacheError> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Older caches may hold non-string values; any JSON value other than null counts as converted.
fn parse_entries(raw: &str) -> Option<BTreeMap<String, String>> {
    if raw.trim().is_empty() {
        return Some(BTreeMap::new());
    }

    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;

    Some(
        object
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let written_to = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), written_to)
            })
            .collect(),
    )
}

/// Write to a sibling temp file then rename it over `path`
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}
