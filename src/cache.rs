// 🗃️ Table Cache - loaded source tables keyed by path
//
// An entry is reused while the file's modification time and length are
// unchanged. invalidate() and clear() force a reload on the next access.
// The cache is an owned value; there is no process-wide instance.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn read(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        let modified = metadata
            .modified()
            .with_context(|| format!("No modification time for {}", path.display()))?;
        Ok(FileStamp {
            modified,
            len: metadata.len(),
        })
    }
}

#[derive(Debug)]
pub struct CacheEntry<T> {
    pub records: Arc<Vec<T>>,
    pub loaded_at: DateTime<Utc>,
    /// SHA-256 of the file bytes at load time
    pub fingerprint: String,
    stamp: FileStamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub loads: usize,
}

#[derive(Debug)]
pub struct TableCache<T> {
    entries: HashMap<PathBuf, CacheEntry<T>>,
    stats: CacheStats,
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        TableCache {
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }
}

pub fn fingerprint(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

impl<T> TableCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached records for `path`, loading through `load` when the entry is
    /// missing or the file changed since it was read
    pub fn get_or_load<F>(&mut self, path: &Path, load: F) -> Result<Arc<Vec<T>>>
    where
        F: FnOnce(&Path) -> Result<Vec<T>>,
    {
        let stamp = FileStamp::read(path)?;

        if let Some(entry) = self.entries.get(path) {
            if entry.stamp == stamp {
                self.stats.hits += 1;
                debug!(path = %path.display(), "table cache hit");
                return Ok(Arc::clone(&entry.records));
            }
            info!(path = %path.display(), "source file changed, reloading");
        }

        let records = Arc::new(load(path)?);
        let entry = CacheEntry {
            records: Arc::clone(&records),
            loaded_at: Utc::now(),
            fingerprint: fingerprint(path)?,
            stamp,
        };
        debug!(
            path = %path.display(),
            rows = records.len(),
            fingerprint = %entry.fingerprint,
            "table cached"
        );

        self.entries.insert(path.to_path_buf(), entry);
        self.stats.loads += 1;
        Ok(records)
    }

    /// Drop one entry; returns whether it was cached
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entry(&self, path: &Path) -> Option<&CacheEntry<T>> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
