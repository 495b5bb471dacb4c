// src/cache.rs

//! Persisted mapping from source file path to the digest observed after its
//! last successful generation.
//!
//! The on-disk format is one entry per line:
//!
//! ```text
//! <path> <digest>
//! ```
//!
//! Entries are never pruned; a path that disappears from the tree simply
//! keeps its stale line.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::errors::{GencacheError, Result};

/// File extension of persisted caches (`<output>/<cmd>.sum`).
pub const CACHE_FILE_EXTENSION: &str = "sum";

/// Default cache location for a given output directory and command name.
pub fn cache_file_path(output_dir: &Path, command: &str) -> PathBuf {
    output_dir.join(format!("{command}.{CACHE_FILE_EXTENSION}"))
}

/// Abstract storage for per-file digests.
///
/// Implementations must tolerate concurrent `get`/`set` from many workers.
pub trait ChangeCache: Send + Sync {
    /// Replace the in-memory state with the persisted one.
    fn load(&self) -> Result<()>;
    /// Persist every in-memory entry.
    fn save(&self) -> Result<()>;
    fn get(&self, path: &str) -> Option<String>;
    fn set(&self, path: &str, digest: &str);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache backed by a text file on disk.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    digests: RwLock<HashMap<String, String>>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            digests: RwLock::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> GencacheError {
        GencacheError::CacheIo {
            path: self.path.clone(),
            source,
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ChangeCache for FileCache {
    fn load(&self) -> Result<()> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "no cache file yet; starting empty");
                self.digests.write().clear();
                return Ok(());
            }
            Err(err) => return Err(self.io_error(err)),
        };

        let map = parse_entries(&contents);
        info!(path = ?self.path, entries = map.len(), "loaded cache");
        *self.digests.write() = map;
        Ok(())
    }

    fn save(&self) -> Result<()> {
        // Snapshot under the read lock, write without holding it.
        let sorted: BTreeMap<String, String> = self
            .digests
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let tmp = self.tmp_path();
        let file = File::create(&tmp).map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(file);
        for (path, digest) in &sorted {
            writeln!(writer, "{path} {digest}").map_err(|e| self.io_error(e))?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;
        drop(writer);

        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        info!(path = ?self.path, entries = sorted.len(), "saved cache");
        Ok(())
    }

    fn get(&self, path: &str) -> Option<String> {
        self.digests.read().get(path).cloned()
    }

    fn set(&self, path: &str, digest: &str) {
        self.digests
            .write()
            .insert(path.to_string(), digest.to_string());
    }

    fn len(&self) -> usize {
        self.digests.read().len()
    }
}

/// Cache that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    digests: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeCache for MemoryCache {
    fn load(&self) -> Result<()> {
        Ok(())
    }

    fn save(&self) -> Result<()> {
        Ok(())
    }

    fn get(&self, path: &str) -> Option<String> {
        self.digests.read().get(path).cloned()
    }

    fn set(&self, path: &str, digest: &str) {
        self.digests
            .write()
            .insert(path.to_string(), digest.to_string());
    }

    fn len(&self) -> usize {
        self.digests.read().len()
    }
}

fn parse_entries(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(' ').collect();
        match fields.as_slice() {
            [path, digest] if !path.is_empty() && !digest.is_empty() => {
                map.insert(path.to_string(), digest.to_string());
            }
            _ => debug!(line, "skipping malformed cache line"),
        }
    }
    map
}
