#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use gencache::cache::{ChangeCache, FileCache};
use gencache::engine::{EngineOptions, GenerationEngine};
use gencache::finder::{DirectiveFinder, TaskFinder};
use gencache::hash::{ContentHasher, FileHasher};

/// Builder for a scratch source tree full of directive-bearing files.
pub struct SourceTreeBuilder {
    dir: TempDir,
}

impl SourceTreeBuilder {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp dir"),
        }
    }

    /// Write `rel` with arbitrary contents.
    pub fn file(self, rel: &str, contents: &str) -> Self {
        write_file(self.dir.path(), rel, contents);
        self
    }

    /// Write a minimal Go file carrying one `//go:generate` directive.
    pub fn directive(self, rel: &str, command_line: &str) -> Self {
        let contents = format!("package p\n\n//go:generate {command_line}\ntype T interface{{}}\n");
        self.file(rel, &contents)
    }

    pub fn build(self) -> SourceTree {
        SourceTree { dir: self.dir }
    }
}

impl Default for SourceTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A built scratch tree; removed on drop.
pub struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        write_file(self.dir.path(), rel, contents);
    }

    /// Cache file for `command` stored inside the tree.
    pub fn cache_path(&self, command: &str) -> PathBuf {
        gencache::cache::cache_file_path(self.dir.path(), command)
    }
}

fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("creating parent dirs");
    }
    fs::write(&path, contents).expect("writing source file");
}

/// Production engine wired to a real `DirectiveFinder` and `ContentHasher`.
pub fn real_engine(command: &str, cache: Arc<dyn ChangeCache>, workers: usize) -> GenerationEngine {
    let finder: Arc<dyn TaskFinder> =
        Arc::new(DirectiveFinder::new(command).expect("valid command name"));
    let hasher: Arc<dyn FileHasher> = Arc::new(ContentHasher::new());
    GenerationEngine::new(EngineOptions {
        hasher,
        cache,
        finder,
        workers,
    })
}

/// A `FileCache` in `tree` for `command`, already loaded.
pub fn loaded_file_cache(tree: &SourceTree, command: &str) -> Arc<FileCache> {
    let cache = Arc::new(FileCache::new(tree.cache_path(command)));
    cache.load().expect("loading cache");
    cache
}
