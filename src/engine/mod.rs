// src/engine/mod.rs

//! Incremental generation engine.
//!
//! One pass goes: discover tasks → for each task, in parallel and bounded by
//! the [`AdmissionGate`]: compare the cached digest with the file's current
//! content → run the task only if it changed (or was never seen) → store the
//! new digest. Per-task failures are collected, never fail-fast.
//!
//! The engine shares its cache with the caller: loading before and saving after a pass is
//! the caller's job, so one cache can serve several passes.

pub mod pool;
pub mod summary;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::ChangeCache;
use crate::errors::{GencacheError, Result};
use crate::exec::TaskRef;
use crate::finder::TaskFinder;
use crate::hash::FileHasher;

pub use pool::{AdmissionGate, MAX_DEFAULT_WORKERS, default_workers};
pub use summary::{RunSummary, TaskOutcome};

/// Collaborators and limits for a [`GenerationEngine`].
pub struct EngineOptions {
    pub hasher: Arc<dyn FileHasher>,
    pub cache: Arc<dyn ChangeCache>,
    pub finder: Arc<dyn TaskFinder>,
    /// Maximum tasks in flight; `0` is treated as `1`.
    pub workers: usize,
}

pub struct GenerationEngine {
    hasher: Arc<dyn FileHasher>,
    cache: Arc<dyn ChangeCache>,
    finder: Arc<dyn TaskFinder>,
    workers: usize,
}

impl std::fmt::Debug for GenerationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationEngine")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

/// Everything a worker needs, cloned per task.
#[derive(Clone)]
struct Worker {
    hasher: Arc<dyn FileHasher>,
    cache: Arc<dyn ChangeCache>,
    gate: AdmissionGate,
    cancel: CancellationToken,
}

impl GenerationEngine {
    pub fn new(opts: EngineOptions) -> Self {
        let workers = if opts.workers == 0 {
            warn!("worker count 0 requested; using 1");
            1
        } else {
            opts.workers
        };

        Self {
            hasher: opts.hasher,
            cache: opts.cache,
            finder: opts.finder,
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run one pass and fail if any task failed.
    ///
    /// The error reports how many tasks failed plus the first failure. Cache
    /// updates from tasks that did succeed stay in the cache either way.
    pub async fn generate(&self, cancel: &CancellationToken, root: &Path) -> Result<RunSummary> {
        self.run_pass(cancel, root).await?.into_result()
    }

    /// Run one pass, returning per-task failures inside the summary.
    ///
    /// Only a discovery failure is returned as `Err`; in that case no task
    /// has run.
    pub async fn run_pass(&self, cancel: &CancellationToken, root: &Path) -> Result<RunSummary> {
        let started = Instant::now();
        let tasks = self.discover(root).await?;

        info!(
            root = ?root,
            tasks = tasks.len(),
            workers = self.workers,
            "dispatching generation tasks"
        );

        let gate = AdmissionGate::new(self.workers);
        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let worker = Worker {
                    hasher: Arc::clone(&self.hasher),
                    cache: Arc::clone(&self.cache),
                    gate: gate.clone(),
                    cancel: cancel.clone(),
                };
                let handle = tokio::spawn(worker.process(Arc::clone(&task)));
                (task, handle)
            })
            .collect();

        let mut summary = RunSummary::new(handles.len());
        for (task, handle) in handles {
            let result = match handle.await {
                Ok(res) => res,
                Err(join_err) => Err(GencacheError::TaskExecution {
                    path: task.file_path().to_path_buf(),
                    command: task.to_string(),
                    reason: format!("worker aborted: {join_err}"),
                    output: String::new(),
                }),
            };
            summary.record(result);
        }

        info!(
            considered = summary.considered,
            executed = summary.executed,
            skipped = summary.skipped,
            failed = summary.failed(),
            elapsed = ?started.elapsed(),
            "generation pass finished"
        );
        Ok(summary)
    }

    async fn discover(&self, root: &Path) -> Result<Vec<TaskRef>> {
        let finder = Arc::clone(&self.finder);
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || finder.find(&root))
            .await
            .map_err(|e| anyhow!("directive discovery aborted: {e}"))?
    }
}

impl Worker {
    async fn process(self, task: TaskRef) -> Result<TaskOutcome> {
        let res = self.process_inner(&task).await;
        if let Err(err) = &res {
            error!(path = ?task.file_path(), cmd = %task, error = %err, "generation task failed");
        }
        res
    }

    async fn process_inner(&self, task: &TaskRef) -> Result<TaskOutcome> {
        let _permit = self
            .gate
            .admit(&self.cancel)
            .await
            .ok_or_else(|| GencacheError::Cancelled(task.to_string()))?;

        let path = task.file_path().to_path_buf();
        let key = cache_key(&path);

        if let Some(previous) = self.cache.get(&key) {
            if !self.is_changed(&path, previous).await {
                debug!(path = ?path, "content unchanged; skipping");
                return Ok(TaskOutcome::Skipped);
            }
        }

        task.execute(self.cancel.clone()).await?;

        // A failed re-hash leaves the old entry in place so the next run retries.
        let digest = self.hash(&path).await?;
        self.cache.set(&key, &digest);
        debug!(path = ?path, %digest, "cache updated");

        Ok(TaskOutcome::Executed)
    }

    async fn is_changed(&self, path: &Path, previous: String) -> bool {
        let hasher = Arc::clone(&self.hasher);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || hasher.is_changed(&path, &previous))
            .await
            .unwrap_or(true)
    }

    async fn hash(&self, path: &Path) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let owned: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || hasher.hash(&owned))
            .await
            .map_err(|e| anyhow!("hashing {path:?} aborted: {e}"))?
    }
}

/// Cache key for a target file: its path as discovered.
pub fn cache_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
