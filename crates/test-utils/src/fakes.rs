use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use gencache::errors::{GencacheError, Result};
use gencache::exec::{Task, TaskFuture, TaskRef};
use gencache::finder::{DirectiveFinder, TaskFinder};
use gencache::hash::FileHasher;

/// Tracks how many fake tasks are executing at once.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

/// A task that records its executions instead of spawning a process.
#[derive(Debug)]
pub struct FakeTask {
    path: PathBuf,
    label: String,
    delay: Duration,
    failure: Option<String>,
    runs: AtomicUsize,
    gauge: Option<Arc<ConcurrencyGauge>>,
}

impl FakeTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("fake-gen {}", path.display());
        Self {
            path,
            label,
            delay: Duration::ZERO,
            failure: None,
            runs: AtomicUsize::new(0),
            gauge: None,
        }
    }

    /// Display form, normally the directive's command line.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every execution fail with `output` as the process output.
    pub fn failing(mut self, output: &str) -> Self {
        self.failure = Some(output.to_string());
        self
    }

    pub fn with_gauge(mut self, gauge: Arc<ConcurrencyGauge>) -> Self {
        self.gauge = Some(gauge);
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(GencacheError::Cancelled(self.label.clone()));
        }

        if let Some(gauge) = &self.gauge {
            gauge.enter();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(gauge) = &self.gauge {
            gauge.exit();
        }
        let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(path = ?self.path, label = %self.label, runs, "fake task executed");

        match &self.failure {
            None => Ok(()),
            Some(output) => Err(GencacheError::TaskExecution {
                path: self.path.clone(),
                command: self.label.clone(),
                reason: "exit status: 1".to_string(),
                output: output.clone(),
            }),
        }
    }
}

impl fmt::Display for FakeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Task for FakeTask {
    fn execute(&self, cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(self.run(cancel))
    }

    fn file_path(&self) -> &Path {
        &self.path
    }
}

/// Finder returning a fixed task list regardless of the root.
#[derive(Debug, Default)]
pub struct StaticFinder {
    tasks: Vec<Arc<FakeTask>>,
    fail: bool,
}

impl StaticFinder {
    pub fn new(tasks: Vec<Arc<FakeTask>>) -> Self {
        Self { tasks, fail: false }
    }

    /// A finder whose every scan fails with a discovery error.
    pub fn failing() -> Self {
        Self {
            tasks: Vec::new(),
            fail: true,
        }
    }
}

impl TaskFinder for StaticFinder {
    fn find(&self, root: &Path) -> Result<Vec<TaskRef>> {
        if self.fail {
            return Err(GencacheError::Discovery {
                path: root.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "scan refused"),
            });
        }
        Ok(self
            .tasks
            .iter()
            .map(|t| Arc::clone(t) as TaskRef)
            .collect())
    }
}

/// Real directive discovery, fake execution.
///
/// Every task the wrapped [`DirectiveFinder`] discovers is swapped for a
/// [`FakeTask`] on the same file, so discovery, hashing and caching are real
/// while no generator binary needs to be installed.
#[derive(Debug)]
pub struct FakeExecFinder {
    inner: DirectiveFinder,
    created: Mutex<Vec<Arc<FakeTask>>>,
}

impl FakeExecFinder {
    pub fn new(command: &str) -> Self {
        Self {
            inner: DirectiveFinder::new(command).expect("valid command name"),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Tasks handed out since the last call, in discovery order.
    pub fn take_created(&self) -> Vec<Arc<FakeTask>> {
        std::mem::take(&mut *self.created.lock().unwrap())
    }
}

impl TaskFinder for FakeExecFinder {
    fn find(&self, root: &Path) -> Result<Vec<TaskRef>> {
        let found = self.inner.find(root)?;
        let fakes: Vec<Arc<FakeTask>> = found
            .iter()
            .map(|t| Arc::new(FakeTask::new(t.file_path()).with_label(t.to_string())))
            .collect();

        self.created.lock().unwrap().extend(fakes.iter().cloned());
        Ok(fakes.into_iter().map(|t| t as TaskRef).collect())
    }
}

/// Hasher answering from an in-memory path → digest table.
///
/// Paths missing from the table fail to hash.
#[derive(Debug, Default)]
pub struct MapHasher {
    digests: Mutex<HashMap<PathBuf, String>>,
}

impl MapHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: impl Into<PathBuf>, digest: &str) {
        self.digests
            .lock()
            .unwrap()
            .insert(path.into(), digest.to_string());
    }

    pub fn remove(&self, path: &Path) {
        self.digests.lock().unwrap().remove(path);
    }
}

impl FileHasher for MapHasher {
    fn hash(&self, path: &Path) -> Result<String> {
        self.digests
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| GencacheError::Hash {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no digest registered"),
            })
    }

    fn is_changed(&self, path: &Path, previous: &str) -> bool {
        match self.hash(path) {
            Ok(current) => current != previous,
            Err(_) => true,
        }
    }
}
