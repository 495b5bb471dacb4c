// src/engine/summary.rs

use crate::errors::{GencacheError, Result};

/// What happened to a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The generator ran and the cache now holds the new digest.
    Executed,
    /// Cached digest still matched; nothing ran.
    Skipped,
}

/// Aggregate of one generation pass. Not persisted.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub considered: usize,
    pub executed: usize,
    pub skipped: usize,
    pub errors: Vec<GencacheError>,
}

impl RunSummary {
    pub fn new(considered: usize) -> Self {
        Self {
            considered,
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: Result<TaskOutcome>) {
        match result {
            Ok(TaskOutcome::Executed) => self.executed += 1,
            Ok(TaskOutcome::Skipped) => self.skipped += 1,
            Err(err) => self.errors.push(err),
        }
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold collected task errors into one `GenerationFailed`, keeping the
    /// first as the representative.
    pub fn into_result(mut self) -> Result<RunSummary> {
        if self.errors.is_empty() {
            return Ok(self);
        }
        let failed = self.errors.len();
        let first = self.errors.remove(0);
        Err(GencacheError::GenerationFailed {
            failed,
            first: Box::new(first),
        })
    }
}
