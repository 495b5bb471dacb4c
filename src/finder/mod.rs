// src/finder/mod.rs

//! Directive discovery.
//!
//! Walks a source tree and turns every file that carries a matching
//! generation directive into a [`Task`](crate::exec::Task).
//!
//! - [`directive`] owns the walk and the per-file directive matcher.
//! - [`patterns`] compiles the `exclude` globs that prune the walk.

pub mod directive;
pub mod patterns;

use std::path::Path;

use crate::errors::Result;
use crate::exec::TaskRef;

pub use directive::{DIRECTIVE_MARKER, DirectiveFinder, DirectiveMatcher};
pub use patterns::ExcludeSet;

/// Abstract task discovery so the engine can be driven by fakes in tests.
pub trait TaskFinder: Send + Sync {
    /// Every task under `root`. Any I/O error aborts the whole scan.
    fn find(&self, root: &Path) -> Result<Vec<TaskRef>>;
}
