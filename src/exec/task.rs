// src/exec/task.rs

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::errors::Result;

/// Boxed future returned by [`Task::execute`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Shared handle to a discovered task.
pub type TaskRef = Arc<dyn Task>;

/// One unit of generation work: a target file plus the command its
/// directive names.
///
/// `Display` renders the command line as a human would type it.
pub trait Task: Send + Sync + fmt::Display + fmt::Debug {
    /// Run the command.
    ///
    /// If `cancel` has already fired the implementation must not start any
    /// work and must fail with [`GencacheError::Cancelled`].
    ///
    /// [`GencacheError::Cancelled`]: crate::errors::GencacheError::Cancelled
    fn execute(&self, cancel: CancellationToken) -> TaskFuture<'_>;

    /// The source file that declared the directive.
    fn file_path(&self) -> &Path;
}
