// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`task`] defines the [`Task`] trait the engine dispatches.
//! - [`process`] provides [`ProcessTask`], which runs a discovered directive
//!   as a plain external process next to its source file.
//!
//! Tests substitute their own `Task` implementations to observe scheduling
//! without spawning processes.

pub mod process;
pub mod task;

pub use process::ProcessTask;
pub use task::{Task, TaskFuture, TaskRef};
