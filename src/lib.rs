// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod finder;
pub mod hash;
pub mod logging;

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::{ChangeCache, FileCache};
use crate::cli::CliArgs;
use crate::config::{GenerateConfig, load_and_resolve};
use crate::engine::{EngineOptions, GenerationEngine};
use crate::finder::{DirectiveFinder, ExcludeSet, TaskFinder};
use crate::hash::ContentHasher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution (CLI over optional TOML over defaults)
/// - directive discovery
/// - cache load / save around one generation pass
/// - Ctrl-C and `--timeout` cancellation
pub async fn run(args: CliArgs) -> Result<()> {
    let started = Instant::now();
    let cfg = load_and_resolve(args.config.as_deref(), args.overrides())
        .context("resolving configuration")?;
    info!(
        dir = ?cfg.dir,
        cmd = %cfg.command,
        workers = cfg.workers,
        "starting generation"
    );

    let finder = build_finder(&cfg)?;

    if args.dry_run {
        return print_dry_run(&cfg, &finder);
    }

    let cache = Arc::new(FileCache::new(cfg.cache_path()));
    if let Err(err) = cache.load() {
        warn!(path = ?cache.path(), error = %err, "could not load cache; every task will run");
    }

    let engine = GenerationEngine::new(EngineOptions {
        hasher: Arc::new(ContentHasher::new()),
        cache: Arc::clone(&cache) as Arc<dyn ChangeCache>,
        finder: Arc::new(finder),
        workers: cfg.workers,
    });
    debug!(workers = engine.workers(), cache = ?cache.path(), "engine ready");

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cfg, &cancel);

    let result = engine.generate(&cancel, &cfg.dir).await;

    // Successful tasks' digests are kept even when others failed.
    if let Err(err) = cache.save() {
        warn!(path = ?cache.path(), error = %err, "save cache failed");
    }

    let summary = result.context("generation failed")?;
    info!(
        executed = summary.executed,
        skipped = summary.skipped,
        elapsed = ?started.elapsed(),
        "generation completed"
    );
    Ok(())
}

/// Build the production finder for a resolved config.
pub fn build_finder(cfg: &GenerateConfig) -> crate::errors::Result<DirectiveFinder> {
    Ok(DirectiveFinder::new(&cfg.command)?
        .with_extensions(&cfg.extensions)
        .with_exclude(ExcludeSet::new(&cfg.exclude)?))
}

/// Ctrl-C and the optional deadline both stop new tasks from starting.
fn spawn_cancel_triggers(cfg: &GenerateConfig, cancel: &CancellationToken) {
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut presses = 0;
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                presses += 1;
                match interrupt_action(presses) {
                    InterruptAction::Cancel => {
                        warn!("Ctrl+C received; no new generators will start (press again to exit)");
                        cancel.cancel();
                    }
                    InterruptAction::ForceExit => {
                        error!("second Ctrl+C received; exiting without waiting for generators");
                        std::process::exit(INTERRUPT_EXIT_CODE);
                    }
                }
            }
        });
    }

    if let Some(timeout) = cfg.timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!(?timeout, "timeout reached; no new generators will start");
            cancel.cancel();
        });
    }
}

/// Exit status after a forced quit, as shells report for SIGINT.
const INTERRUPT_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// Stop admitting tasks and let running generators finish.
    Cancel,
    /// Quit immediately; the cache is not saved.
    ForceExit,
}

fn interrupt_action(presses: usize) -> InterruptAction {
    if presses <= 1 {
        InterruptAction::Cancel
    } else {
        InterruptAction::ForceExit
    }
}

/// Dry-run output: one `path: command` line per discovered task on stdout.
fn print_dry_run(cfg: &GenerateConfig, finder: &DirectiveFinder) -> Result<()> {
    let tasks = finder
        .find(&cfg.dir)
        .with_context(|| format!("scanning {:?}", cfg.dir))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "gencache dry-run")?;
    writeln!(out, "  cmd   = {}", cfg.command)?;
    writeln!(out, "  cache = {}", cfg.cache_path().display())?;
    writeln!(out, "tasks ({}):", tasks.len())?;
    for task in &tasks {
        writeln!(out, "  {}: {}", task.file_path().display(), task)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_interrupt_cancels_second_forces_exit() {
        assert_eq!(interrupt_action(1), InterruptAction::Cancel);
        assert_eq!(interrupt_action(2), InterruptAction::ForceExit);
        assert_eq!(interrupt_action(5), InterruptAction::ForceExit);
    }
}
