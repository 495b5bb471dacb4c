// src/finder/directive.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::errors::{GencacheError, Result};
use crate::exec::{ProcessTask, TaskRef};
use crate::finder::TaskFinder;
use crate::finder::patterns::ExcludeSet;

/// Marker that opens a generation directive line.
pub const DIRECTIVE_MARKER: &str = "//go:generate";

/// Source extension scanned when none is configured.
pub const DEFAULT_EXTENSION: &str = "go";

/// Matches directive lines naming one specific command.
///
/// The command name is escaped before being embedded in the pattern, and
/// must be followed by whitespace or the end of the line, so `mockgen` never
/// matches `mockgenx` and `a.b` never matches `axb`.
#[derive(Debug, Clone)]
pub struct DirectiveMatcher {
    command: String,
    re: Regex,
}

impl DirectiveMatcher {
    pub fn new(command: &str) -> Result<Self> {
        let pattern = format!(
            r"(?m)^{marker}[ \t]+({cmd}(?:[ \t][^\r\n]*)?)\r?$",
            marker = regex::escape(DIRECTIVE_MARKER),
            cmd = regex::escape(command),
        );
        let re = Regex::new(&pattern).map_err(|e| {
            GencacheError::ConfigError(format!("cannot build directive matcher for {command:?}: {e}"))
        })?;
        Ok(Self {
            command: command.to_string(),
            re,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Payload of the first matching directive, marker stripped and trimmed.
    pub fn first_match<'a>(&self, contents: &'a str) -> Option<&'a str> {
        self.re
            .captures(contents)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    }
}

/// Finds `//go:generate <command> ...` directives under a directory tree.
///
/// - Symlinks are never followed; a symlinked file yields no task.
/// - Only the first matching directive per file becomes a task.
/// - Files are visited in file-name order, so results are deterministic.
#[derive(Debug, Clone)]
pub struct DirectiveFinder {
    matcher: DirectiveMatcher,
    extensions: Vec<String>,
    exclude: ExcludeSet,
}

impl DirectiveFinder {
    pub fn new(command: &str) -> Result<Self> {
        Ok(Self {
            matcher: DirectiveMatcher::new(command)?,
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            exclude: ExcludeSet::default(),
        })
    }

    /// Replace the scanned extensions (with or without a leading dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_string())
            .collect();
        self
    }

    pub fn with_exclude(mut self, exclude: ExcludeSet) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn command(&self) -> &str {
        self.matcher.command()
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want == ext))
    }

    fn is_excluded(&self, root: &Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        match entry.path().strip_prefix(root) {
            Ok(rel) => self.exclude.is_excluded(rel),
            Err(_) => false,
        }
    }

    fn find_in_file(&self, path: &Path) -> Result<Option<TaskRef>> {
        let bytes = fs::read(path).map_err(|source| GencacheError::Discovery {
            path: path.to_path_buf(),
            source,
        })?;
        let contents = String::from_utf8_lossy(&bytes);

        Ok(self.matcher.first_match(&contents).map(|command_line| {
            debug!(?path, cmd = %command_line, "found directive");
            Arc::new(ProcessTask::new(path, command_line)) as TaskRef
        }))
    }
}

impl TaskFinder for DirectiveFinder {
    fn find(&self, root: &Path) -> Result<Vec<TaskRef>> {
        let mut tasks = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded(root, e));

        for entry in walker {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(root));
                GencacheError::Discovery {
                    path,
                    source: err.into(),
                }
            })?;

            if !entry.file_type().is_file() || !self.is_source_file(entry.path()) {
                continue;
            }

            if let Some(task) = self.find_in_file(entry.path())? {
                tasks.push(task);
            }
        }

        info!(
            root = ?root,
            cmd = %self.command(),
            exclude = ?self.exclude.patterns(),
            found = tasks.len(),
            "directive discovery finished"
        );
        Ok(tasks)
    }
}
