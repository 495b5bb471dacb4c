// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::cache_file_path;

/// `--dir` value meaning "the current working directory".
pub const DIR_SENTINEL: &str = "...";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [generate]
/// dir = "./src"
/// cmd = "mockgen"
/// output = "./.gencache"
/// workers = 4
/// extensions = ["go"]
/// exclude = ["vendor", "**/testdata/**"]
/// timeout_secs = 600
/// ```
///
/// Every key is optional; CLI flags take precedence over the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub generate: GenerateSection,
}

/// `[generate]` section. Also used as the CLI override layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateSection {
    /// Source directory; `"..."` means the current working directory.
    pub dir: Option<String>,

    /// Generator command name to look for in directives.
    pub cmd: Option<String>,

    /// Where the `<cmd>.sum` cache lives. Defaults to the source directory.
    pub output: Option<String>,

    pub workers: Option<usize>,

    /// Source file extensions to scan, with or without a leading dot.
    pub extensions: Option<Vec<String>>,

    /// Globs (relative to `dir`) that are never scanned.
    pub exclude: Option<Vec<String>>,

    /// Cancel the run after this many seconds.
    pub timeout_secs: Option<u64>,
}

impl GenerateSection {
    /// Layer `self` over `base`: any value set here wins.
    pub fn over(self, base: GenerateSection) -> GenerateSection {
        GenerateSection {
            dir: self.dir.or(base.dir),
            cmd: self.cmd.or(base.cmd),
            output: self.output.or(base.output),
            workers: self.workers.or(base.workers),
            extensions: self.extensions.or(base.extensions),
            exclude: self.exclude.or(base.exclude),
            timeout_secs: self.timeout_secs.or(base.timeout_secs),
        }
    }
}

/// Fully resolved settings for one run.
///
/// Obtain via `GenerateConfig::try_from(GenerateSection)`, which applies
/// defaults and validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateConfig {
    pub dir: PathBuf,
    pub command: String,
    pub output: PathBuf,
    pub workers: usize,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub timeout: Option<Duration>,
}

impl GenerateConfig {
    /// `<output>/<command>.sum`
    pub fn cache_path(&self) -> PathBuf {
        cache_file_path(&self.output, &self.command)
    }
}
