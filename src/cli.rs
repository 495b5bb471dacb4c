// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::GenerateSection;

/// Command-line arguments for `gencache`.
///
/// Every option that also exists in the config file is optional here so
/// that an unset flag does not shadow the file's value.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gencache",
    version,
    about = "Run //go:generate directives for one command, skipping files whose content has not changed.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to scan. `...` means the current working directory.
    #[arg(short = 'd', long, value_name = "PATH")]
    pub dir: Option<String>,

    /// Generator command to run (e.g. `mockgen`).
    #[arg(short = 'c', long, value_name = "COMMAND")]
    pub cmd: Option<String>,

    /// Directory holding the `<COMMAND>.sum` cache (default: the scanned dir).
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<String>,

    /// Maximum generators running at once (default: 2 x CPUs, at most 8).
    #[arg(short = 'w', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Source file extension to scan; repeatable (default: go).
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Glob, relative to the scanned dir, to skip; repeatable.
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Cancel generation after this many seconds. Running generators finish.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Optional TOML config file with a `[generate]` section.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// List the tasks that would be considered, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GENCACHE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    /// Values given on the command line, as the top config layer.
    pub fn overrides(&self) -> GenerateSection {
        GenerateSection {
            dir: self.dir.clone(),
            cmd: self.cmd.clone(),
            output: self.output.clone(),
            workers: self.workers,
            extensions: non_empty(&self.extensions),
            exclude: non_empty(&self.exclude),
            timeout_secs: self.timeout,
        }
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_flags() {
        let args = CliArgs::try_parse_from([
            "gencache", "-d", "./src", "-c", "mockgen", "-o", "./gen", "-w", "4",
        ])
        .unwrap();
        let o = args.overrides();
        assert_eq!(o.dir.as_deref(), Some("./src"));
        assert_eq!(o.cmd.as_deref(), Some("mockgen"));
        assert_eq!(o.output.as_deref(), Some("./gen"));
        assert_eq!(o.workers, Some(4));

        let long = CliArgs::try_parse_from([
            "gencache", "--dir=./src", "--cmd=mockgen", "--output=./gen", "--workers=4",
        ])
        .unwrap();
        assert_eq!(long.overrides(), o);
    }

    #[test]
    fn unset_flags_do_not_override() {
        let args = CliArgs::try_parse_from(["gencache"]).unwrap();
        assert_eq!(args.overrides(), GenerateSection::default());
        assert!(!args.dry_run);
    }

    #[test]
    fn repeatable_lists() {
        let args = CliArgs::try_parse_from([
            "gencache", "-c", "protoc", "--ext", "go", "--ext", "proto", "--exclude", "vendor",
        ])
        .unwrap();
        let o = args.overrides();
        assert_eq!(o.extensions, Some(vec!["go".to_string(), "proto".to_string()]));
        assert_eq!(o.exclude, Some(vec!["vendor".to_string()]));
    }

    #[test]
    fn help_is_an_early_exit() {
        let err = CliArgs::try_parse_from(["gencache", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
