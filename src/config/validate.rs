// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::config::model::{DIR_SENTINEL, GenerateConfig, GenerateSection};
use crate::engine::default_workers;
use crate::errors::{GencacheError, Result};
use crate::finder::ExcludeSet;
use crate::finder::directive::DEFAULT_EXTENSION;

impl TryFrom<GenerateSection> for GenerateConfig {
    type Error = GencacheError;

    fn try_from(section: GenerateSection) -> std::result::Result<Self, Self::Error> {
        let command = validate_command(section.cmd.as_deref())?;
        let dir = resolve_dir(section.dir.as_deref())?;
        let output = section
            .output
            .filter(|o| !o.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| dir.clone());
        let workers = resolve_workers(section.workers);
        let extensions = validate_extensions(section.extensions)?;
        let exclude = section.exclude.unwrap_or_default();
        ExcludeSet::new(&exclude)?;
        let timeout = validate_timeout(section.timeout_secs)?;

        Ok(GenerateConfig {
            dir,
            command,
            output,
            workers,
            extensions,
            exclude,
            timeout,
        })
    }
}

fn validate_command(cmd: Option<&str>) -> Result<String> {
    let cmd = cmd.map(str::trim).unwrap_or_default();
    if cmd.is_empty() {
        return Err(GencacheError::ConfigError(
            "a generator command is required (--cmd or [generate].cmd)".to_string(),
        ));
    }
    if cmd.chars().any(char::is_whitespace) {
        return Err(GencacheError::ConfigError(format!(
            "generator command must be a single word (got {cmd:?})"
        )));
    }
    Ok(cmd.to_string())
}

fn resolve_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir.map(str::trim) {
        None | Some("") | Some(DIR_SENTINEL) => Ok(std::env::current_dir()?),
        Some(d) => Ok(PathBuf::from(d)),
    }
}

fn resolve_workers(workers: Option<usize>) -> usize {
    match workers {
        None => default_workers(),
        Some(0) => {
            warn!("invalid worker count 0, using 1 instead");
            1
        }
        Some(n) => n,
    }
}

fn validate_extensions(extensions: Option<Vec<String>>) -> Result<Vec<String>> {
    let Some(extensions) = extensions else {
        return Ok(vec![DEFAULT_EXTENSION.to_string()]);
    };

    let normalized: Vec<String> = extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .collect();

    if normalized.is_empty() {
        return Err(GencacheError::ConfigError(
            "at least one source extension is required".to_string(),
        ));
    }
    Ok(normalized)
}

fn validate_timeout(secs: Option<u64>) -> Result<Option<Duration>> {
    match secs {
        Some(0) => Err(GencacheError::ConfigError(
            "timeout must be >= 1 second (got 0)".to_string(),
        )),
        Some(s) => Ok(Some(Duration::from_secs(s))),
        None => Ok(None),
    }
}
