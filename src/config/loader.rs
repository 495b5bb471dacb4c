// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{GenerateConfig, GenerateSection, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; defaults and validation happen
/// in [`load_and_resolve`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!(?path, "loaded config file");

    Ok(config)
}

/// Build the effective run configuration.
///
/// Precedence, highest first: `overrides` (CLI flags), the `[generate]`
/// section of `config_path` (if given), built-in defaults.
pub fn load_and_resolve(
    config_path: Option<&Path>,
    overrides: GenerateSection,
) -> Result<GenerateConfig> {
    let file_section = match config_path {
        Some(path) => load_from_path(path)?.generate,
        None => GenerateSection::default(),
    };

    GenerateConfig::try_from(overrides.over(file_section))
}
