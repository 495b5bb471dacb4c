// src/config/mod.rs

//! Configuration loading and validation for gencache.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load an optional config file and layer CLI overrides on top (`loader.rs`).
//! - Resolve defaults and validate the result (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_resolve, load_from_path};
pub use model::{DIR_SENTINEL, GenerateConfig, GenerateSection, RawConfigFile};
