// src/finder/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::Result;

/// Compiled `exclude` globs, matched against `/`-separated paths relative to
/// the scan root (e.g. `"vendor/**"`, `"internal/mocks"`).
#[derive(Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl fmt::Debug for ExcludeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcludeSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl ExcludeSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::default());
        }

        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = Glob::new(pat).with_context(|| format!("invalid exclude pattern: {pat}"))?;
            builder.add(glob);
        }
        let set = builder.build().context("building exclude globset")?;

        Ok(Self {
            patterns: patterns.to_vec(),
            set: Some(set),
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `rel_path` (relative to the scan root) is excluded.
    pub fn is_excluded(&self, rel_path: &Path) -> bool {
        let Some(set) = &self.set else {
            return false;
        };
        let rel = rel_path.to_string_lossy().replace('\\', "/");
        !rel.is_empty() && set.is_match(rel.as_str())
    }
}
