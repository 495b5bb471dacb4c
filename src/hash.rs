// src/hash.rs

//! Content hashing for change detection.
//!
//! Digests are written as `<algorithm>:<hex>` (e.g. `blake3:af13...`) so the
//! cache file stays readable if the algorithm ever changes. A previous digest
//! with a different or unparseable tag always compares as "changed".

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use blake3::Hasher;
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::{GencacheError, Result};

/// Algorithm tag used by [`ContentHasher`].
pub const BLAKE3_TAG: &str = "blake3";

const READ_CHUNK: usize = 8192;

/// A parsed `<algorithm>:<hex>` digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    pub fn new(algorithm: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            hex: hex.into(),
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Digest {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| format!("digest without algorithm tag: {s:?}"))?;
        if algorithm.is_empty() || hex.is_empty() {
            return Err(format!("malformed digest: {s:?}"));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("digest is not hex: {s:?}"));
        }
        Ok(Digest::new(algorithm, hex.to_ascii_lowercase()))
    }
}

/// Abstract file hasher so the engine can be driven by fakes in tests.
pub trait FileHasher: Send + Sync {
    /// Digest of the file's current bytes, in `<algorithm>:<hex>` form.
    fn hash(&self, path: &Path) -> Result<String>;

    /// Whether the file no longer matches `previous`.
    ///
    /// Must return `true` when the current digest cannot be computed.
    fn is_changed(&self, path: &Path, previous: &str) -> bool;
}

/// BLAKE3 content hasher with a pool of reusable hasher instances.
///
/// Only the file bytes are hashed; mtime and permissions never matter.
#[derive(Default)]
pub struct ContentHasher {
    pool: Mutex<Vec<Hasher>>,
}

impl fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHasher")
            .field("pooled", &self.pool.lock().len())
            .finish()
    }
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    fn checkout(&self) -> Hasher {
        self.pool.lock().pop().unwrap_or_default()
    }

    fn checkin(&self, mut hasher: Hasher) {
        hasher.reset();
        self.pool.lock().push(hasher);
    }

    fn digest_file(&self, path: &Path, hasher: &mut Hasher) -> std::io::Result<String> {
        let mut file = File::open(path)?;
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize().to_hex().to_string())
    }
}

impl FileHasher for ContentHasher {
    fn hash(&self, path: &Path) -> Result<String> {
        let mut hasher = self.checkout();
        let res = self.digest_file(path, &mut hasher);
        self.checkin(hasher);

        let hex = res.map_err(|source| GencacheError::Hash {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Digest::new(BLAKE3_TAG, hex).to_string())
    }

    fn is_changed(&self, path: &Path, previous: &str) -> bool {
        let previous: Digest = match previous.parse() {
            Ok(d) => d,
            Err(reason) => {
                debug!(?path, %reason, "previous digest unusable; treating as changed");
                return true;
            }
        };
        if previous.algorithm() != BLAKE3_TAG {
            debug!(
                ?path,
                algorithm = previous.algorithm(),
                "previous digest uses another algorithm; treating as changed"
            );
            return true;
        }

        match self.hash(path) {
            Ok(current) => current != previous.to_string(),
            Err(err) => {
                debug!(?path, error = %err, "cannot hash file; treating as changed");
                true
            }
        }
    }
}
