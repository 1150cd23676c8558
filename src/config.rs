//! Layered CLI configuration: built-in defaults, then an optional TOML file,
//! then CLI flags — lowest to highest precedence (spec §6, "Configuration
//! surface"). The engine itself has no concept of a config file; this just
//! resolves the four numeric [`crate::campaign::Campaign`] parameters plus
//! the collaborator file paths.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed config file {path}: {source}")]
    Toml { path: PathBuf, source: toml::de::Error },
}

/// The subset of a campaign's tunables a config file may set, plus the
/// collaborator file paths. All fields optional: an absent field keeps the
/// built-in default, or is overridden by a CLI flag at a higher layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub num_threads: Option<usize>,
    pub batch_size: Option<u64>,
    pub lookup_size: Option<u64>,
    pub known_names_path: Option<PathBuf>,
    pub address_dump_path: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })
    }
}

/// Fully resolved configuration: built-in default, overridden by the file (if
/// any), overridden by an explicit CLI flag (if any).
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub num_threads: usize,
    pub batch_size: u64,
    pub lookup_size: u64,
    pub known_names_path: PathBuf,
    pub address_dump_path: PathBuf,
}

/// Built-in defaults: `2^26`/`2^30` batch/lookup size (the more conservative
/// of the two pairs seen in the original call sites), `num_threads = 0`
/// (auto), and the source's own default file names.
impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            num_threads: 0,
            batch_size: 1 << 26,
            lookup_size: 1 << 30,
            known_names_path: PathBuf::from("data/known.txt"),
            address_dump_path: PathBuf::from("addresses.json"),
        }
    }
}

impl ResolvedConfig {
    pub fn with_file(mut self, file: &FileConfig) -> Self {
        if let Some(v) = file.num_threads {
            self.num_threads = v;
        }
        if let Some(v) = file.batch_size {
            self.batch_size = v;
        }
        if let Some(v) = file.lookup_size {
            self.lookup_size = v;
        }
        if let Some(v) = &file.known_names_path {
            self.known_names_path = v.clone();
        }
        if let Some(v) = &file.address_dump_path {
            self.address_dump_path = v.clone();
        }
        self
    }
}
