//! Payload acquisition
//!
//! The manager never touches the filesystem itself; it asks a
//! [`PayloadSource`] for the bytes of a named file. Any failure surfaces as
//! `SourceUnavailable`.

use crate::error::{MemError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How the file content is interpreted when read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// UTF-8 text
    Text,
    /// Raw bytes
    Binary,
}

/// Supplies the full content of a named file
pub trait PayloadSource {
    fn fetch(&self, name: &str, mode: FileMode) -> Result<Vec<u8>>;
}

/// Reads payloads from files under a base directory
#[derive(Debug, Clone)]
pub struct FsSource {
    base_dir: PathBuf,
}

impl FsSource {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        FsSource {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Default for FsSource {
    fn default() -> Self {
        Self::new(".")
    }
}

impl PayloadSource for FsSource {
    fn fetch(&self, name: &str, mode: FileMode) -> Result<Vec<u8>> {
        let path = self.base_dir.join(name);
        debug!("Reading {:?} as {:?}", path, mode);

        let unavailable = |reason: String| MemError::SourceUnavailable {
            name: name.to_string(),
            reason,
        };

        let bytes = std::fs::read(&path).map_err(|e| unavailable(e.to_string()))?;

        if mode == FileMode::Text {
            std::str::from_utf8(&bytes).map_err(|e| unavailable(format!("not valid text: {}", e)))?;
        }

        Ok(bytes)
    }
}
