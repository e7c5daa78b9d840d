//! Validation for block identifiers and `.unis` paths
//!
//! Block ids end up as a whitespace-delimited field of the `.unis` format, so
//! they are restricted to a single printable token.

use crate::error::{MemError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Validated identifier of a resident block
///
/// # Rules
/// - Non-empty, at most 255 bytes
/// - No whitespace (it would split the `.unis` line)
/// - No control characters
///
/// Valid ids: "textFile.txt", "images/cat.png", "ñandú-1"
///
/// Invalid ids: "", "my file", "tab\there"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockId(String);

impl BlockId {
    /// Pattern for a single printable token
    const PATTERN: &'static str = r"^[^\s\p{Cc}]+$";

    /// Maximum length in bytes
    const MAX_LENGTH: usize = 255;

    /// Create a new validated id
    ///
    /// # Errors
    ///
    /// Returns `InvalidId` if the id doesn't meet validation rules.
    ///
    /// # Examples
    ///
    /// ```
    /// use memsim_rs::BlockId;
    ///
    /// let id = BlockId::new("textFile.txt").unwrap();
    /// assert_eq!(id.as_str(), "textFile.txt");
    ///
    /// assert!(BlockId::new("two words").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(BlockId(id))
    }

    fn validate(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(MemError::InvalidId("id cannot be empty".to_string()));
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(MemError::InvalidId(format!(
                "id too long (max {} bytes)",
                Self::MAX_LENGTH
            )));
        }

        if !Self::pattern()?.is_match(id) {
            return Err(MemError::InvalidId(format!(
                "id '{}' must not contain whitespace or control characters",
                id.escape_debug()
            )));
        }

        Ok(())
    }

    fn pattern() -> Result<&'static Regex> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();

        if let Some(re) = PATTERN.get() {
            return Ok(re);
        }
        let re = Regex::new(Self::PATTERN).map_err(|e| MemError::InvalidId(e.to_string()))?;
        Ok(PATTERN.get_or_init(|| re))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BlockId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BlockId {
    type Error = MemError;

    fn try_from(value: String) -> Result<Self> {
        BlockId::new(value)
    }
}

impl From<BlockId> for String {
    fn from(id: BlockId) -> Self {
        id.0
    }
}

/// Normalize a `.unis` output path
///
/// The format always lives in a file ending in `.unis`. Any other name gets
/// the suffix appended, so `dump` becomes `dump.unis` and `dump.txt` becomes
/// `dump.txt.unis`.
///
/// # Examples
///
/// ```
/// use memsim_rs::validation::normalize_unis_path;
/// use std::path::Path;
///
/// let path = normalize_unis_path(Path::new("memory")).unwrap();
/// assert_eq!(path, Path::new("memory.unis"));
///
/// let path = normalize_unis_path(Path::new("/tmp/memory.unis")).unwrap();
/// assert_eq!(path, Path::new("/tmp/memory.unis"));
/// ```
pub fn normalize_unis_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MemError::InvalidConfig(format!("invalid .unis path: {:?}", path)))?;

    if path.extension().and_then(|e| e.to_str()) == Some("unis") {
        return Ok(path.to_path_buf());
    }

    Ok(path.with_file_name(format!("{}.unis", file_name)))
}
