//! Manager configuration
//!
//! Loaded from TOML or built in code. Every field has a default matching
//! the classic teaching setup (1 KiB address space, 64 byte pages, best
//! fit, no replacement).
//!
//! ```toml
//! total_size = 4096
//! page_size = 64
//! allocation = "worst-fit"
//! replacement = "lru"
//! compaction_threshold = 0.75
//! ```

use crate::allocator::AllocationPolicy;
use crate::defrag::DEFAULT_COMPACTION_THRESHOLD;
use crate::error::{MemError, Result};
use crate::replacement::ReplacementPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TOTAL_SIZE: u64 = 1024;
pub const DEFAULT_PAGE_SIZE: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Size of the address space in bytes
    pub total_size: u64,
    /// Allocation granule in bytes
    pub page_size: u64,
    /// Placement policy
    pub allocation: AllocationPolicy,
    /// Replacement policy
    pub replacement: ReplacementPolicy,
    /// Occupancy ratio above which loads trigger compaction
    pub compaction_threshold: f64,
}

impl ManagerConfig {
    pub fn new(total_size: u64, page_size: u64) -> Self {
        ManagerConfig {
            total_size,
            page_size,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ManagerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| MemError::InvalidConfig(e.to_string()))
    }

    /// Check geometry and threshold
    ///
    /// The address space must hold at least one page and be a whole number
    /// of pages, so every block boundary stays page aligned.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(MemError::InvalidConfig("page_size must be positive".to_string()));
        }

        if self.total_size < self.page_size {
            return Err(MemError::InvalidConfig(format!(
                "total_size {} is smaller than one page ({})",
                self.total_size, self.page_size
            )));
        }

        if self.total_size % self.page_size != 0 {
            return Err(MemError::InvalidConfig(format!(
                "total_size {} is not a multiple of page_size {}",
                self.total_size, self.page_size
            )));
        }

        if !(self.compaction_threshold > 0.0 && self.compaction_threshold <= 1.0) {
            return Err(MemError::InvalidConfig(format!(
                "compaction_threshold {} must be in (0, 1]",
                self.compaction_threshold
            )));
        }

        Ok(())
    }

    /// Number of pages in the address space
    pub fn capacity_pages(&self) -> u64 {
        self.total_size / self.page_size
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            total_size: DEFAULT_TOTAL_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            allocation: AllocationPolicy::default(),
            replacement: ReplacementPolicy::default(),
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
        }
    }
}
