//! Free address ranges between resident blocks

use serde::{Deserialize, Serialize};

/// A maximal free range `[start, start + length)` of the address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// First free address
    pub start: u64,
    /// Free bytes
    pub length: u64,
}

impl Gap {
    pub fn new(start: u64, length: u64) -> Self {
        Gap { start, length }
    }

    /// Check if a request of `required` bytes fits
    pub fn fits(&self, required: u64) -> bool {
        self.length >= required
    }
}
