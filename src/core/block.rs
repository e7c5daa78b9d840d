//! Resident blocks of the simulated address space

use crate::validation::BlockId;
use serde::{Deserialize, Serialize};

/// A file placed in the address space
///
/// `start_address` and `size` are always page multiples and
/// `payload.len() <= size`. Only the registry hands out mutable access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Identifier, unique among resident blocks
    pub id: BlockId,
    /// Page-aligned offset into the address space
    pub start_address: u64,
    /// Allocated bytes (whole pages)
    pub size: u64,
    /// File content
    pub payload: Vec<u8>,
}

impl Block {
    pub fn new(id: BlockId, start_address: u64, size: u64, payload: Vec<u8>) -> Self {
        Block {
            id,
            start_address,
            size,
            payload,
        }
    }

    /// First address past the block, saturating at `u64::MAX`
    pub fn end_address(&self) -> u64 {
        self.start_address.saturating_add(self.size)
    }

    /// Check if two blocks share any address
    pub fn overlaps(&self, other: &Block) -> bool {
        self.start_address < other.end_address() && other.start_address < self.end_address()
    }
}
