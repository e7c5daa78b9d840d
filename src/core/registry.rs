//! Authoritative store of resident blocks
//!
//! Blocks are owned here and nowhere else. The registry keeps a canonical
//! id-keyed map plus an address index used for ordered listing and
//! address lookups. The address index is derived state: relocation leaves
//! it stale and [`BlockRegistry::rebuild_address_index`] recomputes it from
//! the canonical map.

use crate::block::Block;
use crate::error::{MemError, Result};
use crate::validation::BlockId;
use ahash::AHashMap;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct BlockRegistry {
    /// Canonical blocks by id
    blocks: AHashMap<BlockId, Block>,

    /// Start address -> id, sorted for neighbour queries
    by_address: BTreeMap<u64, BlockId>,

    /// Size of the address space in bytes
    total_size: u64,
}

impl BlockRegistry {
    pub fn new(total_size: u64) -> Self {
        BlockRegistry {
            blocks: AHashMap::new(),
            by_address: BTreeMap::new(),
            total_size,
        }
    }

    /// Insert a placed block
    ///
    /// Fails with `DuplicateId` if the id is resident and with `Overlap` if
    /// the block collides with a neighbour or runs past the address space.
    pub fn insert(&mut self, block: Block) -> Result<()> {
        if self.blocks.contains_key(&block.id) {
            return Err(MemError::DuplicateId(block.id.into_string()));
        }

        let start = block.start_address;
        let end = block.end_address();
        let in_bounds = start
            .checked_add(block.size)
            .is_some_and(|end| end <= self.total_size);
        if !in_bounds || self.collides(&block) {
            return Err(MemError::Overlap {
                id: block.id.into_string(),
                start,
                end,
            });
        }

        debug!(
            "Registering {} at [{}, {})",
            block.id,
            block.start_address,
            block.end_address()
        );
        self.by_address.insert(block.start_address, block.id.clone());
        self.blocks.insert(block.id.clone(), block);

        Ok(())
    }

    /// Check the nearest neighbours on each side of `block`
    fn collides(&self, block: &Block) -> bool {
        let prev = self
            .by_address
            .range(..=block.start_address)
            .next_back()
            .and_then(|(_, id)| self.blocks.get(id));
        if let Some(prev) = prev {
            if prev.overlaps(block) {
                return true;
            }
        }

        let next = self
            .by_address
            .range(block.start_address..)
            .next()
            .and_then(|(_, id)| self.blocks.get(id));
        if let Some(next) = next {
            if next.overlaps(block) {
                return true;
            }
        }

        false
    }

    /// Remove a block, returning it
    pub fn remove(&mut self, id: &str) -> Result<Block> {
        let block = self
            .blocks
            .remove(id)
            .ok_or_else(|| MemError::NotFound(id.to_string()))?;
        self.by_address.remove(&block.start_address);
        Ok(block)
    }

    pub fn find_by_id(&self, id: &str) -> Result<&Block> {
        self.blocks
            .get(id)
            .ok_or_else(|| MemError::NotFound(id.to_string()))
    }

    /// Look up the block starting exactly at `start_address`
    pub fn find_by_address(&self, start_address: u64) -> Result<&Block> {
        self.by_address
            .get(&start_address)
            .and_then(|id| self.blocks.get(id))
            .ok_or(MemError::AddressNotFound(start_address))
    }

    /// Replace a block's payload in place
    ///
    /// Size and address are fixed; a payload longer than the block's
    /// allocated pages fails with `PayloadTooLarge`.
    pub fn overwrite(&mut self, id: &str, payload: Vec<u8>) -> Result<()> {
        let block = self
            .blocks
            .get_mut(id)
            .ok_or_else(|| MemError::NotFound(id.to_string()))?;

        if payload.len() as u64 > block.size {
            return Err(MemError::PayloadTooLarge {
                id: id.to_string(),
                len: payload.len(),
                size: block.size,
            });
        }

        debug!("Overwriting {} with {} bytes", id, payload.len());
        block.payload = payload;
        Ok(())
    }

    /// All resident blocks in address order
    pub fn list(&self) -> Vec<&Block> {
        self.by_address
            .values()
            .filter_map(|id| self.blocks.get(id))
            .collect()
    }

    /// Move a block to a new start address
    ///
    /// Leaves the address index stale; callers must finish with
    /// [`BlockRegistry::rebuild_address_index`].
    pub(crate) fn relocate(&mut self, id: &str, new_start: u64) -> Result<()> {
        let block = self
            .blocks
            .get_mut(id)
            .ok_or_else(|| MemError::NotFound(id.to_string()))?;
        block.start_address = new_start;
        Ok(())
    }

    /// Recompute the address index from the canonical blocks
    pub fn rebuild_address_index(&mut self) {
        self.by_address = self
            .blocks
            .values()
            .map(|block| (block.start_address, block.id.clone()))
            .collect();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Bytes covered by resident blocks
    pub fn used_bytes(&self) -> u64 {
        self.blocks.values().map(|b| b.size).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}
