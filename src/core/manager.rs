//! Memory manager orchestration
//!
//! Composes the registry, placement search, replacement controller and
//! defragmenter into the public load/delete/overwrite/read operations.
//!
//! A load is planned before anything is mutated: victims are chosen from
//! the replacement order and the placement is searched over the layout
//! that would remain without them. Only a plan that fits is committed, so a
//! failed load leaves the manager exactly as it was.

use crate::allocator::{self, find_placement, free_gaps, required_size, AllocationPolicy};
use crate::block::Block;
use crate::config::ManagerConfig;
use crate::defrag::{CompactionReport, Defragmenter};
use crate::error::{MemError, Result};
use crate::registry::BlockRegistry;
use crate::replacement::{ReplacementController, ReplacementPolicy};
use crate::source::{FileMode, PayloadSource};
use crate::unis::UnisImage;
use crate::validation::BlockId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub id: BlockId,
    /// Start address once the load (and any compaction) finished
    pub start_address: u64,
    /// Allocated bytes
    pub size: u64,
    /// Blocks evicted to make room, in eviction order
    pub evicted: Vec<BlockId>,
    /// Set when the load pushed occupancy past the compaction threshold
    pub compaction: Option<CompactionReport>,
}

/// Snapshot of address space usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_size: u64,
    pub page_size: u64,
    pub capacity_pages: u64,
    pub resident_blocks: usize,
    /// Bytes allocated to blocks
    pub used_bytes: u64,
    pub free_bytes: u64,
    /// Bytes of actual content (the rest of `used_bytes` is page padding)
    pub payload_bytes: u64,
    pub free_gaps: usize,
    pub largest_gap: u64,
    pub fragmentation_score: f64,
    pub occupancy_ratio: f64,
    pub allocation: AllocationPolicy,
    pub replacement: ReplacementPolicy,
}

pub struct MemoryManager {
    config: ManagerConfig,
    registry: BlockRegistry,
    replacement: ReplacementController,
    defragmenter: Defragmenter,
}

impl MemoryManager {
    /// Create an empty manager
    pub fn new(config: ManagerConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            "Creating manager: {} bytes, {} byte pages, {}, replacement {}",
            config.total_size, config.page_size, config.allocation, config.replacement
        );

        Ok(MemoryManager {
            registry: BlockRegistry::new(config.total_size),
            replacement: ReplacementController::new(config.replacement),
            defragmenter: Defragmenter::new(config.compaction_threshold),
            config,
        })
    }

    pub fn builder() -> MemoryManagerBuilder {
        MemoryManagerBuilder::new()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn capacity_pages(&self) -> u64 {
        self.config.capacity_pages()
    }

    /// Place a payload under `id`
    ///
    /// Under FIFO/LRU, victims are evicted while the resident count is at
    /// capacity or no gap holds the request. Fails with `InsufficientMemory`
    /// when no placement exists, leaving all state untouched.
    pub fn load(&mut self, id: &str, payload: Vec<u8>) -> Result<LoadOutcome> {
        let id = BlockId::new(id)?;
        if self.registry.contains(id.as_str()) {
            return Err(MemError::DuplicateId(id.into_string()));
        }

        let required = required_size(payload.len(), self.config.page_size);
        debug!(
            "Loading {} ({} bytes -> {} bytes)",
            id,
            payload.len(),
            required
        );

        let (victims, start_address) = self.plan_placement(required)?;

        for victim in &victims {
            self.evict(victim)?;
        }

        self.registry
            .insert(Block::new(id.clone(), start_address, required, payload))?;
        self.replacement.record_load(&id);

        let compaction = if self
            .defragmenter
            .should_compact(self.registry.len(), self.capacity_pages())
        {
            Some(self.defragmenter.compact(&mut self.registry)?)
        } else {
            None
        };

        let start_address = self.registry.find_by_id(id.as_str())?.start_address;
        Ok(LoadOutcome {
            id,
            start_address,
            size: required,
            evicted: victims,
            compaction,
        })
    }

    /// Choose victims and a start address without mutating anything
    fn plan_placement(&self, required: u64) -> Result<(Vec<BlockId>, u64)> {
        let bounded = self.config.replacement.is_bounded();
        let capacity = self.capacity_pages();
        let mut candidates = self.replacement.victim_candidates();
        let mut victims: Vec<BlockId> = Vec::new();

        loop {
            let remaining: Vec<&Block> = self
                .registry
                .list()
                .into_iter()
                .filter(|b| !victims.contains(&b.id))
                .collect();

            let at_capacity =
                bounded && self.replacement.is_at_capacity(remaining.len(), capacity);

            if !at_capacity {
                match find_placement(
                    self.config.allocation,
                    required,
                    &remaining,
                    self.config.total_size,
                ) {
                    Ok(start) => return Ok((victims, start)),
                    Err(err) if !bounded => return Err(err),
                    Err(_) => {}
                }
            }

            match candidates.next() {
                Some(victim) => victims.push(victim.clone()),
                // Every tracked block is already a victim; anything left is
                // resident but untracked
                None if at_capacity => return Err(MemError::NoVictimAvailable),
                None => {
                    return Err(MemError::InsufficientMemory {
                        required,
                        total: self.config.total_size,
                    })
                }
            }
        }
    }

    /// Fetch a payload from `source` and load it under `name`
    pub fn load_from<S: PayloadSource + ?Sized>(
        &mut self,
        source: &S,
        name: &str,
        mode: FileMode,
    ) -> Result<LoadOutcome> {
        let payload = source.fetch(name, mode)?;
        self.load(name, payload)
    }

    fn evict(&mut self, id: &BlockId) -> Result<Block> {
        let block = self.registry.remove(id.as_str())?;
        self.replacement.forget(id.as_str());
        info!(
            "Evicted {} ({}) from [{}, {})",
            id,
            self.config.replacement,
            block.start_address,
            block.end_address()
        );
        Ok(block)
    }

    /// Evict whatever the replacement policy names next
    pub fn evict_next(&mut self) -> Result<Block> {
        let victim = self.replacement.select_victim()?;
        self.evict(&victim)
    }

    pub fn delete(&mut self, id: &str) -> Result<Block> {
        let block = self.registry.remove(id)?;
        self.replacement.forget(id);
        debug!("Deleted {}", id);
        Ok(block)
    }

    /// Delete the block starting at `address`
    pub fn delete_at(&mut self, address: u64) -> Result<Block> {
        let id = self.registry.find_by_address(address)?.id.clone();
        self.delete(id.as_str())
    }

    /// Replace a block's payload; the allocated pages never grow
    pub fn overwrite(&mut self, id: &str, payload: Vec<u8>) -> Result<()> {
        self.registry.overwrite(id, payload)
    }

    pub fn overwrite_at(&mut self, address: u64, payload: Vec<u8>) -> Result<()> {
        let id = self.registry.find_by_address(address)?.id.clone();
        self.overwrite(id.as_str(), payload)
    }

    /// Read a payload, counting as an access for LRU
    pub fn read(&mut self, id: &str) -> Result<&[u8]> {
        let block_id = self.registry.find_by_id(id)?.id.clone();
        self.replacement.record_access(&block_id);
        Ok(&self.registry.find_by_id(id)?.payload)
    }

    pub fn read_at(&mut self, address: u64) -> Result<&[u8]> {
        let id = self.registry.find_by_address(address)?.id.clone();
        self.read(id.as_str())
    }

    /// Look at a block without touching the replacement order
    pub fn peek(&self, id: &str) -> Result<&Block> {
        self.registry.find_by_id(id)
    }

    /// Resident blocks in address order
    pub fn list(&self) -> Vec<&Block> {
        self.registry.list()
    }

    /// Tracked ids in replacement order (see [`ReplacementController::order`])
    pub fn replacement_order(&self) -> Vec<&BlockId> {
        self.replacement.order()
    }

    /// Compact the layout now, regardless of occupancy
    pub fn defragment(&mut self) -> Result<CompactionReport> {
        self.defragmenter.compact(&mut self.registry)
    }

    pub fn stats(&self) -> MemoryStats {
        let blocks = self.registry.list();
        let gaps = free_gaps(&blocks, self.config.total_size);
        let used_bytes = self.registry.used_bytes();

        MemoryStats {
            total_size: self.config.total_size,
            page_size: self.config.page_size,
            capacity_pages: self.capacity_pages(),
            resident_blocks: blocks.len(),
            used_bytes,
            free_bytes: self.config.total_size - used_bytes,
            payload_bytes: blocks.iter().map(|b| b.payload.len() as u64).sum(),
            free_gaps: gaps.len(),
            largest_gap: gaps.iter().map(|g| g.length).max().unwrap_or(0),
            fragmentation_score: allocator::fragmentation_score(&gaps, self.config.page_size),
            occupancy_ratio: Defragmenter::occupancy_ratio(blocks.len(), self.capacity_pages()),
            allocation: self.config.allocation,
            replacement: self.config.replacement,
        }
    }

    /// Snapshot the resident blocks as a `.unis` image
    pub fn to_unis(&self) -> UnisImage {
        UnisImage {
            total_size: self.config.total_size,
            page_size: self.config.page_size,
            blocks: self.registry.list().into_iter().cloned().collect(),
        }
    }

    /// Write a `.unis` file, returning the path written
    pub fn save_unis<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        self.to_unis().save(path)
    }

    /// Rebuild a manager from a `.unis` image
    ///
    /// Geometry comes from the image; policies and threshold from `config`.
    /// Blocks are tracked for replacement in address order since arrival
    /// times are not persisted.
    pub fn restore(config: ManagerConfig, image: UnisImage) -> Result<Self> {
        let config = ManagerConfig {
            total_size: image.total_size,
            page_size: image.page_size,
            ..config
        };
        let mut manager = MemoryManager::new(config)?;

        for (idx, block) in image.blocks.into_iter().enumerate() {
            let page_size = manager.config.page_size;
            if block.size == 0 || block.size % page_size != 0 || block.start_address % page_size != 0 {
                return Err(MemError::Format {
                    line: idx + 2,
                    reason: format!("block {} is not page aligned", block.id),
                });
            }
            let fits = block
                .start_address
                .checked_add(block.size)
                .is_some_and(|end| end <= manager.config.total_size);
            if !fits {
                return Err(MemError::Format {
                    line: idx + 2,
                    reason: format!("block {} runs past the address space", block.id),
                });
            }

            let id = block.id.clone();
            manager.registry.insert(block)?;
            manager.replacement.record_load(&id);
        }

        info!("Restored {} blocks", manager.registry.len());
        Ok(manager)
    }

    /// Read a `.unis` file and restore it
    pub fn open_unis<P: AsRef<Path>>(path: P, config: ManagerConfig) -> Result<Self> {
        let image = UnisImage::load(path.as_ref()).map_err(|e| {
            warn!("Failed to read {:?}: {}", path.as_ref(), e);
            e
        })?;
        Self::restore(config, image)
    }
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("config", &self.config)
            .field("resident_blocks", &self.registry.len())
            .field("replacement", &self.replacement)
            .finish()
    }
}

/// Builder for [`MemoryManager`]
///
/// ```
/// use memsim_rs::{AllocationPolicy, MemoryManager, ReplacementPolicy};
///
/// let manager = MemoryManager::builder()
///     .total_size(4096)
///     .page_size(128)
///     .allocation(AllocationPolicy::WorstFit)
///     .replacement(ReplacementPolicy::Lru)
///     .build()
///     .unwrap();
/// assert_eq!(manager.capacity_pages(), 32);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryManagerBuilder {
    config: ManagerConfig,
}

impl MemoryManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn total_size(mut self, total_size: u64) -> Self {
        self.config.total_size = total_size;
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn allocation(mut self, policy: AllocationPolicy) -> Self {
        self.config.allocation = policy;
        self
    }

    pub fn replacement(mut self, policy: ReplacementPolicy) -> Self {
        self.config.replacement = policy;
        self
    }

    pub fn compaction_threshold(mut self, threshold: f64) -> Self {
        self.config.compaction_threshold = threshold;
        self
    }

    pub fn build(self) -> Result<MemoryManager> {
        MemoryManager::new(self.config)
    }
}

/// A manager shared across threads
///
/// Placement needs a consistent view of every gap, so the whole manager sits
/// behind one lock and each operation holds it for its full duration.
#[derive(Debug, Clone)]
pub struct SharedMemoryManager {
    inner: Arc<Mutex<MemoryManager>>,
}

impl SharedMemoryManager {
    pub fn new(manager: MemoryManager) -> Self {
        SharedMemoryManager {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// Run `f` with exclusive access to the manager
    pub fn with<R>(&self, f: impl FnOnce(&mut MemoryManager) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    pub fn load(&self, id: &str, payload: Vec<u8>) -> Result<LoadOutcome> {
        self.with(|m| m.load(id, payload))
    }

    pub fn delete(&self, id: &str) -> Result<Block> {
        self.with(|m| m.delete(id))
    }

    /// Read a payload into an owned buffer
    pub fn read(&self, id: &str) -> Result<Vec<u8>> {
        self.with(|m| m.read(id).map(|p| p.to_vec()))
    }

    pub fn stats(&self) -> MemoryStats {
        self.with(|m| m.stats())
    }
}
