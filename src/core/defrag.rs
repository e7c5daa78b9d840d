//! Compaction of the resident layout
//!
//! Slides every block down to the lowest free address, in address order,
//! so the resident blocks become contiguous from 0 and all free space
//! collects in one trailing gap. Ids, sizes and payloads are untouched, and
//! the replacement order is keyed by id so it survives unchanged.

use crate::allocator::free_gaps;
use crate::error::Result;
use crate::registry::BlockRegistry;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Occupancy ratio above which a load triggers compaction
pub const DEFAULT_COMPACTION_THRESHOLD: f64 = 0.8;

/// Outcome of one compaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionReport {
    /// Blocks whose start address changed
    pub blocks_moved: usize,
    /// Bytes covered by the moved blocks
    pub bytes_moved: u64,
    /// Free gaps before compaction
    pub free_gaps_before: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Defragmenter {
    threshold: f64,
}

impl Defragmenter {
    pub fn new(threshold: f64) -> Self {
        Defragmenter { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Resident blocks per page of capacity
    pub fn occupancy_ratio(resident_count: usize, capacity_pages: u64) -> f64 {
        if capacity_pages == 0 {
            return 0.0;
        }
        resident_count as f64 / capacity_pages as f64
    }

    /// Check whether the occupancy ratio is past the threshold
    pub fn should_compact(&self, resident_count: usize, capacity_pages: u64) -> bool {
        Self::occupancy_ratio(resident_count, capacity_pages) > self.threshold
    }

    /// Repack the registry so blocks are contiguous from address 0
    pub fn compact(&self, registry: &mut BlockRegistry) -> Result<CompactionReport> {
        let free_gaps_before = free_gaps(&registry.list(), registry.total_size()).len();

        let layout: Vec<(String, u64, u64)> = registry
            .list()
            .iter()
            .map(|b| (b.id.as_str().to_string(), b.start_address, b.size))
            .collect();

        let mut report = CompactionReport {
            free_gaps_before,
            ..CompactionReport::default()
        };
        let mut next_free = 0u64;

        for (id, start, size) in layout {
            if start != next_free && start >= next_free {
                registry.relocate(&id, next_free)?;
                report.blocks_moved += 1;
                report.bytes_moved += size;
            }
            next_free += size;
        }

        registry.rebuild_address_index();

        if report.blocks_moved > 0 {
            info!(
                "Compacted {} blocks ({} bytes) out of {} free gaps",
                report.blocks_moved, report.bytes_moved, report.free_gaps_before
            );
        }

        Ok(report)
    }
}

impl Default for Defragmenter {
    fn default() -> Self {
        Self::new(DEFAULT_COMPACTION_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::validation::BlockId;

    fn block(id: &str, start: u64, size: u64, payload: &[u8]) -> Block {
        Block::new(BlockId::new(id).unwrap(), start, size, payload.to_vec())
    }

    #[test]
    fn test_threshold() {
        let defrag = Defragmenter::default();
        assert!(!defrag.should_compact(12, 16)); // 0.75
        assert!(!defrag.should_compact(8, 10)); // exactly 0.8
        assert!(defrag.should_compact(14, 16)); // 0.875
    }

    #[test]
    fn test_compaction_contiguity() {
        let mut reg = BlockRegistry::new(1024);
        reg.insert(block("a", 64, 128, b"aa")).unwrap();
        reg.insert(block("b", 320, 64, b"bb")).unwrap();
        reg.insert(block("c", 512, 192, b"cc")).unwrap();

        let report = Defragmenter::default().compact(&mut reg).unwrap();
        assert_eq!(report.blocks_moved, 3);
        assert_eq!(report.bytes_moved, 384);
        assert_eq!(report.free_gaps_before, 4);

        let blocks = reg.list();
        let layout: Vec<(&str, u64, u64)> = blocks
            .iter()
            .map(|b| (b.id.as_str(), b.start_address, b.size))
            .collect();
        assert_eq!(layout, vec![("a", 0, 128), ("b", 128, 64), ("c", 192, 192)]);
        assert_eq!(blocks[2].payload, b"cc");

        // Address index was rebuilt
        assert_eq!(reg.find_by_address(128).unwrap().id.as_str(), "b");
        assert!(reg.find_by_address(320).is_err());
    }

    #[test]
    fn test_compaction_noop_when_packed() {
        let mut reg = BlockRegistry::new(1024);
        reg.insert(block("a", 0, 64, b"")).unwrap();
        reg.insert(block("b", 64, 64, b"")).unwrap();

        let report = Defragmenter::default().compact(&mut reg).unwrap();
        assert_eq!(report.blocks_moved, 0);
        assert_eq!(report.free_gaps_before, 1);
    }

    #[test]
    fn test_compaction_empty_registry() {
        let mut reg = BlockRegistry::new(1024);
        let report = Defragmenter::default().compact(&mut reg).unwrap();
        assert_eq!(report, CompactionReport { free_gaps_before: 1, ..Default::default() });
    }
}
