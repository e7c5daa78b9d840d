//! Placement search over the free gaps of the address space
//!
//! Gaps are derived from the actual resident layout every time: before the
//! first block, between each pair of neighbours, and after the last block.
//! The placement policy then picks one qualifying gap:
//! - Best fit: smallest gap that holds the request
//! - Worst fit: largest gap that holds the request
//!
//! Ties go to the lowest start address. New blocks always start at the
//! beginning of the chosen gap.

pub mod gap;

pub use gap::Gap;

use crate::block::Block;
use crate::error::{MemError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which free gap a new block occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationPolicy {
    #[default]
    BestFit,
    WorstFit,
}

impl AllocationPolicy {
    /// Pick the gap for a request of `required` bytes
    ///
    /// `gaps` must be in address order so the first candidate with an equal
    /// length wins ties.
    pub fn choose(&self, gaps: &[Gap], required: u64) -> Option<Gap> {
        let mut candidates = gaps.iter().filter(|gap| gap.fits(required));

        let mut chosen = *candidates.next()?;
        for gap in candidates {
            let better = match self {
                AllocationPolicy::BestFit => gap.length < chosen.length,
                AllocationPolicy::WorstFit => gap.length > chosen.length,
            };
            if better {
                chosen = *gap;
            }
        }

        Some(chosen)
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationPolicy::BestFit => write!(f, "best-fit"),
            AllocationPolicy::WorstFit => write!(f, "worst-fit"),
        }
    }
}

impl FromStr for AllocationPolicy {
    type Err = MemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "best-fit" | "best_fit" | "bestfit" | "best" => Ok(AllocationPolicy::BestFit),
            "worst-fit" | "worst_fit" | "worstfit" | "worst" => Ok(AllocationPolicy::WorstFit),
            _ => Err(MemError::InvalidConfig(format!(
                "Invalid allocation policy '{}'. Valid options: best-fit, worst-fit",
                s
            ))),
        }
    }
}

/// Round a payload length up to whole pages
///
/// An empty payload still occupies one page.
pub fn required_size(payload_len: usize, page_size: u64) -> u64 {
    let pages = (payload_len as u64).div_ceil(page_size).max(1);
    pages * page_size
}

/// Free gaps of the layout, in address order
///
/// Zero-length gaps between touching blocks are omitted.
pub fn free_gaps(blocks: &[&Block], total_size: u64) -> Vec<Gap> {
    let mut spans: Vec<(u64, u64)> = blocks
        .iter()
        .map(|b| (b.start_address, b.end_address()))
        .collect();
    spans.sort_unstable();

    let mut gaps = Vec::with_capacity(spans.len() + 1);
    let mut cursor = 0u64;

    for (start, end) in spans {
        if start > cursor {
            gaps.push(Gap::new(cursor, start - cursor));
        }
        cursor = cursor.max(end);
    }

    if total_size > cursor {
        gaps.push(Gap::new(cursor, total_size - cursor));
    }

    gaps
}

/// Find the start address for a new block of `required` bytes
///
/// Fails with `InsufficientMemory` if no gap holds the request.
pub fn find_placement(
    policy: AllocationPolicy,
    required: u64,
    blocks: &[&Block],
    total_size: u64,
) -> Result<u64> {
    let insufficient = MemError::InsufficientMemory {
        required,
        total: total_size,
    };

    if required > total_size {
        return Err(insufficient);
    }

    let gaps = free_gaps(blocks, total_size);
    match policy.choose(&gaps, required) {
        Some(gap) if gap.start + required <= total_size => Ok(gap.start),
        _ => Err(insufficient),
    }
}

/// Fragmentation of the free space
///
/// 0.0 when all free space is one gap (or there is none); grows with the
/// number of gaps relative to the free pages they hold.
pub fn fragmentation_score(gaps: &[Gap], page_size: u64) -> f64 {
    let free_pages: u64 = gaps.iter().map(|g| g.length / page_size).sum();

    if gaps.is_empty() || free_pages == 0 {
        return 0.0;
    }

    (gaps.len() as f64 - 1.0) / free_pages as f64
}
