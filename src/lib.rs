//! # memsim - Memory Manager Simulator
//!
//! `memsim-rs` models an operating-system memory manager for teaching and
//! experimentation. Files are placed into a fixed-size, paged address space:
//!
//! - **Placement**: best fit or worst fit over the real free gaps
//! - **Replacement**: FIFO or LRU eviction once the space is at capacity
//! - **Compaction**: automatic defragmentation past an occupancy threshold
//! - **Persistence**: the line-oriented `.unis` snapshot format
//!
//! ## Quick Start
//!
//! ```rust
//! use memsim_rs::{MemoryManager, Result};
//!
//! # fn main() -> Result<()> {
//! // 1 KiB address space with 64 byte pages, best fit, no replacement
//! let mut memory = MemoryManager::builder().build()?;
//!
//! let a = memory.load("A", vec![0; 100])?; // rounds up to 2 pages
//! assert_eq!((a.start_address, a.size), (0, 128));
//!
//! let b = memory.load("B", vec![0; 50])?;
//! assert_eq!(b.start_address, 128);
//!
//! memory.delete("A")?;
//! let c = memory.load("C", vec![0; 60])?; // exact fit at the reopened gap
//! assert_eq!(c.start_address, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Replacement
//!
//! ```rust
//! use memsim_rs::{MemoryManager, ReplacementPolicy, Result};
//!
//! # fn main() -> Result<()> {
//! let mut memory = MemoryManager::builder()
//!     .total_size(256)
//!     .replacement(ReplacementPolicy::Lru)
//!     .build()?;
//!
//! for id in ["a", "b", "c", "d"] {
//!     memory.load(id, id.as_bytes().to_vec())?;
//! }
//! memory.read("a")?; // "b" is now least recently used
//!
//! let outcome = memory.load("e", b"e".to_vec())?;
//! assert_eq!(outcome.evicted[0].as_str(), "b");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod shell;

#[allow(unused_imports)]
pub(crate) use crate::core::{block, config, defrag, error, manager, registry, replacement, source, unis};

pub use crate::core::{allocator, validation};

pub use crate::core::{
    allocator::{AllocationPolicy, Gap},
    block::Block,
    config::ManagerConfig,
    defrag::{CompactionReport, Defragmenter},
    error::{MemError, Result},
    manager::{LoadOutcome, MemoryManager, MemoryManagerBuilder, MemoryStats, SharedMemoryManager},
    registry::BlockRegistry,
    replacement::{ReplacementController, ReplacementPolicy},
    source::{FileMode, FsSource, PayloadSource},
    unis::UnisImage,
    validation::BlockId,
};
