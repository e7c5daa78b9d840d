//! Allocation, replacement and compaction engine

pub mod allocator;
pub mod block;
pub mod config;
pub mod defrag;
pub mod error;
pub mod manager;
pub mod registry;
pub mod replacement;
pub mod source;
pub mod unis;
pub mod validation;

pub use manager::{LoadOutcome, MemoryManager, MemoryManagerBuilder, MemoryStats, SharedMemoryManager};
