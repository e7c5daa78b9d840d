//! Page replacement bookkeeping
//!
//! Tracks the arrival order (FIFO) or access recency (LRU) of resident
//! blocks and names the victim when the address space is at capacity.
//!
//! Both orders live in one id-keyed linked map (`lru::LruCache` with unit
//! values), so promotion is O(1) and no block data is ever duplicated here.
//! The eviction end is the same for both policies:
//! - FIFO: ids are appended on arrival and never promoted, so the eviction
//!   end holds the oldest arrival
//! - LRU: ids are promoted on every access, so the eviction end holds the
//!   least recently used block

use crate::error::{MemError, Result};
use crate::validation::BlockId;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which resident block is evicted when capacity is exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementPolicy {
    /// Capacity-checked: loads fail once no gap fits
    #[default]
    None,
    /// Evict the earliest arrival
    Fifo,
    /// Evict the least recently accessed block
    Lru,
}

impl ReplacementPolicy {
    /// Whether page slots are recycled through eviction
    pub fn is_bounded(&self) -> bool {
        !matches!(self, ReplacementPolicy::None)
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementPolicy::None => write!(f, "none"),
            ReplacementPolicy::Fifo => write!(f, "fifo"),
            ReplacementPolicy::Lru => write!(f, "lru"),
        }
    }
}

impl FromStr for ReplacementPolicy {
    type Err = MemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ReplacementPolicy::None),
            "fifo" => Ok(ReplacementPolicy::Fifo),
            "lru" => Ok(ReplacementPolicy::Lru),
            _ => Err(MemError::InvalidConfig(format!(
                "Invalid replacement policy '{}'. Valid options: none, fifo, lru",
                s
            ))),
        }
    }
}

/// Arrival/recency order over resident block ids
pub struct ReplacementController {
    policy: ReplacementPolicy,
    /// Front = newest arrival or most recent access, back = next victim
    order: LruCache<BlockId, ()>,
}

impl ReplacementController {
    pub fn new(policy: ReplacementPolicy) -> Self {
        ReplacementController {
            policy,
            order: LruCache::unbounded(),
        }
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    /// Record a newly loaded block under the active policy
    pub fn record_load(&mut self, id: &BlockId) {
        match self.policy {
            ReplacementPolicy::Fifo => self.record_arrival(id),
            ReplacementPolicy::Lru => self.record_access(id),
            ReplacementPolicy::None => {}
        }
    }

    /// Append to the arrival order (FIFO only)
    pub fn record_arrival(&mut self, id: &BlockId) {
        if self.policy == ReplacementPolicy::Fifo && !self.order.contains(id) {
            self.order.put(id.clone(), ());
        }
    }

    /// Move to most-recent, inserting if absent (LRU only)
    pub fn record_access(&mut self, id: &BlockId) {
        if self.policy != ReplacementPolicy::Lru {
            return;
        }

        if self.order.contains(id) {
            self.order.promote(id);
        } else {
            self.order.put(id.clone(), ());
        }
    }

    pub fn is_at_capacity(&self, resident_count: usize, capacity_pages: u64) -> bool {
        resident_count as u64 >= capacity_pages
    }

    /// The block to evict next
    ///
    /// Fails with `NoVictimAvailable` when nothing is tracked; callers must
    /// check capacity before asking.
    pub fn select_victim(&self) -> Result<BlockId> {
        self.order
            .peek_lru()
            .map(|(id, _)| id.clone())
            .ok_or(MemError::NoVictimAvailable)
    }

    /// Tracked ids from next victim onward
    pub fn victim_candidates(&self) -> impl Iterator<Item = &BlockId> + '_ {
        self.order.iter().rev().map(|(id, _)| id)
    }

    /// Stop tracking an evicted or deleted block
    pub fn forget(&mut self, id: &str) -> bool {
        self.order.pop(id).is_some()
    }

    /// Tracked ids for inspection
    ///
    /// FIFO lists oldest arrival first; LRU lists most recent access first.
    pub fn order(&self) -> Vec<&BlockId> {
        match self.policy {
            ReplacementPolicy::Lru => self.order.iter().map(|(id, _)| id).collect(),
            _ => self.victim_candidates().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.order.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl fmt::Debug for ReplacementController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplacementController")
            .field("policy", &self.policy)
            .field("order", &self.order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> BlockId {
        BlockId::new(s).unwrap()
    }

    fn order(ctrl: &ReplacementController) -> Vec<&str> {
        ctrl.order().into_iter().map(|i| i.as_str()).collect()
    }

    #[test]
    fn test_fifo_evicts_oldest() {
        let mut ctrl = ReplacementController::new(ReplacementPolicy::Fifo);
        for name in ["a", "b", "c"] {
            ctrl.record_load(&id(name));
        }

        assert_eq!(order(&ctrl), vec!["a", "b", "c"]);
        assert_eq!(ctrl.select_victim().unwrap().as_str(), "a");
    }

    #[test]
    fn test_fifo_ignores_access() {
        let mut ctrl = ReplacementController::new(ReplacementPolicy::Fifo);
        ctrl.record_load(&id("a"));
        ctrl.record_load(&id("b"));

        ctrl.record_access(&id("a"));
        ctrl.record_arrival(&id("a")); // already tracked

        assert_eq!(ctrl.select_victim().unwrap().as_str(), "a");
        assert_eq!(ctrl.len(), 2);
    }

    #[test]
    fn test_lru_promotes_on_access() {
        let mut ctrl = ReplacementController::new(ReplacementPolicy::Lru);
        for name in ["a", "b", "c"] {
            ctrl.record_load(&id(name));
        }
        assert_eq!(order(&ctrl), vec!["c", "b", "a"]);

        ctrl.record_access(&id("a"));
        assert_eq!(order(&ctrl), vec!["a", "c", "b"]);
        assert_eq!(ctrl.select_victim().unwrap().as_str(), "b");
    }

    #[test]
    fn test_lru_ignores_arrival() {
        let mut ctrl = ReplacementController::new(ReplacementPolicy::Lru);
        ctrl.record_arrival(&id("a"));
        assert!(ctrl.is_empty());
    }

    #[test]
    fn test_forget_keeps_order_consistent() {
        let mut ctrl = ReplacementController::new(ReplacementPolicy::Fifo);
        for name in ["a", "b", "c"] {
            ctrl.record_load(&id(name));
        }

        assert!(ctrl.forget("a"));
        assert!(!ctrl.forget("a"));
        assert!(!ctrl.contains("a"));
        assert_eq!(ctrl.select_victim().unwrap().as_str(), "b");

        // A reused id arrives again as the newest entry
        ctrl.record_load(&id("a"));
        assert_eq!(order(&ctrl), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_no_victim_available() {
        let ctrl = ReplacementController::new(ReplacementPolicy::Lru);
        assert!(matches!(
            ctrl.select_victim(),
            Err(MemError::NoVictimAvailable)
        ));
    }

    #[test]
    fn test_none_policy_tracks_nothing() {
        let mut ctrl = ReplacementController::new(ReplacementPolicy::None);
        ctrl.record_load(&id("a"));
        ctrl.record_access(&id("a"));
        assert!(ctrl.is_empty());
        assert!(!ReplacementPolicy::None.is_bounded());
    }

    #[test]
    fn test_capacity_check() {
        let ctrl = ReplacementController::new(ReplacementPolicy::Fifo);
        assert!(!ctrl.is_at_capacity(15, 16));
        assert!(ctrl.is_at_capacity(16, 16));
    }

    #[test]
    fn test_victim_candidates_order() {
        let mut ctrl = ReplacementController::new(ReplacementPolicy::Lru);
        for name in ["a", "b", "c"] {
            ctrl.record_load(&id(name));
        }
        ctrl.record_access(&id("b"));

        let candidates: Vec<&str> = ctrl.victim_candidates().map(|i| i.as_str()).collect();
        assert_eq!(candidates, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("FIFO".parse::<ReplacementPolicy>().unwrap(), ReplacementPolicy::Fifo);
        assert_eq!("lru".parse::<ReplacementPolicy>().unwrap(), ReplacementPolicy::Lru);
        assert!("clock".parse::<ReplacementPolicy>().is_err());
    }
}
