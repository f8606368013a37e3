//! Compiled-expression cache.
//!
//! Keyed by expression text plus declared variables, bounded, insertion
//! ordered. Eviction drops the oldest-inserted entry; lookups do not
//! reorder anything, so a frequently-hit old entry still ages out.

use crate::expr::compile::CompiledExpression;
use std::collections::{HashMap, VecDeque};

/// Default maximum number of cached expressions.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

// =============================================================================
// Cache
// =============================================================================

/// Bounded insert-ordered cache of compiled expressions.
#[derive(Debug)]
pub struct ExpressionCache {
    entries: HashMap<String, CompiledExpression>,
    /// Insertion order, front = oldest.
    order: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// Cache key for an expression compiled against a variable set.
    pub fn key(text: &str, variables: &[String]) -> String {
        format!("{text}:{}", variables.join(","))
    }

    /// Looks up a key, counting the hit or miss.
    pub fn get(&mut self, key: &str) -> Option<CompiledExpression> {
        match self.entries.get(key) {
            Some(found) => {
                self.hits += 1;
                Some(found.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts an entry, evicting the oldest-inserted one past capacity.
    pub fn insert(&mut self, key: String, value: CompiledExpression) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries. Counters are kept; they describe lifetime traffic.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit; 0.0 when the cache was never queried.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
