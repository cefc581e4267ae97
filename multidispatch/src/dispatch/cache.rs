//! Resolution cache.
//!
//! Outcomes are memoised per argument-type key. Each entry is an
//! `Arc<CacheEntry>` inserted or dropped as a whole, so a reader sees
//! either no entry or a fully computed one.
//!
//! The cache remembers the [`TypeContext`](crate::TypeContext) epoch it was
//! filled under. A lookup with a newer epoch misses, and the next insert
//! discards everything computed under the old one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::result::Resolution;
use super::table::MethodId;
use crate::class::ClassId;
use crate::types::Type;

/// Cache key component for one argument value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgKey {
    pub class: ClassId,
    /// Result of `type_of`, which tells apart instantiations sharing a class.
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Values(Vec<ArgKey>),
    Types(Vec<Type>),
}

/// A memoised outcome.
#[derive(Debug)]
pub struct CacheEntry {
    pub resolution: Resolution,
    /// Ids of the applicable methods the outcome was derived from, used to
    /// revalidate the entry when the table holds unfaithful signatures.
    pub applicable: Vec<MethodId>,
}

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Entries {
    epoch: u64,
    map: FxHashMap<CacheKey, Arc<CacheEntry>>,
}

pub struct ResolutionCache {
    entries: RwLock<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries {
                epoch: 0,
                map: FxHashMap::default(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up an entry. Entries from an older epoch never match.
    pub fn get(&self, key: &CacheKey, epoch: u64) -> Option<Arc<CacheEntry>> {
        let entries = self.entries.read();
        let found = if entries.epoch == epoch {
            entries.map.get(key).cloned()
        } else {
            None
        };
        match found {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store an outcome computed under `epoch`, replacing any previous entry
    /// for `key`. Outcomes from an epoch older than the cache's are dropped.
    pub fn insert(&self, key: CacheKey, entry: CacheEntry, epoch: u64) {
        let mut entries = self.entries.write();
        if epoch < entries.epoch {
            return;
        }
        if epoch > entries.epoch {
            entries.map.clear();
            entries.epoch = epoch;
        }
        entries.map.insert(key, Arc::new(entry));
    }

    /// Discard every entry.
    pub fn clear(&self) {
        self.entries.write().map.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}
