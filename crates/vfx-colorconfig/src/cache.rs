//! Thread-safe processor caching.
//!
//! Every transform the factory builds is stored under a [`ProcessorKey`].
//! The key is a tagged value with one variant per request shape, so a plain
//! conversion can never collide with, say, a file transform even when the
//! strings happen to match.
//!
//! Insertion is first-wins: if two threads compile the same key
//! concurrently, the second result is dropped and both callers get the
//! processor that was installed first. Empty handles are cached too, so a
//! failing request is only compiled once.
//!
//! ```
//! use vfx_colorconfig::{ProcessorCache, ProcessorHandle, ProcessorKey};
//!
//! let cache = ProcessorCache::new();
//! let key = ProcessorKey::file("grade.cube", false);
//! assert!(cache.find(&key).is_none());
//!
//! let installed = cache.insert(key.clone(), ProcessorHandle::empty());
//! assert!(installed.is_empty());
//! assert!(cache.find(&key).is_some());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::processor::ProcessorHandle;

/// Context override lists, kept verbatim as part of a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey {
    /// Comma-separated variable names.
    pub keys: String,
    /// Comma-separated variable values.
    pub values: String,
}

impl ContextKey {
    /// Builds a context key.
    pub fn new(keys: &str, values: &str) -> Self {
        Self {
            keys: keys.to_string(),
            values: values.to_string(),
        }
    }
}

/// Cache key, one variant per request shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessorKey {
    /// Color space to color space.
    Conversion {
        /// Source space.
        src: String,
        /// Destination space.
        dst: String,
        /// Context overrides.
        context: ContextKey,
    },
    /// Looks between two spaces.
    Look {
        /// Comma-separated looks.
        looks: String,
        /// Source space.
        src: String,
        /// Destination space.
        dst: String,
        /// Inverse flag.
        inverse: bool,
        /// Context overrides.
        context: ContextKey,
    },
    /// Display/view pipeline.
    Display {
        /// Display name (after default substitution).
        display: String,
        /// View name (after default substitution).
        view: String,
        /// Input space.
        src: String,
        /// Looks override.
        looks: String,
        /// Inverse flag.
        inverse: bool,
        /// Context overrides.
        context: ContextKey,
    },
    /// External transform file.
    File {
        /// Path as requested.
        path: String,
        /// Inverse flag.
        inverse: bool,
    },
    /// Config-defined named transform.
    Named {
        /// Named transform name.
        name: String,
        /// Inverse flag.
        inverse: bool,
        /// Context overrides.
        context: ContextKey,
    },
}

impl ProcessorKey {
    /// Key for a plain conversion.
    pub fn conversion(src: &str, dst: &str, context: ContextKey) -> Self {
        Self::Conversion {
            src: src.to_string(),
            dst: dst.to_string(),
            context,
        }
    }

    /// Key for a file transform.
    pub fn file(path: &str, inverse: bool) -> Self {
        Self::File {
            path: path.to_string(),
            inverse,
        }
    }

    /// Key for a named transform.
    pub fn named(name: &str, inverse: bool, context: ContextKey) -> Self {
        Self::Named {
            name: name.to_string(),
            inverse,
            context,
        }
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups performed.
    pub requested: usize,
    /// Handles installed.
    pub created: usize,
    /// Entries currently held.
    pub entries: usize,
}

/// Thread-safe processor cache.
#[derive(Debug, Default)]
pub struct ProcessorCache {
    map: RwLock<HashMap<ProcessorKey, ProcessorHandle>>,
    requested: AtomicUsize,
    created: AtomicUsize,
}

impl ProcessorCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `key`. `Some(empty)` means a cached failure.
    pub fn find(&self, key: &ProcessorKey) -> Option<ProcessorHandle> {
        self.requested.fetch_add(1, Ordering::Relaxed);
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        let found = map.get(key).cloned();
        match &found {
            Some(_) => tracing::trace!(?key, "processor cache hit"),
            None => tracing::trace!(?key, "processor cache miss"),
        }
        found
    }

    /// Installs `handle` unless `key` is already present; returns whichever
    /// handle ends up in the cache.
    pub fn insert(&self, key: ProcessorKey, handle: ProcessorHandle) -> ProcessorHandle {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.get(&key) {
            tracing::trace!(?key, "discarding duplicate processor");
            return existing.clone();
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        map.insert(key, handle.clone());
        handle
    }

    /// Returns the cached handle for `key`, compiling and installing one
    /// with `compile` on a miss. `compile` runs without any lock held.
    pub fn get_or_insert_with<F>(&self, key: ProcessorKey, compile: F) -> ProcessorHandle
    where
        F: FnOnce() -> ProcessorHandle,
    {
        if let Some(handle) = self.find(&key) {
            return handle;
        }
        let handle = compile();
        self.insert(key, handle)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all entries. Counters are kept.
    pub fn clear(&self) {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            requested: self.requested.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
