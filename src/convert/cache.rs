// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fingerprint-keyed geometry cache
//!
//! Each fingerprint maps to a once-cell, so concurrent requests for the same
//! subtree wait on a single computation instead of repeating it.

use crate::error::ConversionResult;
use crate::geometry::Mesh;
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

type Slot = Arc<OnceLock<ConversionResult<Mesh>>>;

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoized conversion results shared by every job of a converter
#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: DashMap<String, Slot>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the result stored under `key`, computing it with `compute` if
    /// nobody has yet. Transient failures are handed back but not kept.
    pub fn get_or_compute(
        &self,
        key: &str,
        compute: impl FnOnce() -> ConversionResult<Mesh>,
    ) -> ConversionResult<Mesh> {
        // Clone the slot out so no shard lock is held while computing
        let slot: Slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();

        let mut computed = false;
        let result = slot
            .get_or_init(|| {
                computed = true;
                compute()
            })
            .clone();

        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key, "cache miss");
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key, "cache hit");
        }

        if let Err(err) = &result {
            if err.is_transient() {
                // Only drop the slot we filled; a retry may already own a new one
                self.entries.remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
                debug!(key, error = %err, "not caching transient failure");
            }
        }
        result
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Incremental SHA-256 over serialized parts
pub struct Fingerprint(Sha256);

impl Fingerprint {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    /// Feed the JSON form of `value`
    pub fn feed(&mut self, value: &impl Serialize) -> serde_json::Result<()> {
        serde_json::to_writer(&mut self.0, value)?;
        // Separator so adjacent parts cannot run into each other
        self.0.update([0u8]);
        Ok(())
    }

    pub fn feed_bytes(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
        self.0.update([0u8]);
    }

    pub fn finish(self) -> String {
        self.0
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new()
    }
}

/// Digest identifying a whole module table
pub fn digest_of(value: &impl Serialize) -> String {
    let mut fingerprint = Fingerprint::new();
    match fingerprint.feed(value) {
        Ok(()) => fingerprint.finish(),
        // Unserializable tables never share a digest with anything
        Err(_) => String::new(),
    }
}
