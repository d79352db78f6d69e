//! # Two-Tier Result Cache
//!
//! A bounded in-process tier in front of an optional persistent tier.
//!
//! - **Memory tier**: bounded mapping with insertion-order eviction
//!   ([`MemoryTier`]). Cheap, lossy, always present.
//! - **Persistent tier**: one file per record, content-addressed by a SHA-256
//!   of the logical key, written atomically ([`DiskTier`]). Optional; any
//!   per-record I/O failure degrades the cache to memory-only operation
//!   instead of failing the request.
//!
//! `get` checks memory first, then disk (repopulating memory on a disk hit).
//! `set` writes through both tiers. TTL is enforced lazily: a read past the
//! record's expiry is a miss and evicts the record. Cross-tier mutations are
//! performed under the memory tier's write lock so a reader never sees one
//! tier cleared while the other still serves the old record.
//!
//! Large route tables can be cached in fixed-size chunks (see
//! [`ResultCache::cache_route_table`]) so a consumer can load them lazily
//! without deserializing the whole table.

mod disk;
mod memory;

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, RouterError};
use crate::registry::RouteRegistry;
use crate::route::Route;

pub use disk::{DiskTier, Envelope};
pub use memory::{CacheEntry, MemoryTier};

pub(crate) use disk::epoch_secs;

/// Number of routes stored per chunk when caching a route table.
pub const ROUTE_CHUNK_SIZE: usize = 100;

const ROUTE_CHUNK_PREFIX: &str = "routes_chunk_";
const ROUTE_METADATA_KEY: &str = "routes_metadata";

/// Metadata record written alongside a chunked route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTableMetadata {
    pub total_chunks: usize,
    pub total_routes: usize,
    pub cache_time: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedRoute {
    name: String,
    route: Route,
}

/// Cache statistics snapshot.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub memory_items: usize,
    pub memory_bytes: usize,
    pub loaded_chunks: usize,
    pub disk_dir: Option<PathBuf>,
    pub compression_enabled: bool,
}

/// Two-tier store for compiled-route metadata and match results.
///
/// Explicitly owned and passed into the match engine and dispatcher; there is
/// no process-wide shared instance.
#[derive(Debug)]
pub struct ResultCache {
    memory: RwLock<MemoryTier>,
    disk: Option<DiskTier>,
}

impl ResultCache {
    /// Create a memory-only cache holding at most `max_memory_items` entries.
    #[must_use]
    pub fn memory_only(max_memory_items: usize) -> Self {
        Self {
            memory: RwLock::new(MemoryTier::new(max_memory_items)),
            disk: None,
        }
    }

    /// Create a cache backed by a persistent directory.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::CacheUnavailable`] if the directory cannot be
    /// created.
    pub fn with_disk(
        max_memory_items: usize,
        dir: impl Into<PathBuf>,
        compression: bool,
    ) -> Result<Self> {
        let disk = DiskTier::open(dir, compression)
            .map_err(|e| RouterError::CacheUnavailable(e.to_string()))?;
        info!(
            dir = %disk.dir().display(),
            compression = compression,
            max_memory_items = max_memory_items,
            "Result cache opened with persistent tier"
        );
        Ok(Self {
            memory: RwLock::new(MemoryTier::new(max_memory_items)),
            disk: Some(disk),
        })
    }

    /// Fetch a value, checking memory first and then the persistent tier.
    ///
    /// A disk hit repopulates the memory tier (counting as an insertion for
    /// eviction purposes). Expired records in either tier are evicted and
    /// reported as a miss.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = SystemTime::now();
        {
            let memory = self.memory.read().expect("memory tier lock poisoned");
            if let Some(entry) = memory.get(key) {
                if !entry.is_expired(now) {
                    return Some(entry.value.clone());
                }
            } else if self.disk.is_none() {
                return None;
            }
        }

        // Miss or expired: re-check and consult the disk tier under the write
        // lock so delete/clear cannot interleave between the tiers.
        let mut memory = self.memory.write().expect("memory tier lock poisoned");
        if let Some(entry) = memory.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
            memory.remove(key);
            if let Some(disk) = &self.disk {
                let _ = disk.remove(key);
            }
            return None;
        }

        let disk = self.disk.as_ref()?;
        let envelope = disk.read(key)?;
        let value = envelope.data.clone();
        memory.insert(
            key,
            CacheEntry {
                value: envelope.data,
                created_at: UNIX_EPOCH + Duration::from_secs(envelope.created_at),
                expires_at: UNIX_EPOCH + Duration::from_secs(envelope.expires_at),
            },
        );
        debug!(key = %key, "Cache hit from persistent tier, memory repopulated");
        Some(value)
    }

    /// Store a value with the given time-to-live, writing through both tiers.
    ///
    /// A persistent-tier write failure is logged and ignored; the memory tier
    /// keeps serving the value.
    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl);
        let mut memory = self.memory.write().expect("memory tier lock poisoned");
        if let Some(disk) = &self.disk {
            let envelope = Envelope {
                data: entry.value.clone(),
                created_at: epoch_secs(entry.created_at),
                expires_at: epoch_secs(entry.expires_at),
            };
            if let Err(e) = disk.write(key, &envelope) {
                warn!(key = %key, error = %e, "Persistent tier write failed, continuing memory-only");
            }
        }
        memory.insert(key, entry);
    }

    /// Remove a key from both tiers.
    pub fn delete(&self, key: &str) {
        let mut memory = self.memory.write().expect("memory tier lock poisoned");
        memory.remove(key);
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.remove(key) {
                warn!(key = %key, error = %e, "Persistent tier delete failed");
            }
        }
    }

    /// Remove everything from both tiers.
    pub fn clear(&self) {
        let mut memory = self.memory.write().expect("memory tier lock poisoned");
        memory.clear();
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.clear() {
                warn!(error = %e, "Persistent tier clear failed");
            }
        }
    }

    /// Sweep the persistent tier, removing all expired records.
    ///
    /// Returns the count removed. Intended for periodic invocation. A
    /// memory-only cache always reports zero.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::CacheUnavailable`] if the cache directory
    /// cannot be scanned.
    pub fn cleanup(&self) -> Result<usize> {
        let Some(disk) = &self.disk else {
            return Ok(0);
        };
        let removed = disk
            .cleanup()
            .map_err(|e| RouterError::CacheUnavailable(e.to_string()))?;
        info!(removed = removed, "Persistent tier cleanup finished");
        Ok(removed)
    }

    /// Snapshot of cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let memory = self.memory.read().expect("memory tier lock poisoned");
        CacheStats {
            memory_items: memory.len(),
            memory_bytes: memory.approximate_bytes(),
            loaded_chunks: memory.keys_with_prefix(ROUTE_CHUNK_PREFIX),
            disk_dir: self.disk.as_ref().map(|d| d.dir().to_path_buf()),
            compression_enabled: self.disk.as_ref().is_some_and(DiskTier::compression_enabled),
        }
    }

    /// Cache a registry's route metadata in fixed-size chunks.
    ///
    /// Each chunk of [`ROUTE_CHUNK_SIZE`] routes is stored under its own key
    /// (`routes_chunk_{i}`) with a `routes_metadata` record describing the
    /// whole table, so a consumer can load chunks lazily instead of
    /// deserializing the full table.
    pub fn cache_route_table(&self, registry: &RouteRegistry, ttl: Duration) {
        let mut chunk_id = 0usize;
        let mut chunk: Vec<NamedRoute> = Vec::with_capacity(ROUTE_CHUNK_SIZE);
        for (name, route) in registry.all() {
            chunk.push(NamedRoute {
                name: name.to_string(),
                route: Route::clone(route),
            });
            if chunk.len() >= ROUTE_CHUNK_SIZE {
                self.store_chunk(chunk_id, std::mem::take(&mut chunk), ttl);
                chunk_id += 1;
            }
        }
        if !chunk.is_empty() {
            self.store_chunk(chunk_id, chunk, ttl);
            chunk_id += 1;
        }

        let metadata = RouteTableMetadata {
            total_chunks: chunk_id,
            total_routes: registry.len(),
            cache_time: epoch_secs(SystemTime::now()),
        };
        match serde_json::to_value(&metadata) {
            Ok(value) => self.set(ROUTE_METADATA_KEY, value, ttl),
            Err(e) => warn!(error = %e, "Failed to serialize route table metadata"),
        }
        info!(
            total_chunks = metadata.total_chunks,
            total_routes = metadata.total_routes,
            "Route table cached in chunks"
        );
    }

    fn store_chunk(&self, chunk_id: usize, chunk: Vec<NamedRoute>, ttl: Duration) {
        match serde_json::to_value(&chunk) {
            Ok(value) => self.set(&format!("{ROUTE_CHUNK_PREFIX}{chunk_id}"), value, ttl),
            Err(e) => warn!(chunk_id = chunk_id, error = %e, "Failed to serialize route chunk"),
        }
    }

    /// The metadata record of a previously cached route table, if any.
    #[must_use]
    pub fn route_table_metadata(&self) -> Option<RouteTableMetadata> {
        let value = self.get(ROUTE_METADATA_KEY)?;
        serde_json::from_value(value).ok()
    }

    /// Load one chunk of a previously cached route table.
    ///
    /// Returns the named routes in their original registry order.
    #[must_use]
    pub fn load_route_chunk(&self, chunk_id: usize) -> Option<Vec<(String, Route)>> {
        let value = self.get(&format!("{ROUTE_CHUNK_PREFIX}{chunk_id}"))?;
        let chunk: Vec<NamedRoute> = serde_json::from_value(value).ok()?;
        Some(chunk.into_iter().map(|nr| (nr.name, nr.route)).collect())
    }
}
