//! Lazy-loading, deduplicating cache of ready-to-play audio handles.

use crate::engine::PlaybackEngine;
use crate::error::{ResolutionExhausted, Result};
use crate::media::SharedHandle;
use crate::resolver::AudioKey;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

type LoadResult = std::result::Result<SharedHandle, ResolutionExhausted>;
type LoadFuture = Shared<BoxFuture<'static, LoadResult>>;

enum CacheEntry {
    /// A load is in flight; concurrent callers await the same shared future.
    Pending { id: u64, epoch: u64, fut: LoadFuture },
    Ready(SharedHandle),
}

/// Identifies which pending load a caller is settling, so a stale completion
/// never clobbers a newer entry for the same key.
#[derive(Clone, Copy)]
struct Ticket {
    id: u64,
    epoch: u64,
}

/// Cache statistics, mostly for diagnostics panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub ready: usize,
    pub pending: usize,
}

/// Keyed cache of loaded audio handles.
///
/// A `get` for a Ready key returns the shared handle without I/O; a `get`
/// while a load is in flight joins that load (request coalescing). Failures
/// are never cached: the entry is removed so the next request retries from
/// scratch.
pub struct AudioCache {
    engine: Arc<PlaybackEngine>,
    entries: Mutex<HashMap<AudioKey, CacheEntry>>,
    epoch: AtomicU64,
    next_load_id: AtomicU64,
}

impl AudioCache {
    pub fn new(engine: Arc<PlaybackEngine>) -> Self {
        Self {
            engine,
            entries: Mutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            next_load_id: AtomicU64::new(0),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<AudioKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a ready-to-play handle for `key`, loading it on first request.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionExhausted`](crate::error::ResolutionExhausted)
    /// (as a [`CoreError`](crate::CoreError)) when every candidate path for
    /// the key failed. The failure is not cached.
    pub async fn get(&self, key: &AudioKey) -> Result<SharedHandle> {
        let (fut, ticket) = {
            let mut entries = self.lock_entries();
            match entries.get(key) {
                Some(CacheEntry::Ready(handle)) => {
                    debug!("Cache hit for {}", key);
                    return Ok(Arc::clone(handle));
                }
                Some(CacheEntry::Pending { id, epoch, fut }) => {
                    debug!("Joining in-flight load for {}", key);
                    (
                        fut.clone(),
                        Ticket {
                            id: *id,
                            epoch: *epoch,
                        },
                    )
                }
                None => {
                    let id = self.next_load_id.fetch_add(1, Ordering::Relaxed);
                    let epoch = self.epoch.load(Ordering::Acquire);
                    let engine = Arc::clone(&self.engine);
                    let owned_key = key.clone();
                    let fut: LoadFuture =
                        async move { engine.load(&owned_key).await }.boxed().shared();
                    entries.insert(
                        key.clone(),
                        CacheEntry::Pending {
                            id,
                            epoch,
                            fut: fut.clone(),
                        },
                    );
                    (fut, Ticket { id, epoch })
                }
            }
        };

        let result = fut.await;
        self.settle(key, ticket, &result);
        result.map_err(Into::into)
    }

    /// Promote or discard the pending entry once its load resolved.
    ///
    /// Every coalesced caller runs this; the ticket makes it idempotent and
    /// keeps a stale completion from touching a newer entry for the key.
    fn settle(&self, key: &AudioKey, ticket: Ticket, result: &LoadResult) {
        let mut entries = self.lock_entries();
        let Some(CacheEntry::Pending { id, .. }) = entries.get(key) else {
            return;
        };
        if *id != ticket.id {
            return;
        }
        match result {
            Ok(handle) => {
                if ticket.epoch == self.epoch.load(Ordering::Acquire) {
                    entries.insert(key.clone(), CacheEntry::Ready(Arc::clone(handle)));
                } else {
                    // The cache was cleared while this load was in flight.
                    // Callers keep their handle; the cache does not.
                    debug!("Discarding late arrival for {}", key);
                    entries.remove(key);
                }
            }
            Err(_) => {
                entries.remove(key);
            }
        }
    }

    /// Best-effort warm of a batch of keys.
    ///
    /// Individual failures are logged and never abort the batch. Returns the
    /// number of keys that ended up ready.
    pub async fn preload(&self, keys: &[AudioKey]) -> usize {
        let results = futures::future::join_all(keys.iter().map(|key| self.get(key))).await;
        let mut warmed = 0;
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(_) => warmed += 1,
                Err(e) => warn!("Failed to preload {}: {}", key, e),
            }
        }
        info!("Preloaded {}/{} audio files", warmed, keys.len());
        warmed
    }

    /// Drop all Ready entries to free memory.
    ///
    /// In-flight loads still resolve for their waiters but are discarded on
    /// arrival instead of being installed into the cleared cache.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let mut entries = self.lock_entries();
        entries.retain(|_, entry| matches!(entry, CacheEntry::Pending { .. }));
        info!("Audio cache cleared");
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self.lock_entries();
        let ready = entries
            .values()
            .filter(|e| matches!(e, CacheEntry::Ready(_)))
            .count();
        CacheStats {
            ready,
            pending: entries.len() - ready,
        }
    }
}
