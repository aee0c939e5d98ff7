//! Bounded, expiring record cache with single-flight fetches

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use celebi_client::{FetchError, ResilientClient};
use celebi_dex::{CanonicalKey, Record, RelationshipGraph};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Cache sizing and expiry
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl: Duration,
    /// How often the background sweeper drops expired entries
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Counters since the cache was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups not answered from a fresh entry, coalesced ones included
    pub misses: u64,
    /// Misses that attached to a fetch already in flight
    pub coalesced: u64,
    /// Upstream fetches started
    pub fetches: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    fetches: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

type FetchResult = Result<Arc<Record>, FetchError>;

/// One outstanding upstream fetch, awaited by every requester of its key
type InFlightFetch = Shared<BoxFuture<'static, FetchResult>>;

struct CacheEntry {
    record: Arc<Record>,
    inserted_at: Instant,
    expires_at: Instant,
}

struct CacheState {
    entries: LruCache<CanonicalKey, CacheEntry>,
    in_flight: HashMap<CanonicalKey, InFlightFetch>,
}

struct Inner {
    config: CacheConfig,
    client: Arc<ResilientClient>,
    graph: Arc<RelationshipGraph>,
    state: Mutex<CacheState>,
    counters: Counters,
}

/// Record cache in front of a [`ResilientClient`].
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct CacheLayer {
    inner: Arc<Inner>,
}

impl CacheLayer {
    pub fn new(
        config: CacheConfig,
        client: Arc<ResilientClient>,
        graph: Arc<RelationshipGraph>,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Inner {
                config,
                client,
                graph,
                state: Mutex::new(CacheState {
                    entries: LruCache::new(capacity),
                    in_flight: HashMap::new(),
                }),
                counters: Counters::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the cached record for `key`, fetching it on a miss.
    ///
    /// Concurrent misses for the same key share one upstream fetch. The
    /// fetch runs on its own task, so a caller that stops waiting does not
    /// cancel it for the others. Failures are never cached.
    pub async fn get_or_fetch(&self, key: &CanonicalKey) -> Result<Arc<Record>, FetchError> {
        let fetch = {
            let mut state = self.inner.state.lock();
            let now = Instant::now();

            match state
                .entries
                .get(key)
                .map(|e| (e.expires_at > now, Arc::clone(&e.record)))
            {
                Some((true, record)) => {
                    Counters::bump(&self.inner.counters.hits);
                    return Ok(record);
                }
                Some((false, _)) => {
                    tracing::debug!(key = %key, "Cache entry expired");
                    state.entries.pop(key);
                }
                None => {}
            }

            Counters::bump(&self.inner.counters.misses);

            match state.in_flight.get(key) {
                Some(fetch) => {
                    Counters::bump(&self.inner.counters.coalesced);
                    tracing::debug!(key = %key, "Joining in-flight fetch");
                    fetch.clone()
                }
                None => {
                    let fetch = self.start_fetch(key.clone());
                    state.in_flight.insert(key.clone(), fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Spawn the fetch task. Must be called with the state lock held, so
    /// the task cannot clear its marker before it is registered.
    fn start_fetch(&self, key: CanonicalKey) -> InFlightFetch {
        Counters::bump(&self.inner.counters.fetches);

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move { inner.fetch_and_store(task_key).await });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Fetch task failed");
                    Err(FetchError::Transient {
                        attempts: 0,
                        reason: format!("fetch task failed: {e}"),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Fresh cached record, without contacting upstream
    pub fn get(&self, key: &CanonicalKey) -> Option<Arc<Record>> {
        let mut state = self.inner.state.lock();
        let now = Instant::now();
        state
            .entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| Arc::clone(&e.record))
    }

    /// Drop the entry for `key`; returns whether one was cached
    pub fn invalidate(&self, key: &CanonicalKey) -> bool {
        self.inner.state.lock().entries.pop(key).is_some()
    }

    /// Entries currently held, expired ones not yet swept included
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot()
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut state = self.inner.state.lock();
        let now = Instant::now();

        let expired: Vec<CanonicalKey> = state
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            state.entries.pop(key);
        }

        if !expired.is_empty() {
            tracing::debug!(removed = expired.len(), "Purged expired cache entries");
        }
        expired.len()
    }

    /// Run [`purge_expired`](Self::purge_expired) every `sweep_interval`
    /// until `cancel` fires
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        let period = self.inner.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        cache.purge_expired();
                    }
                }
            }
            tracing::debug!("Cache sweeper stopped");
        })
    }
}

/// Clears the in-flight marker for a key if the fetch task unwinds
/// before clearing it itself
struct InFlightMarker<'a> {
    state: &'a Mutex<CacheState>,
    key: &'a CanonicalKey,
    armed: bool,
}

impl InFlightMarker<'_> {
    fn clear(&mut self, state: &mut CacheState) {
        state.in_flight.remove(self.key);
        self.armed = false;
    }
}

impl Drop for InFlightMarker<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(key = %self.key, "Fetch task ended abnormally");
            self.state.lock().in_flight.remove(self.key);
        }
    }
}

impl Inner {
    async fn fetch_and_store(&self, key: CanonicalKey) -> FetchResult {
        let mut marker = InFlightMarker {
            state: &self.state,
            key: &key,
            armed: true,
        };

        let result = self.client.fetch(&key).await.map(Arc::new);

        if let Ok(record) = &result {
            for err in self.graph.add_record(record) {
                tracing::warn!(error = %err, "Skipping unrecognized relation");
            }
        }

        let mut state = self.state.lock();
        if let Ok(record) = &result {
            let now = Instant::now();
            let entry = CacheEntry {
                record: Arc::clone(record),
                inserted_at: now,
                expires_at: now + self.config.ttl,
            };
            if let Some((evicted, old)) = state.entries.push(key.clone(), entry)
                && evicted != key
            {
                Counters::bump(&self.counters.evictions);
                tracing::debug!(
                    key = %evicted,
                    age_ms = now.duration_since(old.inserted_at).as_millis() as u64,
                    "Evicted least recently used entry"
                );
            }
        }
        marker.clear(&mut state);

        result
    }
}
