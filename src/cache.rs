use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use regex::Regex;
use tracing::debug;

use crate::error::{ComputeError, Error, Result};
use crate::key::CacheKey;
use crate::types::TenantId;

/// Entry lifetime applied by [`ExpiringCache::set`] and
/// [`ExpiringCache::get_or_compute`].
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Sweep cadence for never-read expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

type FlightResult<T> = std::result::Result<T, Arc<ComputeError>>;
type InFlight<T> = Shared<BoxFuture<'static, FlightResult<T>>>;

/// In-memory expiring cache scoped by [`CacheKey`].
///
/// One instance caches one value type; services holding differently shaped
/// data own separate instances instead of casting at every read. Entries
/// expire lazily on access and eagerly under an optional sweep thread
/// (see [`ExpiringCache::start_sweeper`]). Cloning the handle shares the
/// underlying store.
///
/// Capacity is unbounded unless [`ExpiringCache::with_capacity`] sets an
/// LRU bound. A capacity of zero disables storage.
pub struct ExpiringCache<T> {
    inner: Arc<Mutex<CacheState<T>>>,
    default_ttl: Duration,
    capacity: Option<usize>,
}

struct CacheState<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    order: VecDeque<CacheKey>,
    in_flight: HashMap<CacheKey, Flight<T>>,
    next_flight_id: u64,
    hits: u64,
    misses: u64,
}

struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

struct Flight<T> {
    id: u64,
    future: InFlight<T>,
}

impl<T> Clone for Flight<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            future: self.future.clone(),
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entry count.
    pub size: usize,
    /// Reads answered from the store.
    pub hits: u64,
    /// Reads that fell through, including expired entries.
    pub misses: u64,
    /// `hits / (hits + misses)` formatted to one decimal, `"0%"` before
    /// any read.
    pub hit_rate: String,
}

impl<T> ExpiringCache<T> {
    /// Creates an unbounded cache with the default TTL.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
                in_flight: HashMap::new(),
                next_flight_id: 0,
                hits: 0,
                misses: 0,
            })),
            default_ttl: DEFAULT_TTL,
            capacity: None,
        }
    }

    /// Configures the TTL used when none is given per call.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Bounds the store to `capacity` entries, evicting least-recently-used.
    ///
    /// A capacity of zero disables storage.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Spawns the background sweep thread.
    ///
    /// Every `interval` the thread removes entries whose TTL has passed,
    /// whether or not they are ever read again. The returned handle stops
    /// and joins the thread on [`SweeperHandle::stop`] or drop; the thread
    /// also exits once every cache handle is gone.
    pub fn start_sweeper(&self, interval: Duration) -> SweeperHandle
    where
        T: Send + Sync + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let state = Arc::downgrade(&self.inner);
        let thread = thread::Builder::new()
            .name("cache-sweeper".to_string())
            .spawn(move || sweep_loop(state, stop_rx, interval))
            .expect("failed to spawn cache sweeper thread");
        SweeperHandle {
            stop: stop_tx,
            thread: Some(thread),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<T>> {
        self.inner.lock().expect("poisoned lock")
    }

    fn is_expired(entry: &CacheEntry<T>, now: Instant) -> bool {
        now > entry.expires_at
    }

    fn remove_key(state: &mut CacheState<T>, key: &CacheKey) -> bool {
        if state.entries.remove(key).is_some() {
            state.order.retain(|existing| existing != key);
            true
        } else {
            false
        }
    }

    fn touch(state: &mut CacheState<T>, key: &CacheKey) {
        state.order.retain(|existing| existing != key);
        state.order.push_back(key.clone());
    }

    fn evict_if_needed(state: &mut CacheState<T>, capacity: usize) {
        if capacity == 0 {
            state.entries.clear();
            state.order.clear();
            return;
        }

        while state.entries.len() > capacity {
            if let Some(key) = state.order.pop_front() {
                state.entries.remove(&key);
            } else {
                break;
            }
        }
    }

    fn prune_expired(state: &mut CacheState<T>, now: Instant) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, entry| now <= entry.expires_at);
        state.order.retain(|key| state.entries.contains_key(key));
        before - state.entries.len()
    }

    fn insert_entry(
        state: &mut CacheState<T>,
        key: CacheKey,
        value: T,
        expires_at: Instant,
        capacity: Option<usize>,
    ) {
        state.entries.insert(
            key.clone(),
            CacheEntry { value, expires_at },
        );
        Self::touch(state, &key);
        if let Some(capacity) = capacity {
            Self::evict_if_needed(state, capacity);
        }
    }
}

impl<T: Clone> ExpiringCache<T> {
    /// Returns the live value for a key, counting a hit or miss.
    ///
    /// An expired entry is removed on the way (lazy expiry) and reported
    /// as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<T> {
        let now = Instant::now();
        let mut state = self.lock();
        match Self::live_value(&mut state, key, now) {
            Some(value) => {
                state.hits += 1;
                Some(value)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Stores a value under the default TTL, replacing any prior entry.
    pub fn set(&self, key: CacheKey, value: T) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Stores a value under an explicit TTL, replacing any prior entry.
    pub fn set_with_ttl(&self, key: CacheKey, value: T, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        let mut state = self.lock();
        Self::insert_entry(&mut state, key, value, expires_at, self.capacity);
    }

    /// Returns whether a live entry exists, without touching counters or
    /// recency order. Expired entries are removed.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        if let Some(entry) = state.entries.get(key) {
            if Self::is_expired(entry, now) {
                Self::remove_key(&mut state, key);
                return false;
            }
            return true;
        }
        false
    }

    /// Removes one entry; returns whether it existed.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let mut state = self.lock();
        Self::remove_key(&mut state, key)
    }

    /// Removes every entry whose rendered key matches a glob pattern.
    ///
    /// `*` matches any run of characters; everything else is literal. The
    /// match is anchored over the whole `entity:tenant:part...` form.
    /// Returns the number of entries removed.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let matcher = glob_matcher(pattern);
        let mut state = self.lock();
        let matched: Vec<CacheKey> = state
            .entries
            .keys()
            .filter(|key| matcher.is_match(&key.to_string()))
            .cloned()
            .collect();
        for key in &matched {
            Self::remove_key(&mut state, key);
        }
        if !matched.is_empty() {
            debug!(
                pattern,
                removed = matched.len(),
                "invalidated cache entries matching pattern"
            );
        }
        matched.len()
    }

    /// Removes every entry scoped to a tenant.
    ///
    /// Matches the key's tenant field, so a key built through [`CacheKey`]
    /// can never escape tenant-wide invalidation. Returns the number of
    /// entries removed.
    pub fn invalidate_tenant(&self, tenant: &TenantId) -> usize {
        let mut state = self.lock();
        let matched: Vec<CacheKey> = state
            .entries
            .keys()
            .filter(|key| key.tenant() == tenant)
            .cloned()
            .collect();
        for key in &matched {
            Self::remove_key(&mut state, key);
        }
        if !matched.is_empty() {
            debug!(
                tenant = %tenant,
                removed = matched.len(),
                "invalidated cache entries for tenant"
            );
        }
        matched.len()
    }

    /// Empties the store. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        let removed = state.entries.len();
        state.entries.clear();
        state.order.clear();
        debug!(removed, "cleared cache");
    }

    /// Returns current size and hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            size: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            hit_rate: format_hit_rate(state.hits, state.misses),
        }
    }

    fn live_value(state: &mut CacheState<T>, key: &CacheKey, now: Instant) -> Option<T> {
        if let Some(entry) = state.entries.get(key) {
            if Self::is_expired(entry, now) {
                Self::remove_key(state, key);
                return None;
            }
            let value = entry.value.clone();
            Self::touch(state, key);
            return Some(value);
        }
        None
    }
}

impl<T: Clone + Send + Sync + 'static> ExpiringCache<T> {
    /// Returns the cached value or computes and stores it under the
    /// default TTL.
    pub async fn get_or_compute<F, Fut>(&self, key: &CacheKey, compute: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, ComputeError>> + Send + 'static,
    {
        self.get_or_compute_with_ttl(key, self.default_ttl, compute)
            .await
    }

    /// Returns the cached value or computes and stores it under `ttl`.
    ///
    /// A hit returns without invoking `compute`. Concurrent misses on the
    /// same key share a single computation: one caller's `compute` runs and
    /// every waiter receives the same outcome. On success the first caller
    /// to observe completion stores the value; on failure the error reaches
    /// every waiter as [`Error::Compute`] and nothing is stored, so a
    /// failed computation cannot poison the cache.
    pub async fn get_or_compute_with_ttl<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, ComputeError>> + Send + 'static,
    {
        let flight = {
            let mut state = self.lock();
            if let Some(value) = Self::live_value(&mut state, key, Instant::now()) {
                state.hits += 1;
                return Ok(value);
            }
            state.misses += 1;

            if let Some(existing) = state.in_flight.get(key) {
                existing.clone()
            } else {
                let id = state.next_flight_id;
                state.next_flight_id += 1;
                // The closure runs on first poll, outside the lock.
                let future: InFlight<T> = async move { compute().await.map_err(Arc::new) }
                    .boxed()
                    .shared();
                let flight = Flight { id, future };
                state.in_flight.insert(key.clone(), flight.clone());
                flight
            }
        };

        let outcome = flight.future.await;

        let mut state = self.lock();
        let first_to_finish = state
            .in_flight
            .get(key)
            .is_some_and(|current| current.id == flight.id);
        if first_to_finish {
            state.in_flight.remove(key);
        }

        match outcome {
            Ok(value) => {
                if first_to_finish {
                    Self::insert_entry(
                        &mut state,
                        key.clone(),
                        value.clone(),
                        Instant::now() + ttl,
                        self.capacity,
                    );
                }
                Ok(value)
            }
            Err(error) => Err(Error::Compute(error)),
        }
    }
}

impl<T> Clone for ExpiringCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            default_ttl: self.default_ttl,
            capacity: self.capacity,
        }
    }
}

impl<T> Default for ExpiringCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ExpiringCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("default_ttl", &self.default_ttl)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Handle owning the background sweep thread.
///
/// [`SweeperHandle::stop`] (or dropping the handle) signals the thread and
/// joins it, so a controlled shutdown cannot leak it.
pub struct SweeperHandle {
    stop: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stops the sweep thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for SweeperHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweeperHandle").finish_non_exhaustive()
    }
}

fn sweep_loop<T>(
    state: Weak<Mutex<CacheState<T>>>,
    stop: mpsc::Receiver<()>,
    interval: Duration,
) {
    loop {
        match stop.recv_timeout(interval) {
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let Some(inner) = state.upgrade() else { break };
                let now = Instant::now();
                let mut guard = inner.lock().expect("poisoned lock");
                let removed = ExpiringCache::prune_expired(&mut guard, now);
                if removed > 0 {
                    debug!(removed, "swept expired cache entries");
                }
            }
            _ => break,
        }
    }
}

fn glob_matcher(pattern: &str) -> Regex {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&format!("^{escaped}$")).expect("escaped glob is a valid regex")
}

fn format_hit_rate(hits: u64, misses: u64) -> String {
    let total = hits + misses;
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", hits as f64 * 100.0 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::future;
    use std::future::poll_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Poll;

    fn tenant(value: &str) -> TenantId {
        TenantId::try_from(value).unwrap()
    }

    fn key(entity: &str, tenant_id: &str, parts: &[&str]) -> CacheKey {
        CacheKey::new(entity, tenant(tenant_id), parts.iter().copied()).unwrap()
    }

    fn yield_once() -> impl Future<Output = ()> {
        let mut yielded = false;
        poll_fn(move |cx| {
            if yielded {
                Poll::Ready(())
            } else {
                yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        })
    }

    #[test]
    fn set_then_get_should_round_trip() {
        let cache = ExpiringCache::new();
        let key = key("dashboard", "tenant1", &["stats"]);

        cache.set(key.clone(), 41_u64);
        cache.set(key.clone(), 42_u64);

        assert_eq!(cache.get(&key), Some(42));
        assert!(cache.contains(&key));
    }

    #[test]
    fn ttl_should_expire_entries() {
        let cache = ExpiringCache::new();
        let key = key("lot", "tenant_1", &["7"]);

        cache.set_with_ttl(key.clone(), "cached".to_string(), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get(&key), None);
        assert!(!cache.contains(&key));
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn contains_should_not_affect_counters() {
        let cache = ExpiringCache::new();
        let present = key("lot", "tenant_1", &["7"]);
        cache.set(present.clone(), 1_u32);

        assert!(cache.contains(&present));
        assert!(!cache.contains(&key("lot", "tenant_1", &["8"])));

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn remove_should_report_prior_presence() {
        let cache = ExpiringCache::new();
        let key = key("document", "tenant_1", &["42"]);
        cache.set(key.clone(), 1_u32);

        assert!(cache.remove(&key));
        assert!(!cache.remove(&key));
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn invalidate_tenant_should_remove_only_matching_keys() {
        let cache = ExpiringCache::new();
        cache.set(key("a", "t1", &["x"]), 1_u32);
        cache.set(key("a", "t2", &["x"]), 2_u32);
        cache.set(key("b", "t1", &["y"]), 3_u32);

        assert_eq!(cache.invalidate_tenant(&tenant("t1")), 2);
        assert_eq!(cache.get(&key("a", "t1", &["x"])), None);
        assert_eq!(cache.get(&key("b", "t1", &["y"])), None);
        assert_eq!(cache.get(&key("a", "t2", &["x"])), Some(2));
    }

    #[test]
    fn invalidate_pattern_should_match_rendered_keys() {
        let cache = ExpiringCache::new();
        let stats_key = key("dashboard", "tenant1", &["stats"]);
        cache.set(stats_key.clone(), 1_u32);
        cache.set(key("dashboard", "tenant2", &["stats"]), 2_u32);

        assert_eq!(cache.invalidate_pattern("dashboard:tenant1:*"), 1);
        assert_eq!(cache.get(&stats_key), None);
        assert_eq!(cache.get(&key("dashboard", "tenant2", &["stats"])), Some(2));
        assert_eq!(cache.invalidate_pattern("dashboard:tenant1:*"), 0);
    }

    #[test]
    fn clear_should_empty_the_store() {
        let cache = ExpiringCache::new();
        cache.set(key("a", "t1", &["x"]), 1_u32);
        cache.set(key("b", "t1", &["y"]), 2_u32);

        cache.clear();

        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.get(&key("a", "t1", &["x"])), None);
    }

    #[test]
    fn stats_should_track_hits_and_misses() {
        let cache = ExpiringCache::new();
        assert_eq!(cache.stats().hit_rate, "0%");

        assert_eq!(cache.get(&key("a", "t1", &["x"])), None);
        assert_eq!(cache.get(&key("a", "t1", &["y"])), None);
        cache.set(key("a", "t1", &["z"]), 1_u32);
        assert_eq!(cache.get(&key("a", "t1", &["z"])), Some(1));

        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_rate, "33.3%");
    }

    #[test]
    fn lru_should_evict_least_recently_used() {
        let cache = ExpiringCache::new().with_capacity(2);
        let key_a = key("lot", "t1", &["a"]);
        let key_b = key("lot", "t1", &["b"]);
        let key_c = key("lot", "t1", &["c"]);

        cache.set(key_a.clone(), 1_u32);
        cache.set(key_b.clone(), 2_u32);
        let _ = cache.get(&key_a);
        cache.set(key_c.clone(), 3_u32);

        assert_eq!(cache.get(&key_b), None);
        assert_eq!(cache.get(&key_a), Some(1));
        assert_eq!(cache.get(&key_c), Some(3));
    }

    #[test]
    fn zero_capacity_should_disable_storage() {
        let cache = ExpiringCache::new().with_capacity(0);
        let key = key("lot", "t1", &["a"]);

        cache.set(key.clone(), 1_u32);

        assert_eq!(cache.get(&key), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn get_or_compute_should_compute_once_within_ttl() {
        let cache: ExpiringCache<String> = ExpiringCache::new();
        let report_key = key("report", "tenant_1", &["monthly"]);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let value = block_on(cache.get_or_compute(&report_key, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ComputeError>("balance".to_string())
            }))
            .unwrap();
            assert_eq!(value, "balance");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&report_key), Some("balance".to_string()));
    }

    #[test]
    fn get_or_compute_should_share_concurrent_computation() {
        let cache: ExpiringCache<String> = ExpiringCache::new();
        let report_key = key("report", "tenant_1", &["annual"]);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let calls = Arc::clone(&calls);
            cache.get_or_compute(&report_key, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                yield_once().await;
                Ok::<_, ComputeError>("ready".to_string())
            })
        };
        let second = {
            let calls = Arc::clone(&calls);
            cache.get_or_compute(&report_key, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ComputeError>("ready".to_string())
            })
        };

        let (first, second) = block_on(future::join(first, second));
        assert_eq!(first.unwrap(), "ready");
        assert_eq!(second.unwrap(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_or_compute_should_not_store_failures() {
        let cache: ExpiringCache<String> = ExpiringCache::new();
        let report_key = key("report", "tenant_1", &["broken"]);

        let result = block_on(cache.get_or_compute(&report_key, || async {
            Err::<String, ComputeError>("ledger unavailable".into())
        }));

        assert!(matches!(result, Err(Error::Compute(_))));
        assert_eq!(cache.stats().size, 0);

        // The failed flight must not pin the key; a retry computes again.
        let value = block_on(cache.get_or_compute(&report_key, || async {
            Ok::<_, ComputeError>("recovered".to_string())
        }))
        .unwrap();
        assert_eq!(value, "recovered");
    }

    #[test]
    fn sweeper_should_prune_unread_entries() {
        let cache = ExpiringCache::new();
        cache.set_with_ttl(key("a", "t1", &["x"]), 1_u32, Duration::from_millis(10));
        cache.set_with_ttl(key("a", "t1", &["y"]), 2_u32, Duration::from_secs(60));

        let sweeper = cache.start_sweeper(Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(80));
        sweeper.stop();

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn hit_rate_should_format_to_one_decimal() {
        assert_eq!(format_hit_rate(0, 0), "0%");
        assert_eq!(format_hit_rate(1, 2), "33.3%");
        assert_eq!(format_hit_rate(2, 1), "66.7%");
        assert_eq!(format_hit_rate(5, 0), "100.0%");
    }
}
