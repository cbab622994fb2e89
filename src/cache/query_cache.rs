use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use super::models::{
    QueryCacheConfig, QueryCacheStats, QueryData, QueryKey, QueryOptions, QuerySnapshot,
    QueryStatus,
};
use crate::errors::Error;

/// Asynchronous producer behind the cache. The query service implements
/// this over the market and asset services.
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> Result<QueryData, Error>;
}

/// Keyed TTL cache over an asynchronous producer.
///
/// Entry state lives behind short-critical-section mutexes inside the shared
/// map; no lock is ever held across an await. Every asynchronous
/// continuation re-validates the entry's generation and issue number before
/// applying its result, so late fetches can neither resurrect evicted
/// entries nor overwrite later-issued results.
pub struct QueryCache {
    inner: Arc<CacheShared>,
}

impl Clone for QueryCache {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

type EntryHandle = Arc<Mutex<CacheEntry>>;

struct CacheShared {
    entries: DashMap<QueryKey, EntryHandle>,
    fetcher: Arc<dyn QueryFetcher>,
    config: QueryCacheConfig,
    generations: AtomicU64,
    sweeper_started: AtomicBool,
}

struct CacheEntry {
    generation: u64,
    data: Option<QueryData>,
    status: QueryStatus,
    error: Option<Arc<Error>>,
    fetched_at: Option<Instant>,
    last_fetched_at: Option<chrono::DateTime<Utc>>,
    version: u64,
    last_issued: u64,
    last_applied: u64,
    in_flight: u32,
    observers: usize,
    idle_since: Option<Instant>,
    poll_running: bool,
    options: QueryOptions,
    version_tx: watch::Sender<u64>,
}

impl CacheEntry {
    fn new(generation: u64, options: QueryOptions) -> Self {
        let (version_tx, _) = watch::channel(0u64);
        Self {
            generation,
            data: None,
            status: QueryStatus::Idle,
            error: None,
            fetched_at: None,
            last_fetched_at: None,
            version: 0,
            last_issued: 0,
            last_applied: 0,
            in_flight: 0,
            observers: 0,
            idle_since: Some(Instant::now()),
            poll_running: false,
            options,
            version_tx,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        match self.fetched_at {
            Some(at) => now.duration_since(at) < self.options.stale_time,
            None => false,
        }
    }

    fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            is_fetching: self.in_flight > 0,
            last_fetched_at: self.last_fetched_at,
            version: self.version,
        }
    }

    fn wake(&self) {
        self.version_tx.send_replace(self.version);
    }
}

impl QueryCache {
    pub fn new(fetcher: Arc<dyn QueryFetcher>, config: QueryCacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheShared {
                entries: DashMap::new(),
                fetcher,
                config,
                generations: AtomicU64::new(0),
                sweeper_started: AtomicBool::new(false),
            }),
        }
    }

    /// Read through the cache.
    ///
    /// Fresh entries return synchronously. Stale entries return the cached
    /// value synchronously and refresh in the background. An entry with no
    /// data yet suspends the caller until its first fetch settles.
    pub async fn query(&self, key: &QueryKey, options: QueryOptions) -> QuerySnapshot {
        self.ensure_sweeper();
        let entry = entry_handle_or_create(&self.inner, key, options);

        enum ReadPath {
            Fresh(QuerySnapshot),
            Stale,
            FirstLoad,
        }

        let path = {
            let mut guard = entry.lock().unwrap();
            let now = Instant::now();
            if guard.observers == 0 {
                guard.idle_since = Some(now);
            }
            if guard.data.is_some() {
                if guard.is_fresh(now) {
                    ReadPath::Fresh(guard.snapshot())
                } else {
                    ReadPath::Stale
                }
            } else {
                ReadPath::FirstLoad
            }
        };

        match path {
            ReadPath::Fresh(snapshot) => snapshot,
            ReadPath::Stale => {
                spawn_fetch(&self.inner, key, &entry, false);
                let guard = entry.lock().unwrap();
                guard.snapshot()
            }
            ReadPath::FirstLoad => match spawn_fetch(&self.inner, key, &entry, false) {
                Some(seq) => {
                    wait_for(&self.inner, key, &entry, move |e| e.last_applied >= seq).await
                }
                None => wait_for(&self.inner, key, &entry, |e| e.in_flight == 0).await,
            },
        }
    }

    /// Refresh an entry and wait for the result. With `force`, a new fetch
    /// is issued even while one is in flight; the issue-number guard keeps
    /// whichever result was issued later.
    pub async fn refetch(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        force: bool,
    ) -> QuerySnapshot {
        self.ensure_sweeper();
        let entry = entry_handle_or_create(&self.inner, key, options);
        {
            let mut guard = entry.lock().unwrap();
            if guard.observers == 0 {
                guard.idle_since = Some(Instant::now());
            }
        }
        match spawn_fetch(&self.inner, key, &entry, force) {
            Some(seq) => wait_for(&self.inner, key, &entry, move |e| e.last_applied >= seq).await,
            None => wait_for(&self.inner, key, &entry, |e| e.in_flight == 0).await,
        }
    }

    /// Force the next read to treat the entry as stale regardless of TTL.
    /// Entries with active observers refetch immediately.
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = entry_handle(&self.inner, key) {
            let refetch = {
                let mut guard = entry.lock().unwrap();
                guard.fetched_at = None;
                guard.observers > 0
            };
            debug!("invalidated cache entry {}", key);
            if refetch {
                spawn_fetch(&self.inner, key, &entry, false);
            }
        }
    }

    /// Attach an observer. The entry stays out of garbage collection and,
    /// when a refetch interval is set, refreshes on a timer until the last
    /// observer detaches.
    pub fn observe(&self, key: &QueryKey, options: QueryOptions) -> QueryObserverGuard {
        self.ensure_sweeper();
        let entry = entry_handle_or_create(&self.inner, key, options.clone());
        let start_poll = {
            let mut guard = entry.lock().unwrap();
            guard.observers += 1;
            guard.idle_since = None;
            if options.refetch_interval.is_some() {
                guard.options.refetch_interval = options.refetch_interval;
            }
            let start = guard.options.refetch_interval.is_some() && !guard.poll_running;
            if start {
                guard.poll_running = true;
            }
            start
        };
        if start_poll {
            spawn_poll(&self.inner, key, &entry);
        }
        QueryObserverGuard {
            key: key.clone(),
            entry,
        }
    }

    /// Drop an entry outright, waking anything parked on it. In-flight
    /// fetches are not cancelled; their results are discarded on arrival.
    pub fn remove(&self, key: &QueryKey) {
        if let Some((_, entry)) = self.inner.entries.remove(key) {
            entry.lock().unwrap().wake();
            debug!("removed cache entry {}", key);
        }
    }

    pub fn stats(&self) -> QueryCacheStats {
        QueryCacheStats {
            entry_count: self.inner.entries.len(),
        }
    }

    /// Options derived from the cache-wide defaults, for keys without their
    /// own tuning
    pub fn default_options(&self) -> QueryOptions {
        QueryOptions {
            stale_time: self.inner.config.default_stale_time,
            refetch_interval: None,
            retry: None,
        }
    }

    fn ensure_sweeper(&self) {
        if self.inner.sweeper_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = self.inner.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(shared.config.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                sweep(&shared);
            }
        });
    }
}

/// Keeps one cache entry alive and polling. Dropping the guard detaches the
/// observer; the poll timer stops and the idle clock starts once the count
/// reaches zero.
pub struct QueryObserverGuard {
    key: QueryKey,
    entry: EntryHandle,
}

impl QueryObserverGuard {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for QueryObserverGuard {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.entry.lock() {
            guard.observers = guard.observers.saturating_sub(1);
            if guard.observers == 0 {
                guard.idle_since = Some(Instant::now());
            }
        }
    }
}

fn entry_handle(shared: &CacheShared, key: &QueryKey) -> Option<EntryHandle> {
    shared.entries.get(key).map(|e| e.value().clone())
}

fn entry_handle_or_create(
    shared: &CacheShared,
    key: &QueryKey,
    options: QueryOptions,
) -> EntryHandle {
    if let Some(entry) = entry_handle(shared, key) {
        return entry;
    }
    let generation = shared.generations.fetch_add(1, Ordering::SeqCst) + 1;
    debug!("creating cache entry {}", key);
    shared
        .entries
        .entry(key.clone())
        .or_insert_with(|| Arc::new(Mutex::new(CacheEntry::new(generation, options))))
        .value()
        .clone()
}

/// Issue a fetch unless one is already pending (or `force` supersedes it).
/// Returns the issue number of the spawned fetch.
fn spawn_fetch(
    shared: &Arc<CacheShared>,
    key: &QueryKey,
    entry: &EntryHandle,
    force: bool,
) -> Option<u64> {
    let (seq, generation, retry_limit) = {
        let mut guard = entry.lock().unwrap();
        if guard.in_flight > 0 && !force {
            return None;
        }
        guard.last_issued += 1;
        guard.in_flight += 1;
        if guard.data.is_none() {
            guard.status = QueryStatus::Loading;
        }
        (
            guard.last_issued,
            guard.generation,
            guard.options.retry.unwrap_or(shared.config.retry_limit),
        )
    };

    let shared = shared.clone();
    let key = key.clone();
    tokio::spawn(async move {
        let mut attempt: u32 = 0;
        let outcome = loop {
            match shared.fetcher.fetch(&key).await {
                Ok(data) => break Ok(data),
                Err(err) => {
                    if attempt >= retry_limit {
                        break Err(err);
                    }
                    let delay = backoff_delay(
                        shared.config.retry_base_delay,
                        attempt,
                        shared.config.retry_max_delay,
                    );
                    debug!(
                        "fetch for {} failed, retry {} of {} in {:?}: {}",
                        key,
                        attempt + 1,
                        retry_limit,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        };
        apply_result(&shared, &key, generation, seq, outcome);
    });

    Some(seq)
}

/// Apply a settled fetch. Results for evicted or recreated entries, and
/// results superseded by a later-issued fetch, are discarded.
fn apply_result(
    shared: &CacheShared,
    key: &QueryKey,
    generation: u64,
    seq: u64,
    outcome: Result<QueryData, Error>,
) {
    let Some(entry) = entry_handle(shared, key) else {
        debug!("discarding fetch result for evicted entry {}", key);
        return;
    };
    let mut guard = entry.lock().unwrap();
    if guard.generation != generation {
        debug!("discarding fetch result for recreated entry {}", key);
        return;
    }
    guard.in_flight = guard.in_flight.saturating_sub(1);
    if seq < guard.last_applied {
        debug!("discarding superseded fetch result for {}", key);
        guard.wake();
        return;
    }
    guard.last_applied = seq;
    match outcome {
        Ok(data) => {
            guard.data = Some(data);
            guard.status = QueryStatus::Success;
            guard.error = None;
            guard.fetched_at = Some(Instant::now());
            guard.last_fetched_at = Some(Utc::now());
            guard.version += 1;
        }
        Err(err) => {
            warn!("fetch for {} failed after retries: {}", key, err);
            guard.status = QueryStatus::Error;
            guard.error = Some(Arc::new(err));
        }
    }
    guard.wake();
}

/// Park until the predicate holds. Wakes on every applied result; bails out
/// when the entry has been evicted from the map.
async fn wait_for<F>(
    shared: &CacheShared,
    key: &QueryKey,
    entry: &EntryHandle,
    pred: F,
) -> QuerySnapshot
where
    F: Fn(&CacheEntry) -> bool,
{
    let mut rx = {
        let guard = entry.lock().unwrap();
        if pred(&guard) {
            return guard.snapshot();
        }
        guard.version_tx.subscribe()
    };
    loop {
        if rx.changed().await.is_err() {
            return entry.lock().unwrap().snapshot();
        }
        {
            let guard = entry.lock().unwrap();
            if pred(&guard) {
                return guard.snapshot();
            }
        }
        let current = shared
            .entries
            .get(key)
            .map(|e| Arc::ptr_eq(e.value(), entry))
            .unwrap_or(false);
        if !current {
            debug!("entry {} evicted while awaited", key);
            return entry.lock().unwrap().snapshot();
        }
    }
}

fn spawn_poll(shared: &Arc<CacheShared>, key: &QueryKey, entry: &EntryHandle) {
    let period = { entry.lock().unwrap().options.refetch_interval };
    let Some(period) = period else {
        return;
    };
    let shared = shared.clone();
    let key = key.clone();
    let entry = entry.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let keep = {
                let mut guard = entry.lock().unwrap();
                if guard.observers == 0 {
                    guard.poll_running = false;
                    false
                } else {
                    true
                }
            };
            if !keep {
                break;
            }
            let current = shared
                .entries
                .get(&key)
                .map(|e| Arc::ptr_eq(e.value(), &entry))
                .unwrap_or(false);
            if !current {
                break;
            }
            spawn_fetch(&shared, &key, &entry, false);
        }
        debug!("polling stopped for {}", key);
    });
}

fn sweep(shared: &CacheShared) {
    let gc_time = shared.config.gc_time;
    let candidates: Vec<(QueryKey, EntryHandle)> = shared
        .entries
        .iter()
        .map(|r| (r.key().clone(), r.value().clone()))
        .collect();

    for (key, entry) in candidates {
        let evict = {
            let guard = entry.lock().unwrap();
            // never strand a first-load waiter; anything else settles on
            // its own and gets discarded by the generation check
            let first_load_pending = guard.in_flight > 0 && guard.data.is_none();
            guard.observers == 0
                && !first_load_pending
                && guard
                    .idle_since
                    .map(|at| at.elapsed() >= gc_time)
                    .unwrap_or(false)
        };
        if evict {
            shared.entries.remove_if(&key, |_, v| Arc::ptr_eq(v, &entry));
            entry.lock().unwrap().wake();
            debug!("evicted idle cache entry {}", key);
        }
    }
}

fn backoff_delay(base: Duration, attempt: u32, max: Duration) -> Duration {
    let delay = base.saturating_mul(2u32.saturating_pow(attempt));
    delay.min(max)
}
