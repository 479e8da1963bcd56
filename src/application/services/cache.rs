//! Two-tier cache with per-entry expiry and hit-rate accounting.
//!
//! The fast tier is an in-process bounded map; the durable tier is optional
//! and strictly best effort. A durable fault only ever costs a cache hit.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::traits::{DurableEntry, DurableStore};

pub const DEFAULT_CAPACITY: usize = 100;

/// Time source, swappable so expiry can be tested without sleeping.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct FastEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// Bounded map; `order` holds keys oldest insertion first.
struct FastTier {
    capacity: usize,
    entries: HashMap<String, FastEntry>,
    order: VecDeque<String>,
}

impl FastTier {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => entry.expires_at <= now,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    fn insert(&mut self, key: String, entry: FastEntry, now: DateTime<Utc>) {
        if self.entries.contains_key(&key) {
            self.remove(&key);
        } else if self.entries.len() >= self.capacity {
            self.evict(now);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, entry);
    }

    /// Drop everything expired; if that frees nothing, drop the oldest.
    fn evict(&mut self, now: DateTime<Utc>) {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        if self.entries.len() < before {
            let entries = &self.entries;
            self.order.retain(|k| entries.contains_key(k));
            debug!("evicted {} expired entries", before - self.entries.len());
            return;
        }
        if let Some(oldest) = self.order.pop_front() {
            self.entries.remove(&oldest);
            debug!("evicted oldest entry {oldest}");
        }
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[derive(Default)]
struct Counters {
    memory_hits: AtomicU64,
    memory_misses: AtomicU64,
    durable_hits: AtomicU64,
    durable_misses: AtomicU64,
    total_requests: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub durable_hits: u64,
    pub durable_misses: u64,
    pub total_requests: u64,
    pub durable_connected: bool,
    pub entries: usize,
}

/// Hit rates in percent, 0 when a tier saw no traffic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitRates {
    pub memory: f64,
    pub durable: f64,
    pub overall: f64,
}

fn percent(hits: u64, total: u64) -> f64 {
    if total > 0 {
        hits as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

impl CacheStats {
    pub fn hit_rates(&self) -> HitRates {
        HitRates {
            memory: percent(self.memory_hits, self.memory_hits + self.memory_misses),
            durable: percent(self.durable_hits, self.durable_hits + self.durable_misses),
            overall: percent(self.memory_hits + self.durable_hits, self.total_requests),
        }
    }

    pub fn report(&self) -> CacheReport {
        let rates = self.hit_rates();
        CacheReport {
            stats: *self,
            hit_rates: FormattedHitRates {
                memory: format!("{:.2}", rates.memory),
                durable: format!("{:.2}", rates.durable),
                overall: format!("{:.2}", rates.overall),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedHitRates {
    pub memory: String,
    pub durable: String,
    pub overall: String,
}

/// Stats plus rates rendered to two decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheReport {
    pub stats: CacheStats,
    pub hit_rates: FormattedHitRates,
}

/// Process-wide cache, constructed once and shared by reference.
pub struct TieredCache {
    fast: Mutex<FastTier>,
    durable: Option<Arc<dyn DurableStore>>,
    counters: Counters,
    clock: Clock,
}

impl TieredCache {
    /// Fast tier only.
    pub fn new(capacity: usize) -> Self {
        Self {
            fast: Mutex::new(FastTier::new(capacity)),
            durable: None,
            counters: Counters::default(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Fast tier plus `store`, if it answers a ping. Never fails.
    pub fn with_durable(capacity: usize, store: Arc<dyn DurableStore>) -> Self {
        let mut cache = Self::new(capacity);
        match store.ping() {
            Ok(()) => {
                info!("durable cache tier connected");
                cache.durable = Some(store);
            }
            Err(e) => warn!("durable cache tier unavailable, using memory only: {e}"),
        }
        cache
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_durable_connected(&self) -> bool {
        self.durable.is_some()
    }

    /// Typed lookup. A value that no longer matches `T` reads as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("cached value for {key} has unexpected shape: {e}");
                None
            }
        }
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);
        let now = (self.clock)();

        if let Some(value) = self.fast.lock().get(key, now) {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            debug!("memory hit: {key}");
            return Some(value);
        }
        self.counters.memory_misses.fetch_add(1, Ordering::Relaxed);

        let store = self.durable.as_ref()?;
        match store.load(key) {
            Ok(Some(entry)) if entry.expires_at > now => {
                self.counters.durable_hits.fetch_add(1, Ordering::Relaxed);
                debug!("durable hit: {key}");
                let value = entry.value.clone();
                self.fast.lock().insert(
                    key.to_string(),
                    FastEntry {
                        value: entry.value,
                        expires_at: entry.expires_at,
                    },
                    now,
                );
                Some(value)
            }
            Ok(Some(_)) => {
                self.counters.durable_misses.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = store.remove(key) {
                    debug!("could not drop expired durable entry {key}: {e}");
                }
                None
            }
            Ok(None) => {
                self.counters.durable_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.counters.durable_misses.fetch_add(1, Ordering::Relaxed);
                warn!("durable cache read failed for {key}: {e}");
                None
            }
        }
    }

    /// Store `value` for `ttl_secs`.
    ///
    /// Only a value that cannot be represented as JSON is an error; durable
    /// write failures are logged and swallowed.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> ApplicationResult<()> {
        let value = serde_json::to_value(value).map_err(|e| ApplicationError::Cache {
            message: format!("value for {key} is not serializable: {e}"),
        })?;
        let now = (self.clock)();
        let expires_at = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.fast.lock().insert(
            key.to_string(),
            FastEntry {
                value: value.clone(),
                expires_at,
            },
            now,
        );

        if let Some(store) = &self.durable {
            if let Err(e) = store.store(key, &DurableEntry { value, expires_at }) {
                warn!("durable cache write failed for {key}: {e}");
            }
        }
        Ok(())
    }

    /// Empty both tiers. Counters are kept.
    pub fn clear(&self) {
        self.fast.lock().clear();
        if let Some(store) = &self.durable {
            if let Err(e) = store.clear() {
                warn!("durable cache clear failed: {e}");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fast.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            memory_misses: self.counters.memory_misses.load(Ordering::Relaxed),
            durable_hits: self.counters.durable_hits.load(Ordering::Relaxed),
            durable_misses: self.counters.durable_misses.load(Ordering::Relaxed),
            total_requests: self.counters.total_requests.load(Ordering::Relaxed),
            durable_connected: self.is_durable_connected(),
            entries: self.len(),
        }
    }
}

impl Default for TieredCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
