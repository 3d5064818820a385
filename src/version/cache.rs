//! In-memory response cache with per-entry expiry
//!
//! Entries expire lazily: a read past the expiry instant behaves as a miss even
//! if the background sweep has not removed the entry yet. The sweep only bounds
//! memory held by entries that are never read again.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Interval between two sweeps of expired entries
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound applied to ttls so `now + ttl` cannot overflow
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe key/value store with per-entry ttl
///
/// Entries are stored behind `Arc` and replaced as a whole on `set`, so a
/// reader holds either the old (value, expiry) pair or the new one.
#[derive(Debug)]
pub struct VersionCache<V> {
    entries: RwLock<HashMap<String, Arc<CacheEntry<V>>>>,
}

impl<V> Default for VersionCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> VersionCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in Arc for sharing across tasks
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // A panic while holding the lock cannot leave a half-written entry behind,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<CacheEntry<V>>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<CacheEntry<V>>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under `key`, replacing any previous entry and its expiry.
    ///
    /// A zero ttl stores an entry that is already expired.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Arc::new(CacheEntry {
            value,
            expires_at: Instant::now() + ttl.min(MAX_TTL),
        });
        self.write().insert(key.into(), entry);
    }

    /// Removes all entries
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Removes expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<V: Clone> VersionCache<V> {
    /// Returns the value for `key` unless it is missing or expired
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.read().get(key).cloned()?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(entry.value.clone())
    }
}

impl<V: Send + Sync + 'static> VersionCache<V> {
    /// Starts the periodic sweep of expired entries.
    ///
    /// The sweep stops when the returned handle is stopped or dropped, or when
    /// the last strong reference to the cache goes away. Must be called from
    /// within a Tokio runtime.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> SweepHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(sweep_loop(
            Arc::downgrade(self),
            interval.max(Duration::from_millis(1)),
            token.clone(),
        ));

        SweepHandle {
            token,
            task: Some(task),
        }
    }
}

async fn sweep_loop<V>(cache: Weak<VersionCache<V>>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!("Swept {} expired cache entries", removed);
                }
            }
        }
    }

    debug!("Cache sweeper stopped");
}

/// Handle controlling a running cache sweeper
#[derive(Debug)]
pub struct SweepHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Stops the sweeper and waits for it to exit
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
