//! Per-key request rate limiting.
//!
//! # Responsibilities
//! - Track a fixed-window-with-reset budget per (client, method, path) key
//! - Bound memory: evict the oldest window when the store is full
//! - Sweep fully elapsed windows on a background interval
//!
//! # Design Decisions
//! - One mutex guards the whole store; decide, update, evict and sweep are
//!   each a single critical section
//! - Windows can admit up to 2x the budget across a boundary
//! - The sweep task is owned by the limiter and stopped explicitly
//! - Budgets are at least one request; zero is raised to one

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::error::{AppError, Result};
use crate::http::middleware::{Middleware, Next};
use crate::http::request::RequestContext;
use crate::http::response::ResponseWriter;
use crate::observability::metrics;

/// Default capacity of the key store.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Default interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Budget applied by one `limit` middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl LimitConfig {
    /// A budget of zero is raised to one.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn from_millis(max_requests: u32, window_ms: u64) -> Self {
        Self::new(max_requests, Duration::from_millis(window_ms))
    }
}

impl From<&RateLimitConfig> for LimitConfig {
    fn from(config: &RateLimitConfig) -> Self {
        Self::from_millis(config.max_requests, config.window_ms)
    }
}

/// Window state of one limiter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub key: String,
    pub window: Duration,
    pub max_requests: u32,
    pub requests_left: u32,
    /// First request of the current window.
    pub window_start: Instant,
}

impl RateLimitEntry {
    fn new(key: &str, config: LimitConfig, now: Instant) -> Self {
        let max_requests = config.max_requests.max(1);
        Self {
            key: key.to_string(),
            window: config.window,
            max_requests,
            requests_left: max_requests,
            window_start: now,
        }
    }

    /// Returns true once the window has fully elapsed.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.window_start) > self.window
    }

    /// Spend one request from the budget, resetting an elapsed window.
    fn try_acquire(&mut self, now: Instant) -> bool {
        if self.requests_left > 0 {
            self.requests_left -= 1;
            return true;
        }

        if self.is_expired(now) {
            self.requests_left = self.max_requests.saturating_sub(1);
            self.window_start = now;
            return true;
        }

        false
    }
}

/// Bounded key → entry map.
#[derive(Debug)]
pub struct RateLimiterStore {
    entries: HashMap<String, RateLimitEntry>,
    max_entries: usize,
}

impl RateLimiterStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn get(&self, key: &str) -> Option<&RateLimitEntry> {
        self.entries.get(key)
    }

    /// Decide whether a request for `key` is allowed, updating its window.
    pub fn check(&mut self, key: &str, config: LimitConfig, now: Instant) -> bool {
        if !self.entries.contains_key(key) {
            while self.entries.len() >= self.max_entries {
                if !self.evict_oldest() {
                    break;
                }
            }
            self.entries
                .insert(key.to_string(), RateLimitEntry::new(key, config, now));
        }

        self.entries
            .get_mut(key)
            .map(|entry| entry.try_acquire(now))
            .unwrap_or(false)
    }

    /// Remove the entry with the oldest window start.
    fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.window_start)
            .map(|(key, _)| key.clone());

        match oldest {
            Some(key) => {
                tracing::debug!(key = %key, "Evicting oldest rate limit entry");
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Drop every entry whose window has fully elapsed. Returns how many.
    pub fn remove_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    /// Shrink capacity, evicting oldest entries as needed.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        while self.entries.len() > self.max_entries {
            if !self.evict_oldest() {
                break;
            }
        }
    }
}

struct SweepTask {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owner of the key store and its expiry sweep.
///
/// Cloning is cheap; clones share the store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<Mutex<RateLimiterStore>>,
    sweep_interval: Arc<Mutex<Duration>>,
    sweep_task: Arc<Mutex<Option<SweepTask>>>,
}

impl RateLimiter {
    pub fn new(max_entries: usize, sweep_interval: Duration) -> Self {
        Self {
            store: Arc::new(Mutex::new(RateLimiterStore::new(max_entries))),
            sweep_interval: Arc::new(Mutex::new(sweep_interval)),
            sweep_task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_tracked_keys,
            Duration::from_millis(config.sweep_interval_ms),
        )
    }

    /// Middleware enforcing `config` for every request it sees.
    pub fn limit(&self, config: LimitConfig) -> Arc<dyn Middleware> {
        Arc::new(RateLimit {
            limiter: self.clone(),
            config,
        })
    }

    /// Check one request for `key` against `config`.
    pub fn check(&self, key: &str, config: LimitConfig) -> bool {
        let mut store = self.store();
        let allowed = store.check(key, config, Instant::now());
        metrics::record_limiter_entries(store.len());
        allowed
    }

    /// Remove fully elapsed windows now. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut store = self.store();
        let removed = store.remove_expired(Instant::now());
        metrics::record_limiter_entries(store.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = store.len(), "Swept expired rate limit entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// Window state of `key`, if tracked.
    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.store().get(key).cloned()
    }

    pub fn set_max_size(&self, max_entries: usize) {
        self.store().set_max_entries(max_entries);
    }

    /// Change the sweep interval, restarting the sweep if it is running.
    pub fn set_sweep_interval(&self, interval: Duration) {
        *lock(&self.sweep_interval) = interval;
        if self.is_running() {
            self.stop();
            self.start();
        }
    }

    /// Spawn the periodic expiry sweep. Must be called inside a Tokio runtime.
    ///
    /// Calling `start` while already running is a no-op.
    pub fn start(&self) {
        let mut task = lock(&self.sweep_task);
        if task.is_some() {
            return;
        }

        let interval = (*lock(&self.sweep_interval)).max(Duration::from_millis(1));
        let (shutdown, rx) = broadcast::channel(1);
        let limiter = self.clone();
        let handle = tokio::spawn(async move {
            limiter.run_sweep(interval, rx).await;
        });

        *task = Some(SweepTask { shutdown, handle });
    }

    /// Stop the periodic sweep. Safe to call more than once.
    pub fn stop(&self) {
        if let Some(task) = lock(&self.sweep_task).take() {
            let _ = task.shutdown.send(());
            task.handle.abort();
            tracing::debug!("Rate limiter sweep stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.sweep_task).is_some()
    }

    async fn run_sweep(&self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = interval.as_millis() as u64, "Rate limiter sweep starting");

        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limiter sweep received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn store(&self) -> MutexGuard<'_, RateLimiterStore> {
        lock(&self.store)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("entries", &self.len())
            .field("running", &self.is_running())
            .finish()
    }
}

/// A panic while holding the lock leaves the store consistent, so poisoning
/// is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Key of one independent window.
pub fn limiter_key(client_key: &str, method: &str, path: &str) -> String {
    format!("{client_key}_{method}_{path}")
}

/// Middleware returned by [`RateLimiter::limit`].
pub struct RateLimit {
    limiter: RateLimiter,
    config: LimitConfig,
}

impl Middleware for RateLimit {
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut ResponseWriter,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let key = limiter_key(&req.client_key, req.method.as_str(), &req.path);

            if !self.limiter.check(&key, self.config) {
                tracing::warn!(key = %key, max_requests = self.config.max_requests, "Rate limit exceeded");
                metrics::record_rate_limited(req.method.as_str());
                return Err(AppError::too_many_requests());
            }

            next.run(req, res).await
        })
    }
}
