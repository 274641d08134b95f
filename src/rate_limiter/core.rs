//! # Fixed Window Rate Limiter
//!
//! Counts requests per caller key inside fixed, non-overlapping windows.
//!
//! ## The Fixed Window Algorithm
//!
//! ```text
//!     Policy: 5 requests / 60s, key "1.2.3.4"
//!
//!     now=0s     create window {count: 1, end: 60s}   ✅ remaining 4
//!     now=1s     count 2                               ✅ remaining 3
//!     ...
//!     now=4s     count 5                               ✅ remaining 0
//!     now=5s     count 6 > 5                           ❌ remaining 0
//!     now=60s    now >= end: replace window            ✅ remaining 4
//! ```
//!
//! ## Concurrency
//!
//! Windows live in a sharded [`DashMap`]. Each check performs its whole
//! create-or-reset-or-increment step while holding the entry lock for the key,
//! so two requests for the same key can never both open a fresh window or
//! lose an increment. Keys hashed to different shards never contend.
//!
//! ```text
//!     Thread A ("1.2.3.4") ──► shard 3 lock ──► increment
//!     Thread B ("1.2.3.4") ──► shard 3 lock ──► (waits) ──► increment
//!     Thread C ("5.6.7.8") ──► shard 9 lock ──► increment   (no contention)
//! ```

use super::{
    config::{LimiterConfig, RateLimitPolicy},
    metrics::LimiterMetrics,
    utils::{current_time_ms, normalize_key},
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Counter state for one caller key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RateWindow {
    /// Requests observed in this window, including rejected ones.
    count: u32,

    /// Absolute time (ms since epoch) at which the window resets.
    window_end: u64,
}

impl RateWindow {
    #[inline]
    fn open(policy: &RateLimitPolicy, now: u64) -> Self {
        Self {
            count: 1,
            window_end: now.saturating_add(policy.window_ms()),
        }
    }

    /// A window covers `[start, window_end)`; arriving at `window_end` starts a new one.
    #[inline]
    fn is_expired(&self, now: u64) -> bool {
        now >= self.window_end
    }
}

/// Outcome of a single rate limit check.
///
/// Rejection is an ordinary value (`admitted == false`), not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitResult {
    /// Whether the request may proceed.
    pub admitted: bool,

    /// The policy's `max_requests`.
    pub limit: u32,

    /// Requests still allowed in the current window. Never negative.
    pub remaining: u32,

    /// Time (ms since epoch) at which the current window resets.
    pub reset_at: u64,
}

impl LimitResult {
    /// Milliseconds until the window resets, 0 if it already has.
    #[inline]
    pub fn retry_after_ms(&self, now: u64) -> u64 {
        self.reset_at.saturating_sub(now)
    }

    /// Whole seconds until reset, rounded up, for a `Retry-After` header.
    pub fn retry_after_secs(&self, now: u64) -> u64 {
        self.retry_after_ms(now).saturating_add(999) / 1000
    }
}

/// Process-wide fixed window rate limiter.
///
/// One limiter serves every guarded endpoint. The policy is passed on each
/// call, so the same key can be checked against different policies, but note
/// that a key has a single window: endpoints that should be counted
/// separately must use distinct keys (for example `"sign-in:1.2.3.4"`).
///
/// ## Example
///
/// ```rust
/// use gatehouse::{FixedWindowLimiter, RateLimitPolicy};
///
/// let limiter = FixedWindowLimiter::new();
/// let policy = RateLimitPolicy::new(60_000, 5).unwrap();
///
/// for expected in [4, 3, 2, 1, 0] {
///     let result = limiter.check("1.2.3.4", &policy, 1_000);
///     assert!(result.admitted);
///     assert_eq!(result.remaining, expected);
/// }
///
/// let sixth = limiter.check("1.2.3.4", &policy, 1_000);
/// assert!(!sixth.admitted);
/// assert_eq!(sixth.remaining, 0);
/// assert_eq!(sixth.limit, 5);
/// ```
pub struct FixedWindowLimiter {
    /// Caller key to window. Sharded, so unrelated keys rarely share a lock.
    windows: DashMap<String, RateWindow, ahash::RandomState>,

    /// Settings used by the background sweeper.
    pub(crate) config: LimiterConfig,

    total_admitted: AtomicU64,
    total_rejected: AtomicU64,
    windows_opened: AtomicU64,
    windows_swept: AtomicU64,

    /// Latest `now` passed to `check`; the background sweep never looks past it.
    latest_now: AtomicU64,
}

impl FixedWindowLimiter {
    /// Creates a limiter with default settings.
    pub fn new() -> Self {
        Self::with_config(LimiterConfig::default())
    }

    /// Creates a limiter with custom settings.
    ///
    /// The configuration is validated when the sweeper is spawned, since the
    /// check path does not depend on it.
    pub fn with_config(config: LimiterConfig) -> Self {
        // Calculate shard count based on CPU cores
        // More shards = less contention but more memory overhead
        let num_shards = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
            .saturating_mul(4)
            .next_power_of_two()
            .clamp(4, 256);

        Self {
            windows: DashMap::with_capacity_and_hasher_and_shard_amount(
                config.expected_keys,
                ahash::RandomState::new(),
                num_shards,
            ),
            config,
            total_admitted: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
            windows_opened: AtomicU64::new(0),
            windows_swept: AtomicU64::new(0),
            latest_now: AtomicU64::new(0),
        }
    }

    /// Checks and counts one request from `key` at time `now` (ms since epoch).
    ///
    /// - No window, or `now` at or past its end: a fresh window opens with
    ///   `count = 1` and the request is admitted.
    /// - Otherwise the count is incremented; the request is admitted while
    ///   `count <= max_requests`.
    ///
    /// An empty or blank key is counted under
    /// [`UNKNOWN_CALLER`](crate::UNKNOWN_CALLER).
    pub fn check(&self, key: &str, policy: &RateLimitPolicy, now: u64) -> LimitResult {
        let key = normalize_key(key);
        self.observe(now);
        let limit = policy.max_requests();

        // Fast path for the common case: key already present. get_mut takes the
        // shard write lock, so the read-modify-write below is atomic per key.
        let window = match self.windows.get_mut(key) {
            Some(mut existing) => self.advance(existing.value_mut(), policy, now),
            None => self.open_window(key, policy, now),
        };

        if window.count > limit {
            self.total_rejected.fetch_add(1, Ordering::Relaxed);
            debug!(
                key,
                count = window.count,
                limit,
                reset_at = window.window_end,
                "Rate limit exceeded"
            );
            LimitResult {
                admitted: false,
                limit,
                remaining: 0,
                reset_at: window.window_end,
            }
        } else {
            self.total_admitted.fetch_add(1, Ordering::Relaxed);
            LimitResult {
                admitted: true,
                limit,
                remaining: limit - window.count,
                reset_at: window.window_end,
            }
        }
    }

    /// Slow path: insert a window for a key not yet in the registry.
    ///
    /// Uses the entry API so that concurrent first arrivals for the same key
    /// resolve to exactly one creation; the losers increment the winner's window.
    fn open_window(&self, key: &str, policy: &RateLimitPolicy, now: u64) -> RateWindow {
        match self.windows.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => self.advance(occupied.get_mut(), policy, now),
            Entry::Vacant(vacant) => {
                let window = RateWindow::open(policy, now);
                vacant.insert(window);
                self.windows_opened.fetch_add(1, Ordering::Relaxed);
                debug!(key, window_end = window.window_end, "Opened rate window");
                window
            }
        }
    }

    /// Counts one request against an existing window, reopening it if expired.
    #[inline]
    fn advance(&self, window: &mut RateWindow, policy: &RateLimitPolicy, now: u64) -> RateWindow {
        if window.is_expired(now) {
            *window = RateWindow::open(policy, now);
            self.windows_opened.fetch_add(1, Ordering::Relaxed);
        } else {
            window.count = window.count.saturating_add(1);
        }
        *window
    }

    /// Records `now` as the latest time seen by `check`.
    #[inline]
    fn observe(&self, now: u64) {
        // Plain load first so the common case stays a shared read.
        if now > self.latest_now.load(Ordering::Relaxed) {
            self.latest_now.fetch_max(now, Ordering::Relaxed);
        }
    }

    /// Time the background sweeper sweeps against.
    ///
    /// This is the latest `now` any check has passed, capped by
    /// [`current_time_ms`]. Windows are judged on the callers' own timeline,
    /// so a caller whose timestamps lag the crate clock never has a live
    /// window swept from under it. Until some check has run, nothing is old
    /// enough to sweep.
    pub fn sweep_horizon(&self) -> u64 {
        self.latest_now
            .load(Ordering::Relaxed)
            .min(current_time_ms())
    }

    /// [`check`](Self::check) against the crate clock.
    #[inline]
    pub fn check_now(&self, key: &str, policy: &RateLimitPolicy) -> LimitResult {
        self.check(key, policy, current_time_ms())
    }

    /// Removes every window that has expired as of `now`. Returns the count removed.
    ///
    /// Uses the same expiry test as [`check`](Self::check), so a key removed
    /// here behaves exactly like one whose window had merely expired.
    pub fn sweep(&self, now: u64) -> usize {
        let mut removed = 0usize;
        self.windows.retain(|_, window| {
            let expired = window.is_expired(now);
            removed += usize::from(expired);
            !expired
        });

        if removed > 0 {
            self.windows_swept.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, remaining = self.windows.len(), "Swept expired rate windows");
        }

        removed
    }

    /// Number of keys currently held, including expired but unswept ones.
    #[inline]
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drops every window. Subsequent checks start from scratch.
    pub fn clear(&self) {
        let count = self.windows.len();
        self.windows.clear();
        debug!(count, "Cleared all rate windows");
    }

    /// Snapshot of the limiter's counters.
    pub fn metrics(&self) -> LimiterMetrics {
        LimiterMetrics {
            total_admitted: self.total_admitted.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            windows_opened: self.windows_opened.load(Ordering::Relaxed),
            windows_swept: self.windows_swept.load(Ordering::Relaxed),
            tracked_keys: self.tracked_keys(),
        }
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FixedWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowLimiter")
            .field("tracked_keys", &self.tracked_keys())
            .field("sweep_interval_ms", &self.config.sweep_interval_ms)
            .finish()
    }
}
