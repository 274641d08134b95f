//! # Gatehouse - Access Control Core for Billboard Projects
//!
//! Every write path in the service (create or duplicate a project, sign up,
//! sign in, generate AI content) asks one question before touching storage:
//! *is this caller allowed to do this right now?* Gatehouse answers it in two
//! independent steps.
//!
//! ## Fixed Window Rate Limiting
//!
//! Each caller key (usually the client IP) gets a counter that lives for one
//! window. The first request opens the window, later requests count against
//! it, and once the window ends the next request starts over.
//!
//! ```text
//!     Policy { window_ms: 60_000, max_requests: 5 }, key "1.2.3.4"
//!
//!     t=0s    ✅ remaining 4      ← window opens, resets at t=60s
//!     t=1s    ✅ remaining 3
//!     t=2s    ✅ remaining 2
//!     t=3s    ✅ remaining 1
//!     t=4s    ✅ remaining 0
//!     t=5s    ❌ rejected         ← retry after 55s
//!     t=60s   ✅ remaining 4      ← new window
//! ```
//!
//! ## Plan Quotas
//!
//! Subscription tiers carry static limits per action: a count (`5` projects),
//! `unlimited`, or a yes/no capability (high-resolution export). The caller
//! supplies current usage; the authorizer says yes or no and how much is left.
//!
//! | Action            | FREE    | PRO       | ENTERPRISE |
//! |-------------------|---------|-----------|------------|
//! | `projects`        | 5       | unlimited | unlimited  |
//! | `ai_generations`  | 10      | 500       | unlimited  |
//! | `storage_bytes`   | 100 MiB | 10 GiB    | unlimited  |
//! | `high_res_export` | no      | yes       | yes        |
//! | `custom_branding` | no      | yes       | yes        |
//! | `api_access`      | no      | no        | yes        |
//!
//! ## Quick Start
//!
//! ### Rate limiting a sign-in endpoint
//!
//! ```rust
//! use gatehouse::{caller_key, FixedWindowLimiter, RateLimitPolicy};
//!
//! let limiter = FixedWindowLimiter::new();
//! let sign_in = RateLimitPolicy::per_minute(5).unwrap();
//!
//! let key = caller_key(Some("203.0.113.7, 10.0.0.1"), None);
//! let result = limiter.check_now(&format!("sign-in:{}", key), &sign_in);
//!
//! if !result.admitted {
//!     // 429 Too Many Requests, Retry-After: result.retry_after_secs(now)
//! }
//! ```
//!
//! ### Guarding a write with both checks
//!
//! ```rust
//! use gatehouse::{AccessGate, ActionKind, Decision, PlanTier, RateLimitPolicy};
//!
//! let gate = AccessGate::default();
//! let create = RateLimitPolicy::per_minute(20).unwrap();
//!
//! match gate.admit_now("203.0.113.7", &create, PlanTier::Free, ActionKind::Projects, 2) {
//!     Decision::Proceed { remaining, .. } => println!("creating, {} left", remaining),
//!     Decision::Throttled(rate) => println!("slow down, limit {}", rate.limit),
//!     Decision::QuotaReached(quota) => println!("{}", quota),
//! }
//! ```
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │   Request handlers      │
//!                    └──────────┬──────────────┘
//!                               │
//!                    ┌──────────▼──────────────┐
//!                    │       AccessGate        │
//!                    └──────────┬──────────────┘
//!                               │
//!                ┌──────────────┴───────────────┐
//!                │                              │
//!     ┌──────────▼──────────┐       ┌───────────▼──────────┐
//!     │ FixedWindowLimiter  │       │  QuotaAuthorizer     │
//!     ├─────────────────────┤       ├──────────────────────┤
//!     │ • Sharded registry  │       │ • Static plan table  │
//!     │ • Per-key atomicity │       │ • Pure decisions     │
//!     │ • Background sweep  │       │ • Fails closed       │
//!     └─────────────────────┘       └──────────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! - `FixedWindowLimiter` - share via `Arc`; concurrent checks on one key
//!   never admit more than `max_requests` per window
//! - `QuotaAuthorizer` - immutable, cheap to clone
//! - `AccessGate` - cheap to clone, clones share one limiter
//!
//! ## Configuration
//!
//! - `GATEHOUSE_SWEEP_INTERVAL_MS` - sweep cadence, see [`LimiterConfig::from_env`]
//! - `GATEHOUSE_PLAN_LIMITS` - path to a JSON plan table, see [`LimitsTable::from_env`]

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

mod error;
mod gate;
mod quota;
mod rate_limiter;

pub use error::{Error, Result};

pub use gate::{AccessGate, Decision};

pub use quota::{
    ActionKind, Limit, LimitsTable, PlanLimits, PlanTier, QuotaAuthorizer, QuotaDecision,
    Remaining, PLAN_LIMITS_ENV,
};

pub use rate_limiter::{
    caller_key, current_time_ms, FixedWindowLimiter, HealthStatus, LimitResult, LimiterConfig,
    LimiterMetrics, RateLimitPolicy, SweeperHandle, DEFAULT_EXPECTED_KEYS,
    DEFAULT_SWEEP_INTERVAL_MS, HIGH_KEY_COUNT, SWEEP_INTERVAL_ENV, UNKNOWN_CALLER,
};

/// A limiter wrapped in `Arc`, the form the sweeper and the gate expect.
///
/// # Example
/// ```rust
/// use gatehouse::{FixedWindowLimiter, RateLimitPolicy, SharedLimiter};
/// use std::sync::Arc;
///
/// let shared: SharedLimiter = Arc::new(FixedWindowLimiter::new());
/// let policy = RateLimitPolicy::per_second(10).unwrap();
///
/// let limiter = shared.clone();
/// std::thread::spawn(move || {
///     limiter.check_now("worker", &policy);
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(shared.tracked_keys(), 1);
/// ```
pub type SharedLimiter = std::sync::Arc<FixedWindowLimiter>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum supported Rust version.
pub const MSRV: &str = "1.70.0";

/// Prelude module for convenient imports.
///
/// ```rust
/// use gatehouse::prelude::*;
/// ```
pub mod prelude {
    //! Common imports for request handlers.

    pub use crate::{
        caller_key, AccessGate, ActionKind, Decision, FixedWindowLimiter, LimitResult,
        PlanTier, QuotaAuthorizer, RateLimitPolicy, Remaining, SharedLimiter,
    };
}

/// Fluent construction of a [`FixedWindowLimiter`].
///
/// # Example
///
/// ```rust
/// use gatehouse::LimiterBuilder;
///
/// let limiter = LimiterBuilder::new()
///     .sweep_interval_ms(30_000)
///     .expected_keys(50_000)
///     .try_build()
///     .unwrap();
/// assert_eq!(limiter.tracked_keys(), 0);
///
/// // A zero sweep interval could never run
/// assert!(LimiterBuilder::new().sweep_interval_ms(0).try_build().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct LimiterBuilder {
    config: LimiterConfig,
}

impl LimiterBuilder {
    /// Builder starting from [`LimiterConfig::default`].
    pub fn new() -> Self {
        Self {
            config: LimiterConfig::default(),
        }
    }

    /// Builder starting from environment overrides, see [`LimiterConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            config: LimiterConfig::from_env(),
        }
    }

    /// Interval between background sweeps.
    pub fn sweep_interval_ms(mut self, ms: u64) -> Self {
        self.config.sweep_interval_ms = ms;
        self
    }

    /// Number of caller keys to pre-size the registry for.
    pub fn expected_keys(mut self, keys: usize) -> Self {
        self.config.expected_keys = keys;
        self
    }

    /// Builds the limiter without validating.
    ///
    /// An invalid configuration only matters once
    /// [`spawn_sweeper`](FixedWindowLimiter::spawn_sweeper) is called, which
    /// reports it then.
    pub fn build(self) -> FixedWindowLimiter {
        FixedWindowLimiter::with_config(self.config)
    }

    /// Builds the limiter, rejecting an invalid configuration.
    pub fn try_build(self) -> Result<FixedWindowLimiter> {
        self.config.validate()?;
        Ok(FixedWindowLimiter::with_config(self.config))
    }
}

impl Default for LimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_basic_functionality() {
        let limiter = FixedWindowLimiter::new();
        let policy = RateLimitPolicy::new(1_000, 10).unwrap();

        for _ in 0..10 {
            assert!(limiter.check("k", &policy, 0).admitted);
        }
        assert!(!limiter.check("k", &policy, 0).admitted);

        let metrics = limiter.metrics();
        assert_eq!(metrics.total_admitted, 10);
        assert_eq!(metrics.total_rejected, 1);
    }

    #[test]
    fn test_builder() {
        let limiter = LimiterBuilder::new()
            .sweep_interval_ms(5_000)
            .expected_keys(16)
            .build();

        assert_eq!(limiter.tracked_keys(), 0);
        assert!(LimiterBuilder::default().try_build().is_ok());
    }

    #[test]
    fn test_builder_validation() {
        let result = LimiterBuilder::new().sweep_interval_ms(0).try_build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_thread_safety() {
        let limiter: SharedLimiter = Arc::new(FixedWindowLimiter::new());
        let policy = RateLimitPolicy::new(60_000, 1_000).unwrap();
        let mut handles = vec![];

        for _ in 0..10 {
            let limiter = limiter.clone();
            handles.push(thread::spawn(move || {
                (0..200)
                    .filter(|_| limiter.check("shared", &policy, 5).admitted)
                    .count()
            }));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // Fixed `now`, so no window can roll over mid-test
        assert_eq!(total, 1_000);
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _gate = AccessGate::default();
        let _quota = QuotaAuthorizer::default();
        let _tier = PlanTier::Pro;
        let _action = ActionKind::AiGenerations;
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(MSRV, "1.70.0");
    }
}
