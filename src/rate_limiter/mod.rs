//! # Rate Limiter Module
//!
//! Fixed-window request counting keyed by caller identity.
//!
//! ## Module Structure
//!
//! ```text
//!     rate_limiter/
//!     ├── mod.rs          (Module organization)
//!     ├── config.rs       (Per-call policies and limiter settings)
//!     ├── core.rs         (Fixed window counter and key registry)
//!     ├── sweeper.rs      (Background removal of expired windows)
//!     ├── metrics.rs      (Counters and health)
//!     └── utils.rs        (Clock and caller-key helpers)
//! ```
//!
//! ## Architecture Flow
//!
//! ```text
//!     Handler
//!        │  caller_key(forwarded_for, peer)
//!        ▼
//!     ┌──────────────────┐      ┌──────────┐
//!     │ FixedWindowLimiter│ ◄── │ Sweeper  │  (every sweep_interval_ms)
//!     └────────┬─────────┘      └──────────┘
//!              │ LimitResult { admitted, limit, remaining, reset_at }
//!              ▼
//!     Handler: 429 when !admitted
//! ```

mod config;
mod core;
mod metrics;
mod sweeper;
mod utils;

pub use config::{
    LimiterConfig, RateLimitPolicy, DEFAULT_EXPECTED_KEYS, DEFAULT_SWEEP_INTERVAL_MS,
    SWEEP_INTERVAL_ENV,
};

pub use self::core::{FixedWindowLimiter, LimitResult};

pub use metrics::{HealthStatus, LimiterMetrics};

pub use sweeper::{SweeperHandle, HIGH_KEY_COUNT};

pub use utils::{caller_key, current_time_ms, UNKNOWN_CALLER};
