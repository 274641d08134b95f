//! # Rate Limiter Configuration
//!
//! Two kinds of settings live here:
//!
//! - [`RateLimitPolicy`]: what a single call site allows. Supplied fresh on every
//!   check, because different endpoints apply different policies to the same caller.
//! - [`LimiterConfig`]: how the shared limiter itself runs (sweep cadence, sizing).
//!
//! ## Fixed Window Parameters
//!
//! ```text
//!     Policy { window_ms: 60_000, max_requests: 5 }
//!
//!     t=0s                                      t=60s
//!     ├──────────────── window ─────────────────┤
//!     │ ✅ ✅ ✅ ✅ ✅ ❌ ❌                       │ ✅ (new window)
//!     └─────────────────────────────────────────┘
//! ```

use crate::error::{Error, Result};

/// Default interval between background sweeps (one minute).
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Default number of caller keys the registry is pre-sized for.
pub const DEFAULT_EXPECTED_KEYS: usize = 10_000;

/// Environment variable overriding the sweep interval.
pub const SWEEP_INTERVAL_ENV: &str = "GATEHOUSE_SWEEP_INTERVAL_MS";

/// Per call site rate limit: at most `max_requests` per `window_ms`.
///
/// A policy can only be obtained through its validating constructors, so a
/// `RateLimitPolicy` value is always usable by
/// [`FixedWindowLimiter::check`](crate::FixedWindowLimiter::check).
///
/// ## Examples
///
/// ```rust
/// use gatehouse::RateLimitPolicy;
///
/// // Sign-in: 5 attempts per minute
/// let sign_in = RateLimitPolicy::per_minute(5).unwrap();
/// assert_eq!(sign_in.window_ms(), 60_000);
///
/// // Custom window
/// let burst = RateLimitPolicy::new(10_000, 20).unwrap();
/// assert_eq!(burst.max_requests(), 20);
///
/// // Misconfiguration is rejected up front
/// assert!(RateLimitPolicy::new(0, 5).is_err());
/// assert!(RateLimitPolicy::new(1_000, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateLimitPolicy {
    window_ms: u64,
    max_requests: u32,
}

impl RateLimitPolicy {
    /// Creates a policy allowing `max_requests` per `window_ms` milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] if either value is zero.
    pub fn new(window_ms: u64, max_requests: u32) -> Result<Self> {
        let policy = Self {
            window_ms,
            max_requests,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// `max_requests` per second.
    pub fn per_second(max_requests: u32) -> Result<Self> {
        Self::new(1_000, max_requests)
    }

    /// `max_requests` per minute.
    pub fn per_minute(max_requests: u32) -> Result<Self> {
        Self::new(60_000, max_requests)
    }

    /// `max_requests` per hour.
    pub fn per_hour(max_requests: u32) -> Result<Self> {
        Self::new(3_600_000, max_requests)
    }

    fn validate(&self) -> Result<()> {
        if self.window_ms == 0 {
            return Err(Error::InvalidPolicy("window_ms must be greater than 0"));
        }
        if self.max_requests == 0 {
            return Err(Error::InvalidPolicy("max_requests must be greater than 0"));
        }
        Ok(())
    }

    /// Window length in milliseconds.
    #[inline]
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Requests admitted per window.
    #[inline]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Average admitted rate per second, for display.
    pub fn effective_rate_per_second(&self) -> f64 {
        (self.max_requests as f64 * 1000.0) / self.window_ms as f64
    }
}

/// Runtime settings for a [`FixedWindowLimiter`](crate::FixedWindowLimiter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Milliseconds between background sweeps of expired windows.
    pub sweep_interval_ms: u64,

    /// Capacity hint for the key registry. Not a cap; the registry grows past it.
    pub expected_keys: usize,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            expected_keys: DEFAULT_EXPECTED_KEYS,
        }
    }
}

impl LimiterConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var(SWEEP_INTERVAL_ENV) {
            if let Ok(interval) = val.parse() {
                config.sweep_interval_ms = interval;
            }
        }

        config
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval_ms(mut self, interval_ms: u64) -> Self {
        self.sweep_interval_ms = interval_ms;
        self
    }

    /// Sets the registry capacity hint.
    pub fn with_expected_keys(mut self, keys: usize) -> Self {
        self.expected_keys = keys;
        self
    }

    /// Checks the configuration for values the limiter cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `sweep_interval_ms` is 0.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "sweep_interval_ms must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_validation() {
        assert!(RateLimitPolicy::new(60_000, 5).is_ok());

        let err = RateLimitPolicy::new(0, 5).unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy(_)));

        let err = RateLimitPolicy::new(60_000, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy(_)));
    }

    #[test]
    fn test_policy_constructors() {
        let policy = RateLimitPolicy::per_second(10).unwrap();
        assert_eq!(policy.window_ms(), 1_000);
        assert_eq!(policy.max_requests(), 10);

        let policy = RateLimitPolicy::per_minute(120).unwrap();
        assert_eq!(policy.window_ms(), 60_000);
        assert_eq!(policy.effective_rate_per_second(), 2.0);

        let policy = RateLimitPolicy::per_hour(3_600).unwrap();
        assert_eq!(policy.window_ms(), 3_600_000);
        assert_eq!(policy.effective_rate_per_second(), 1.0);

        assert!(RateLimitPolicy::per_minute(0).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = LimiterConfig::default();
        assert_eq!(config.sweep_interval_ms, DEFAULT_SWEEP_INTERVAL_MS);
        assert_eq!(config.expected_keys, DEFAULT_EXPECTED_KEYS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builders() {
        let config = LimiterConfig::default()
            .with_sweep_interval_ms(500)
            .with_expected_keys(64);
        assert_eq!(config.sweep_interval_ms, 500);
        assert_eq!(config.expected_keys, 64);
    }

    #[test]
    fn test_config_validation() {
        let config = LimiterConfig::default().with_sweep_interval_ms(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
