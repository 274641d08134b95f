//! # Limiter Metrics
//!
//! Point-in-time counters for a [`FixedWindowLimiter`](crate::FixedWindowLimiter),
//! plus a coarse health reading derived from them.
//!
//! ```text
//!     Limiter Metrics:
//!     ├─ Requests:  admitted / rejected
//!     ├─ Windows:   opened / swept / tracked now
//!     └─ Health:    Healthy | Degraded | Critical
//! ```

use std::fmt;

/// Rejection ratio above which the limiter reports itself degraded.
const DEGRADED_REJECTION_RATE: f64 = 0.3;

/// Rejection ratio above which the limiter reports itself critical.
const CRITICAL_REJECTION_RATE: f64 = 0.5;

/// Snapshot of limiter counters.
///
/// Counters are read individually with relaxed loads, so under concurrent
/// traffic the fields may be off by a few requests relative to each other.
///
/// ## Example
///
/// ```rust
/// use gatehouse::{FixedWindowLimiter, RateLimitPolicy};
///
/// let limiter = FixedWindowLimiter::new();
/// let policy = RateLimitPolicy::per_minute(1).unwrap();
///
/// limiter.check("1.2.3.4", &policy, 0);
/// limiter.check("1.2.3.4", &policy, 1);
///
/// let metrics = limiter.metrics();
/// assert_eq!(metrics.total_admitted, 1);
/// assert_eq!(metrics.total_rejected, 1);
/// println!("{}", metrics.summary());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterMetrics {
    /// Requests admitted since startup.
    pub total_admitted: u64,

    /// Requests rejected since startup.
    pub total_rejected: u64,

    /// Windows created, either for a new key or replacing an expired one.
    pub windows_opened: u64,

    /// Expired windows removed by sweeps.
    pub windows_swept: u64,

    /// Keys currently held in the registry, expired or not.
    pub tracked_keys: usize,
}

impl LimiterMetrics {
    /// Total requests seen (admitted + rejected).
    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.total_admitted + self.total_rejected
    }

    /// Fraction of requests admitted, 1.0 when no requests have been seen.
    #[inline]
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            1.0
        } else {
            self.total_admitted as f64 / total as f64
        }
    }

    /// Fraction of requests rejected.
    #[inline]
    pub fn rejection_rate(&self) -> f64 {
        1.0 - self.success_rate()
    }

    /// Health reading based on the lifetime rejection ratio.
    ///
    /// A high ratio means callers routinely exceed their policies: either the
    /// policies are too tight or someone is hammering a guarded endpoint.
    pub fn health_status(&self) -> HealthStatus {
        let rejection_rate = self.rejection_rate();
        if rejection_rate > CRITICAL_REJECTION_RATE {
            HealthStatus::Critical
        } else if rejection_rate > DEGRADED_REJECTION_RATE {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Human-readable report suitable for logging.
    pub fn summary(&self) -> String {
        format!(
            "Limiter Metrics:\n\
             ├─ Requests:\n\
             │  ├─ Admitted: {}\n\
             │  ├─ Rejected: {}\n\
             │  └─ Rejection Rate: {:.2}%\n\
             ├─ Windows:\n\
             │  ├─ Opened: {}\n\
             │  ├─ Swept: {}\n\
             │  └─ Tracked Keys: {}\n\
             └─ Health: {:?}",
            self.total_admitted,
            self.total_rejected,
            self.rejection_rate() * 100.0,
            self.windows_opened,
            self.windows_swept,
            self.tracked_keys,
            self.health_status(),
        )
    }
}

impl fmt::Display for LimiterMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Three-level health indicator for a limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Rejections are rare.
    Healthy,

    /// More than 30% of requests are rejected.
    Degraded,

    /// More than half of requests are rejected.
    Critical,
}

impl HealthStatus {
    /// True for anything other than [`HealthStatus::Healthy`].
    pub fn is_unhealthy(&self) -> bool {
        !matches!(self, Self::Healthy)
    }

    /// Operator guidance for this status.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            Self::Healthy => "No action needed",
            Self::Degraded => "Monitor closely, review per-endpoint policies",
            Self::Critical => "Immediate action required: investigate abusive callers",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "Healthy"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(admitted: u64, rejected: u64) -> LimiterMetrics {
        LimiterMetrics {
            total_admitted: admitted,
            total_rejected: rejected,
            windows_opened: 3,
            windows_swept: 1,
            tracked_keys: 2,
        }
    }

    #[test]
    fn test_metrics_calculations() {
        let m = metrics(80, 20);
        assert_eq!(m.total_requests(), 100);
        assert_eq!(m.success_rate(), 0.8);
        assert!((m.rejection_rate() - 0.2).abs() < f64::EPSILON);
        assert_eq!(m.health_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_health_thresholds() {
        assert_eq!(metrics(60, 40).health_status(), HealthStatus::Degraded);
        assert_eq!(metrics(40, 60).health_status(), HealthStatus::Critical);
    }

    #[test]
    fn test_empty_metrics() {
        let m = metrics(0, 0);
        assert_eq!(m.success_rate(), 1.0);
        assert_eq!(m.rejection_rate(), 0.0);
        assert_eq!(m.health_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_health_status_methods() {
        assert!(!HealthStatus::Healthy.is_unhealthy());
        assert!(HealthStatus::Degraded.is_unhealthy());
        assert!(HealthStatus::Critical.is_unhealthy());

        assert_eq!(HealthStatus::Healthy.suggested_action(), "No action needed");
        assert!(HealthStatus::Critical.suggested_action().contains("Immediate"));
        assert_eq!(HealthStatus::Degraded.to_string(), "Degraded");
    }

    #[test]
    fn test_metrics_display() {
        let display = format!("{}", metrics(10, 2));
        assert!(display.contains("Limiter Metrics"));
        assert!(display.contains("Admitted: 10"));
        assert!(display.contains("Tracked Keys: 2"));
    }
}
