//! # Background Sweeper
//!
//! Periodically removes expired windows so the registry only holds keys that
//! were active recently. Sweeping is housekeeping: `check` already treats an
//! expired window as absent, so a late or skipped sweep never changes an
//! admission decision.
//!
//! Sweeps run against [`FixedWindowLimiter::sweep_horizon`], the latest time
//! any check has seen, never against a clock callers may not be using.
//!
//! ```text
//!     spawn_sweeper() ──► "gatehouse-sweeper" thread
//!                              │
//!                              ├─ wait sweep_interval_ms (or stop signal)
//!                              ├─ limiter.sweep(sweep_horizon)
//!                              └─ repeat
//!
//!     SweeperHandle::shutdown() / drop ──► stop signal ──► join
//! ```

use super::core::FixedWindowLimiter;
use crate::error::{Error, Result};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tracked key count above which each sweep logs a warning.
pub const HIGH_KEY_COUNT: usize = 100_000;

impl FixedWindowLimiter {
    /// Starts a background thread that sweeps expired windows.
    ///
    /// The thread runs until the returned handle is shut down or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the sweep interval is zero, or
    /// [`Error::Sweeper`] if the OS refuses to spawn the thread.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gatehouse::{FixedWindowLimiter, LimiterConfig};
    /// use std::sync::Arc;
    ///
    /// let config = LimiterConfig::default().with_sweep_interval_ms(30_000);
    /// let limiter = Arc::new(FixedWindowLimiter::with_config(config));
    /// let sweeper = limiter.clone().spawn_sweeper().unwrap();
    ///
    /// // ... serve requests ...
    ///
    /// sweeper.shutdown();
    /// ```
    pub fn spawn_sweeper(self: Arc<Self>) -> Result<SweeperHandle> {
        self.config.validate()?;

        let (stop_tx, stop_rx) = mpsc::channel();
        let interval = Duration::from_millis(self.config.sweep_interval_ms);
        let limiter = self;

        let handle = thread::Builder::new()
            .name("gatehouse-sweeper".to_string())
            .spawn(move || {
                info!(
                    interval_ms = interval.as_millis() as u64,
                    "Started rate window sweeper"
                );

                loop {
                    match stop_rx.recv_timeout(interval) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                            info!("Rate window sweeper stopping");
                            break;
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            let removed = limiter.sweep(limiter.sweep_horizon());
                            let active = limiter.tracked_keys();
                            debug!(removed, active, "Sweep complete");

                            if active > HIGH_KEY_COUNT {
                                warn!(active, "High number of active rate limit keys");
                            }
                        }
                    }
                }
            })
            .map_err(Error::Sweeper)?;

        Ok(SweeperHandle {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

/// Owner of a running sweeper thread.
///
/// Dropping the handle stops the thread and waits for it, so tie it to the
/// lifetime of whatever serves requests.
#[derive(Debug)]
pub struct SweeperHandle {
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for the thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// True while the sweeper thread has not exited.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The thread may already be gone; a closed channel also stops it.
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Rate window sweeper panicked");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LimiterConfig, RateLimitPolicy};

    fn limiter_with_interval(interval_ms: u64) -> Arc<FixedWindowLimiter> {
        Arc::new(FixedWindowLimiter::with_config(
            LimiterConfig::default().with_sweep_interval_ms(interval_ms),
        ))
    }

    #[test]
    fn test_sweeper_removes_expired_windows() {
        let limiter = limiter_with_interval(20);
        let policy = RateLimitPolicy::new(10, 5).unwrap();

        for i in 0..10 {
            limiter.check_now(&format!("10.0.0.{}", i), &policy);
        }
        assert_eq!(limiter.tracked_keys(), 10);

        let sweeper = limiter.clone().spawn_sweeper().unwrap();
        assert!(sweeper.is_running());

        // Later traffic moves the horizon past the first windows
        thread::sleep(Duration::from_millis(50));
        let hourly = RateLimitPolicy::per_hour(5).unwrap();
        limiter.check_now("10.0.1.1", &hourly);

        thread::sleep(Duration::from_millis(150));
        assert_eq!(limiter.tracked_keys(), 1);
        assert_eq!(limiter.metrics().windows_swept, 10);

        sweeper.shutdown();
    }

    #[test]
    fn test_sweeper_keeps_live_windows() {
        let limiter = limiter_with_interval(20);
        let policy = RateLimitPolicy::per_hour(5).unwrap();

        limiter.check_now("long-lived", &policy);
        let sweeper = limiter.clone().spawn_sweeper().unwrap();

        thread::sleep(Duration::from_millis(100));
        assert_eq!(limiter.tracked_keys(), 1);

        drop(sweeper);
    }

    #[test]
    fn test_sweeper_uses_caller_timeline() {
        let limiter = limiter_with_interval(10);
        let policy = RateLimitPolicy::per_hour(1).unwrap();

        // Timestamps far behind the crate clock
        assert!(limiter.check("k", &policy, 1_000).admitted);
        let sweeper = limiter.clone().spawn_sweeper().unwrap();

        thread::sleep(Duration::from_millis(60));
        assert_eq!(limiter.tracked_keys(), 1);

        let second = limiter.check("k", &policy, 2_000);
        assert!(!second.admitted);
        assert_eq!(second.reset_at, 3_601_000);

        // Expiry on that same timeline is still swept
        let short = RateLimitPolicy::new(100, 1).unwrap();
        limiter.check("brief", &short, 2_000);
        limiter.check("k", &policy, 3_601_000);
        thread::sleep(Duration::from_millis(60));
        assert_eq!(limiter.tracked_keys(), 1);

        sweeper.shutdown();
    }

    #[test]
    fn test_shutdown_stops_thread() {
        let limiter = limiter_with_interval(60_000);
        let sweeper = limiter.clone().spawn_sweeper().unwrap();

        // Shutdown must not wait out the interval
        let start = std::time::Instant::now();
        sweeper.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));

        // The thread held the only other reference
        assert_eq!(Arc::strong_count(&limiter), 1);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let limiter = limiter_with_interval(0);
        let err = limiter.spawn_sweeper().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
