//! # Utility Functions
//!
//! Clock and caller-identity helpers shared by the limiter and the gate.

use std::net::IpAddr;
use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Sentinel key for callers whose identity could not be determined.
///
/// All such callers share one window, so they throttle each other.
pub const UNKNOWN_CALLER: &str = "unknown";

// Monotonic time base to prevent issues when the system clock jumps.
// We capture the wall-clock epoch milliseconds at process start,
// then advance using a monotonic Instant to compute 'now'.
static START_TIME_BASE: OnceLock<(Instant, u64)> = OnceLock::new();

/// Returns the current time in milliseconds since UNIX epoch.
///
/// The value advances monotonically for the life of the process even if the
/// system clock is adjusted, so window boundaries never move backwards.
///
/// # Example
///
/// ```rust
/// use gatehouse::current_time_ms;
///
/// let a = current_time_ms();
/// let b = current_time_ms();
/// assert!(b >= a);
/// ```
#[inline(always)]
pub fn current_time_ms() -> u64 {
    let (start, base_ms) = START_TIME_BASE.get_or_init(|| {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        (Instant::now(), epoch_ms)
    });
    base_ms.saturating_add(start.elapsed().as_millis() as u64)
}

/// Derives a caller key from a forwarded-for header and the peer address.
///
/// Takes the first non-empty entry of a comma-separated `X-Forwarded-For`
/// value, falls back to the peer address, and finally to [`UNKNOWN_CALLER`].
///
/// The header is client-controlled. A caller can put any value there and
/// rotate it between requests, so the resulting key does not reliably identify
/// one client unless a trusted proxy rewrites the header.
///
/// # Example
///
/// ```rust
/// use gatehouse::caller_key;
/// use std::net::IpAddr;
///
/// let peer: IpAddr = "10.0.0.7".parse().unwrap();
///
/// assert_eq!(caller_key(Some("203.0.113.9, 10.0.0.1"), Some(peer)), "203.0.113.9");
/// assert_eq!(caller_key(None, Some(peer)), "10.0.0.7");
/// assert_eq!(caller_key(Some("  "), None), "unknown");
/// ```
pub fn caller_key(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> String {
    let forwarded = forwarded_for.and_then(|header| {
        header
            .split(',')
            .map(str::trim)
            .find(|entry| !entry.is_empty())
    });

    match (forwarded, peer) {
        (Some(entry), _) => entry.to_string(),
        (None, Some(ip)) => ip.to_string(),
        (None, None) => UNKNOWN_CALLER.to_string(),
    }
}

/// Collapses an empty or blank key to [`UNKNOWN_CALLER`].
#[inline]
pub(crate) fn normalize_key(key: &str) -> &str {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        UNKNOWN_CALLER
    } else {
        trimmed
    }
}
