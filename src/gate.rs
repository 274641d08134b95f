//! # Access Gate
//!
//! The check every guarded write runs before touching storage:
//!
//! ```text
//!     request ──► rate limiter ──throttled──► 429, stop
//!                      │
//!                   admitted
//!                      ▼
//!                quota check ──limit reached──► 403, stop
//!                      │
//!                   permitted
//!                      ▼
//!                  proceed (caller bumps its usage after success)
//! ```
//!
//! Quota is never consulted for a throttled request, so a throttled caller
//! learns nothing about its plan.

use std::sync::Arc;
use tracing::debug;

use crate::quota::{ActionKind, PlanTier, QuotaAuthorizer, QuotaDecision, Remaining};
use crate::rate_limiter::{current_time_ms, FixedWindowLimiter, LimitResult, RateLimitPolicy};

/// Outcome of [`AccessGate::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Both checks passed.
    Proceed {
        /// Rate limit state after this request
        rate: LimitResult,
        /// Quota left before this action is counted
        remaining: Remaining,
    },
    /// Rejected by the rate limiter.
    Throttled(LimitResult),
    /// Rejected by the plan quota.
    QuotaReached(QuotaDecision),
}

impl Decision {
    /// True for [`Decision::Proceed`].
    pub fn is_proceed(&self) -> bool {
        matches!(self, Decision::Proceed { .. })
    }

    /// HTTP status a handler would answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Decision::Proceed { .. } => 200,
            Decision::Throttled(_) => 429,
            Decision::QuotaReached(_) => 403,
        }
    }

    /// Rate limit state, if the limiter was consulted and admitted or rejected.
    pub fn rate(&self) -> Option<&LimitResult> {
        match self {
            Decision::Proceed { rate, .. } | Decision::Throttled(rate) => Some(rate),
            Decision::QuotaReached(_) => None,
        }
    }
}

/// Rate limiter and quota authorizer composed in the order handlers need.
///
/// ## Example
///
/// ```rust
/// use gatehouse::{AccessGate, ActionKind, Decision, PlanTier, RateLimitPolicy};
///
/// let gate = AccessGate::default();
/// let policy = RateLimitPolicy::per_minute(10).unwrap();
///
/// // Sixth project on the free plan
/// let decision = gate.admit("1.2.3.4", &policy, PlanTier::Free, ActionKind::Projects, 5, 0);
/// assert!(matches!(decision, Decision::QuotaReached(_)));
/// assert_eq!(decision.status_code(), 403);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    limiter: Arc<FixedWindowLimiter>,
    quota: QuotaAuthorizer,
}

impl AccessGate {
    /// Gate over a shared limiter and an authorizer.
    pub fn new(limiter: Arc<FixedWindowLimiter>, quota: QuotaAuthorizer) -> Self {
        Self { limiter, quota }
    }

    /// The shared limiter, e.g. to start its sweeper.
    pub fn limiter(&self) -> &Arc<FixedWindowLimiter> {
        &self.limiter
    }

    /// The quota authorizer.
    pub fn quota(&self) -> &QuotaAuthorizer {
        &self.quota
    }

    /// Rate limit, then quota, for one guarded action.
    ///
    /// The request counts against the rate window even when quota then
    /// denies it.
    pub fn admit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
        tier: PlanTier,
        action: ActionKind,
        usage: u64,
        now: u64,
    ) -> Decision {
        let rate = self.limiter.check(key, policy, now);
        if !rate.admitted {
            return Decision::Throttled(rate);
        }

        let quota = self.quota.check(tier, action, usage);
        if !quota.permitted {
            debug!(key, %tier, %action, usage, limit = %quota.limit, "Plan limit reached");
            return Decision::QuotaReached(quota);
        }

        Decision::Proceed {
            rate,
            remaining: quota.remaining,
        }
    }

    /// [`admit`](Self::admit) at the current time.
    pub fn admit_now(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
        tier: PlanTier,
        action: ActionKind,
        usage: u64,
    ) -> Decision {
        self.admit(key, policy, tier, action, usage, current_time_ms())
    }

    /// Rate limit only, for endpoints without a plan quota (sign in, sign up).
    #[inline]
    pub fn throttle(&self, key: &str, policy: &RateLimitPolicy, now: u64) -> LimitResult {
        self.limiter.check(key, policy, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::Limit;

    fn policy(max: u32) -> RateLimitPolicy {
        RateLimitPolicy::new(60_000, max).unwrap()
    }

    #[test]
    fn test_proceed() {
        let gate = AccessGate::default();
        let decision = gate.admit("a", &policy(5), PlanTier::Free, ActionKind::Projects, 2, 0);

        match decision {
            Decision::Proceed { rate, remaining } => {
                assert_eq!(rate.remaining, 4);
                assert_eq!(remaining, Remaining::Limited(3));
            }
            other => panic!("expected proceed, got {:?}", other),
        }
        assert!(decision.is_proceed());
        assert_eq!(decision.status_code(), 200);
    }

    #[test]
    fn test_throttled_skips_quota() {
        let gate = AccessGate::default();
        let p = policy(1);

        assert!(gate.throttle("a", &p, 0).admitted);

        // Quota would deny too, but throttling wins
        let decision = gate.admit("a", &p, PlanTier::Free, ActionKind::ApiAccess, 0, 10);
        assert!(matches!(decision, Decision::Throttled(r) if r.reset_at == 60_000));
        assert_eq!(decision.status_code(), 429);
    }

    #[test]
    fn test_quota_reached_still_counts_request() {
        let gate = AccessGate::default();
        let p = policy(2);

        let decision = gate.admit("a", &p, PlanTier::Free, ActionKind::HighResExport, 0, 0);
        match decision {
            Decision::QuotaReached(q) => {
                assert_eq!(q.limit, Limit::Denied);
                assert_eq!(q.remaining, Remaining::Limited(0));
            }
            other => panic!("expected quota reached, got {:?}", other),
        }
        assert!(decision.rate().is_none());

        let rate = gate.throttle("a", &p, 1);
        assert!(rate.admitted);
        assert_eq!(rate.remaining, 0);
    }

    #[test]
    fn test_shared_limiter() {
        let limiter = Arc::new(FixedWindowLimiter::new());
        let gate = AccessGate::new(limiter.clone(), QuotaAuthorizer::default());

        gate.throttle("a", &policy(5), 0);
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(Arc::ptr_eq(gate.limiter(), &limiter));
    }
}
