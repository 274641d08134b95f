//! Quota authorization against a [`LimitsTable`].

use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::limits::{ActionKind, Limit, LimitsTable, PlanTier, Remaining};

/// Outcome of a quota check, carrying enough context for a
/// "plan limit reached" response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    /// Tier checked
    pub tier: PlanTier,
    /// Action checked
    pub action: ActionKind,
    /// Configured limit for the pair
    pub limit: Limit,
    /// Usage supplied by the caller
    pub usage: u64,
    /// Whether one more unit is allowed
    pub permitted: bool,
    /// Units left
    pub remaining: Remaining,
}

impl fmt::Display for QuotaDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.permitted {
            write!(
                f,
                "{} {} permitted ({} of {} used, {} remaining)",
                self.tier, self.action, self.usage, self.limit, self.remaining
            )
        } else {
            write!(
                f,
                "{} plan limit reached for {} ({} of {} used)",
                self.tier, self.action, self.usage, self.limit
            )
        }
    }
}

/// Decides whether a tier may perform an action given current usage.
///
/// Stateless apart from the shared, read-only table, so clones are cheap and
/// calls never block each other. Usage counts belong to the caller.
///
/// ## Example
///
/// ```rust
/// use gatehouse::{ActionKind, PlanTier, QuotaAuthorizer, Remaining};
///
/// let quota = QuotaAuthorizer::default();
///
/// assert!(quota.can_perform(PlanTier::Free, ActionKind::Projects, 4));
/// assert!(!quota.can_perform(PlanTier::Free, ActionKind::Projects, 5));
/// assert_eq!(
///     quota.remaining_quota(PlanTier::Pro, ActionKind::Projects, 1_000),
///     Remaining::Unlimited
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuotaAuthorizer {
    table: Arc<LimitsTable>,
}

impl QuotaAuthorizer {
    /// Authorizer over `table`.
    pub fn new(table: LimitsTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// The table decisions are made against.
    pub fn table(&self) -> &LimitsTable {
        &self.table
    }

    /// Whether `tier` may perform one more `action` at `current_usage`.
    #[inline]
    pub fn can_perform(&self, tier: PlanTier, action: ActionKind, current_usage: u64) -> bool {
        self.table.limit(tier, action).permits(current_usage)
    }

    /// Units of `action` left for `tier` at `current_usage`.
    ///
    /// Never negative: usage above the ceiling reports `Limited(0)`.
    #[inline]
    pub fn remaining_quota(
        &self,
        tier: PlanTier,
        action: ActionKind,
        current_usage: u64,
    ) -> Remaining {
        self.table.limit(tier, action).remaining(current_usage)
    }

    /// Full decision for `(tier, action, usage)`.
    pub fn check(&self, tier: PlanTier, action: ActionKind, usage: u64) -> QuotaDecision {
        let limit = self.table.limit(tier, action);
        QuotaDecision {
            tier,
            action,
            limit,
            usage,
            permitted: limit.permits(usage),
            remaining: limit.remaining(usage),
        }
    }

    /// String-keyed [`can_perform`](Self::can_perform).
    ///
    /// Unknown tier or action names deny.
    pub fn can_perform_named(&self, tier: &str, action: &str, current_usage: u64) -> bool {
        match resolve(tier, action) {
            Some((tier, action)) => self.can_perform(tier, action, current_usage),
            None => false,
        }
    }

    /// String-keyed [`remaining_quota`](Self::remaining_quota).
    ///
    /// Unknown tier or action names report `Limited(0)`.
    pub fn remaining_quota_named(&self, tier: &str, action: &str, current_usage: u64) -> Remaining {
        match resolve(tier, action) {
            Some((tier, action)) => self.remaining_quota(tier, action, current_usage),
            None => Remaining::Limited(0),
        }
    }
}

fn resolve(tier: &str, action: &str) -> Option<(PlanTier, ActionKind)> {
    match (tier.parse::<PlanTier>(), action.parse::<ActionKind>()) {
        (Ok(tier), Ok(action)) => Some((tier, action)),
        (Err(err), _) | (_, Err(err)) => {
            warn!(tier, action, error = %err, "Quota check for unknown plan entry, denying");
            None
        }
    }
}
