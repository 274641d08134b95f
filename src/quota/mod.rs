//! # Quota Module
//!
//! Plan-based limits: what each subscription tier may do and how much of it.
//!
//! ```text
//!     quota/
//!     ├── mod.rs          (Module organization)
//!     ├── limits.rs       (Tiers, actions, limit slots, table loading)
//!     └── authorizer.rs   (Decisions against a loaded table)
//! ```
//!
//! The authorizer never stores usage. Callers pass their current count in and
//! increment it themselves after the action succeeds.

mod authorizer;
mod limits;

pub use authorizer::{QuotaAuthorizer, QuotaDecision};

pub use limits::{ActionKind, Limit, LimitsTable, PlanLimits, PlanTier, Remaining, PLAN_LIMITS_ENV};
