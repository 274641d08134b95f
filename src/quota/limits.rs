//! Plan Limits Table
//!
//! Static per-tier ceilings, loaded once at startup and never mutated.
//!
//! The JSON form mirrors how product configures plans: each slot is a number
//! (finite ceiling), the string `"unlimited"`, or a boolean capability flag.
//!
//! ```json
//! {
//!   "FREE": { "projects": 5, "ai_generations": 10, "high_res_export": false },
//!   "PRO":  { "projects": "unlimited", "ai_generations": 500, "high_res_export": true }
//! }
//! ```
//!
//! Anything missing from the file (a whole tier or a single action) resolves
//! to [`Limit::Denied`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{Error, Result};

/// Environment variable holding the path of a JSON plan limits file.
pub const PLAN_LIMITS_ENV: &str = "GATEHOUSE_PLAN_LIMITS";

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Subscription tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    /// Free plan
    Free,
    /// Paid individual plan
    Pro,
    /// Organization plan
    Enterprise,
}

impl PlanTier {
    /// Every tier, cheapest first.
    pub const ALL: [PlanTier; 3] = [PlanTier::Free, PlanTier::Pro, PlanTier::Enterprise];

    /// Canonical upper-case name, as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "FREE",
            PlanTier::Pro => "PRO",
            PlanTier::Enterprise => "ENTERPRISE",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = Error;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        PlanTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownTier(s.to_string()))
    }
}

/// Actions constrained by plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Number of billboard projects owned
    Projects,
    /// AI copy/image generations this billing period
    AiGenerations,
    /// Bytes of uploaded assets stored
    StorageBytes,
    /// Export renders at print resolution
    HighResExport,
    /// Remove the watermark and apply custom branding
    CustomBranding,
    /// Use the public API
    ApiAccess,
}

impl ActionKind {
    /// Every action kind.
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Projects,
        ActionKind::AiGenerations,
        ActionKind::StorageBytes,
        ActionKind::HighResExport,
        ActionKind::CustomBranding,
        ActionKind::ApiAccess,
    ];

    /// Configuration key for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Projects => "projects",
            ActionKind::AiGenerations => "ai_generations",
            ActionKind::StorageBytes => "storage_bytes",
            ActionKind::HighResExport => "high_res_export",
            ActionKind::CustomBranding => "custom_branding",
            ActionKind::ApiAccess => "api_access",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        ActionKind::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}

/// A single slot of the plan table.
///
/// `Default` is [`Limit::Denied`]: a slot nobody configured grants nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawLimit", into = "RawLimit")]
pub enum Limit {
    /// At most this many units.
    Finite(u64),
    /// No ceiling.
    Unlimited,
    /// Capability granted.
    Allowed,
    /// Capability withheld.
    #[default]
    Denied,
}

impl Limit {
    /// Whether one more unit is allowed on top of `usage`.
    ///
    /// Finite ceilings are strict: reaching the ceiling denies the next unit.
    #[inline]
    pub fn permits(&self, usage: u64) -> bool {
        match *self {
            Limit::Finite(ceiling) => usage < ceiling,
            Limit::Unlimited | Limit::Allowed => true,
            Limit::Denied => false,
        }
    }

    /// Units left after `usage`.
    #[inline]
    pub fn remaining(&self, usage: u64) -> Remaining {
        match *self {
            Limit::Finite(ceiling) => Remaining::Limited(ceiling.saturating_sub(usage)),
            Limit::Unlimited | Limit::Allowed => Remaining::Unlimited,
            Limit::Denied => Remaining::Limited(0),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(n) => write!(f, "{}", n),
            Limit::Unlimited => f.write_str("unlimited"),
            Limit::Allowed => f.write_str("allowed"),
            Limit::Denied => f.write_str("denied"),
        }
    }
}

/// Units left under a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Remaining {
    /// This many more units are allowed.
    Limited(u64),
    /// No ceiling applies.
    Unlimited,
}

impl Remaining {
    /// True when no ceiling applies.
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Remaining::Unlimited)
    }

    /// The finite count, if any.
    pub fn as_limited(&self) -> Option<u64> {
        match *self {
            Remaining::Limited(n) => Some(n),
            Remaining::Unlimited => None,
        }
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::Limited(n) => write!(f, "{}", n),
            Remaining::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Wire shape of a limit slot.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawLimit {
    Count(u64),
    Flag(bool),
    Word(String),
}

impl TryFrom<RawLimit> for Limit {
    type Error = Error;

    fn try_from(raw: RawLimit) -> Result<Self> {
        match raw {
            RawLimit::Count(n) => Ok(Limit::Finite(n)),
            RawLimit::Flag(true) => Ok(Limit::Allowed),
            RawLimit::Flag(false) => Ok(Limit::Denied),
            RawLimit::Word(word) if word.trim().eq_ignore_ascii_case("unlimited") => {
                Ok(Limit::Unlimited)
            }
            RawLimit::Word(word) => Err(Error::InvalidLimit(word)),
        }
    }
}

impl From<Limit> for RawLimit {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Finite(n) => RawLimit::Count(n),
            Limit::Unlimited => RawLimit::Word("unlimited".to_string()),
            Limit::Allowed => RawLimit::Flag(true),
            Limit::Denied => RawLimit::Flag(false),
        }
    }
}

/// Limits for one tier, one slot per [`ActionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanLimits {
    /// Projects owned
    pub projects: Limit,
    /// AI generations per billing period
    pub ai_generations: Limit,
    /// Stored bytes
    pub storage_bytes: Limit,
    /// Print-resolution export
    pub high_res_export: Limit,
    /// Custom branding
    pub custom_branding: Limit,
    /// Public API
    pub api_access: Limit,
}

impl PlanLimits {
    /// Limit for `action`.
    pub fn limit(&self, action: ActionKind) -> Limit {
        match action {
            ActionKind::Projects => self.projects,
            ActionKind::AiGenerations => self.ai_generations,
            ActionKind::StorageBytes => self.storage_bytes,
            ActionKind::HighResExport => self.high_res_export,
            ActionKind::CustomBranding => self.custom_branding,
            ActionKind::ApiAccess => self.api_access,
        }
    }

    /// Built-in free plan.
    pub const fn free() -> Self {
        Self {
            projects: Limit::Finite(5),
            ai_generations: Limit::Finite(10),
            storage_bytes: Limit::Finite(100 * MIB),
            high_res_export: Limit::Denied,
            custom_branding: Limit::Denied,
            api_access: Limit::Denied,
        }
    }

    /// Built-in pro plan.
    pub const fn pro() -> Self {
        Self {
            projects: Limit::Unlimited,
            ai_generations: Limit::Finite(500),
            storage_bytes: Limit::Finite(10 * GIB),
            high_res_export: Limit::Allowed,
            custom_branding: Limit::Allowed,
            api_access: Limit::Denied,
        }
    }

    /// Built-in enterprise plan.
    pub const fn enterprise() -> Self {
        Self {
            projects: Limit::Unlimited,
            ai_generations: Limit::Unlimited,
            storage_bytes: Limit::Unlimited,
            high_res_export: Limit::Allowed,
            custom_branding: Limit::Allowed,
            api_access: Limit::Allowed,
        }
    }
}

/// The full tier → action → limit table.
///
/// [`LimitsTable::default`] is the built-in table. A table deserialized from
/// JSON starts from nothing instead: tiers absent from the file grant nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsTable {
    /// Free tier
    #[serde(rename = "FREE", default)]
    pub free: PlanLimits,
    /// Pro tier
    #[serde(rename = "PRO", default)]
    pub pro: PlanLimits,
    /// Enterprise tier
    #[serde(rename = "ENTERPRISE", default)]
    pub enterprise: PlanLimits,
}

impl Default for LimitsTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LimitsTable {
    /// The table shipped with the crate.
    pub const fn builtin() -> Self {
        Self {
            free: PlanLimits::free(),
            pro: PlanLimits::pro(),
            enterprise: PlanLimits::enterprise(),
        }
    }

    /// Limits for `tier`.
    pub fn plan(&self, tier: PlanTier) -> &PlanLimits {
        match tier {
            PlanTier::Free => &self.free,
            PlanTier::Pro => &self.pro,
            PlanTier::Enterprise => &self.enterprise,
        }
    }

    /// Limit for `(tier, action)`.
    #[inline]
    pub fn limit(&self, tier: PlanTier, action: ActionKind) -> Limit {
        self.plan(tier).limit(action)
    }

    /// Parse a table from JSON.
    ///
    /// # Errors
    ///
    /// Malformed JSON, unknown tiers or actions, and slot values that are not a
    /// number, boolean or `"unlimited"` are all rejected.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON table from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let table = Self::from_json_str(&contents)?;
        info!(path = %path.display(), "Loaded plan limits");
        Ok(table)
    }

    /// Load the table named by `GATEHOUSE_PLAN_LIMITS`, or the built-in table
    /// when the variable is unset.
    ///
    /// A set variable pointing at a bad file is an error, not a silent fallback.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(PLAN_LIMITS_ENV) {
            Some(path) => Self::from_path(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_tier_parsing() {
        assert_eq!("FREE".parse::<PlanTier>().unwrap(), PlanTier::Free);
        assert_eq!("pro".parse::<PlanTier>().unwrap(), PlanTier::Pro);
        assert_eq!(" Enterprise ".parse::<PlanTier>().unwrap(), PlanTier::Enterprise);

        let err = "GOLD".parse::<PlanTier>().unwrap_err();
        assert!(matches!(err, Error::UnknownTier(name) if name == "GOLD"));
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("projects".parse::<ActionKind>().unwrap(), ActionKind::Projects);
        assert_eq!(
            "AI_GENERATIONS".parse::<ActionKind>().unwrap(),
            ActionKind::AiGenerations
        );
        assert!(matches!(
            "teleport".parse::<ActionKind>(),
            Err(Error::UnknownAction(_))
        ));

        for action in ActionKind::ALL {
            assert_eq!(action.to_string().parse::<ActionKind>().unwrap(), action);
        }
    }

    #[test]
    fn test_limit_semantics() {
        assert!(Limit::Finite(5).permits(4));
        assert!(!Limit::Finite(5).permits(5));
        assert!(!Limit::Finite(0).permits(0));
        assert!(Limit::Unlimited.permits(u64::MAX));
        assert!(Limit::Allowed.permits(u64::MAX));
        assert!(!Limit::Denied.permits(0));

        assert_eq!(Limit::Finite(5).remaining(2), Remaining::Limited(3));
        assert_eq!(Limit::Finite(5).remaining(9), Remaining::Limited(0));
        assert_eq!(Limit::Unlimited.remaining(9), Remaining::Unlimited);
        assert_eq!(Limit::Allowed.remaining(0), Remaining::Unlimited);
        assert_eq!(Limit::Denied.remaining(0), Remaining::Limited(0));
        assert_eq!(Limit::default(), Limit::Denied);
    }

    #[test]
    fn test_builtin_table() {
        let table = LimitsTable::default();
        assert_eq!(table.limit(PlanTier::Free, ActionKind::Projects), Limit::Finite(5));
        assert_eq!(table.limit(PlanTier::Pro, ActionKind::Projects), Limit::Unlimited);
        assert_eq!(
            table.limit(PlanTier::Free, ActionKind::HighResExport),
            Limit::Denied
        );
        assert_eq!(
            table.limit(PlanTier::Enterprise, ActionKind::ApiAccess),
            Limit::Allowed
        );
    }

    #[test]
    fn test_parse_mixed_slots() {
        let table = LimitsTable::from_json_str(
            r#"{
                "FREE": { "projects": 3, "high_res_export": false },
                "PRO": { "projects": "unlimited", "custom_branding": true }
            }"#,
        )
        .unwrap();

        assert_eq!(table.free.projects, Limit::Finite(3));
        assert_eq!(table.free.high_res_export, Limit::Denied);
        assert_eq!(table.pro.projects, Limit::Unlimited);
        assert_eq!(table.pro.custom_branding, Limit::Allowed);

        // Unset slots and the missing tier fail closed
        assert_eq!(table.free.ai_generations, Limit::Denied);
        assert_eq!(table.enterprise, PlanLimits::default());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(LimitsTable::from_json_str(r#"{ "FREE": { "projects": "lots" } }"#).is_err());
        assert!(LimitsTable::from_json_str(r#"{ "FREE": { "projects": -1 } }"#).is_err());
        assert!(LimitsTable::from_json_str(r#"{ "FREE": { "teleport": 1 } }"#).is_err());
        assert!(LimitsTable::from_json_str(r#"{ "GOLD": {} }"#).is_err());
        assert!(LimitsTable::from_json_str("not json").is_err());
    }

    #[test]
    fn test_json_roundtrip_of_builtin() {
        let json = LimitsTable::builtin().to_json_pretty().unwrap();
        assert!(json.contains("\"unlimited\""));
        assert_eq!(LimitsTable::from_json_str(&json).unwrap(), LimitsTable::builtin());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "ENTERPRISE": {{ "projects": 1000 }} }}"#).unwrap();

        let table = LimitsTable::from_path(file.path()).unwrap();
        assert_eq!(table.enterprise.projects, Limit::Finite(1000));

        let missing = LimitsTable::from_path("/nonexistent/gatehouse/limits.json");
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
