//! Context-aware visibility filtering.
//!
//! A task is shown only when every registered [`FilterRule`] says it is
//! actionable under the current [`Context`](crate::context::Context). Each rule
//! returns a human-readable reason alongside its verdict so the decision can be
//! audited and explained later.

pub mod audit;
pub mod engine;
pub mod rules;
pub mod stats;

pub use audit::{AuditRuleEntry, FilterAudit};
pub use engine::{FilterEngine, FilterOutcome, RuleEvaluation, RuleInfo, VisibilityExplanation};
pub use stats::{FilterStats, RuleStats};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::context::Context;
use crate::error::FilterError;
use crate::task::Task;

/// Reason reported for a rule whose family is switched off.
pub const DISABLED_REASON: &str = "disabled";

/// A named, prioritized visibility predicate.
///
/// Higher `priority` runs first. Ordering only affects the order of reasons in
/// results and audits; the overall verdict is the AND of all rules.
pub trait FilterRule: Send + Sync {
    /// Unique rule name.
    fn name(&self) -> &str;

    fn priority(&self) -> i32;

    /// Configuration family that can switch this rule off, if any.
    fn family(&self) -> Option<FilterFamily> {
        None
    }

    fn apply(&self, context: &Context, task: &Task) -> RuleDecision;
}

/// Verdict of one rule for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDecision {
    pub visible: bool,
    pub reason: String,
}

impl RuleDecision {
    pub fn visible(reason: impl Into<String>) -> Self {
        Self {
            visible: true,
            reason: reason.into(),
        }
    }

    pub fn hidden(reason: impl Into<String>) -> Self {
        Self {
            visible: false,
            reason: reason.into(),
        }
    }

    pub fn disabled() -> Self {
        Self::visible(DISABLED_REASON)
    }
}

/// Flat per-(task, rule) result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterResult {
    pub task_id: String,
    pub rule_name: String,
    pub visible: bool,
    pub reason: String,
}

/// The fixed rule families that configuration can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterFamily {
    Dependency,
    Time,
    Location,
    Focus,
    Energy,
}

impl FilterFamily {
    pub const ALL: [FilterFamily; 5] = [
        FilterFamily::Dependency,
        FilterFamily::Time,
        FilterFamily::Location,
        FilterFamily::Focus,
        FilterFamily::Energy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterFamily::Dependency => "dependency",
            FilterFamily::Time => "time",
            FilterFamily::Location => "location",
            FilterFamily::Focus => "focus",
            FilterFamily::Energy => "energy",
        }
    }
}

impl fmt::Display for FilterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterFamily {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dependency" | "dependencies" => Ok(FilterFamily::Dependency),
            "time" => Ok(FilterFamily::Time),
            "location" => Ok(FilterFamily::Location),
            "focus" | "social" => Ok(FilterFamily::Focus),
            "energy" | "priority" => Ok(FilterFamily::Energy),
            _ => Err(FilterError::UnknownFilter(s.to_string())),
        }
    }
}

/// One on/off switch per rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFlags {
    #[serde(default = "default_true")]
    pub dependency: bool,
    #[serde(default = "default_true")]
    pub time: bool,
    #[serde(default = "default_true")]
    pub location: bool,
    #[serde(default = "default_true")]
    pub focus: bool,
    /// Off unless the user opts in to hiding demanding tasks when tired
    #[serde(default)]
    pub energy: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FilterFlags {
    fn default() -> Self {
        Self {
            dependency: true,
            time: true,
            location: true,
            focus: true,
            energy: false,
        }
    }
}

impl FilterFlags {
    /// All families switched off.
    pub fn none() -> Self {
        Self {
            dependency: false,
            time: false,
            location: false,
            focus: false,
            energy: false,
        }
    }

    /// All families switched on.
    pub fn all() -> Self {
        Self {
            energy: true,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self, family: FilterFamily) -> bool {
        match family {
            FilterFamily::Dependency => self.dependency,
            FilterFamily::Time => self.time,
            FilterFamily::Location => self.location,
            FilterFamily::Focus => self.focus,
            FilterFamily::Energy => self.energy,
        }
    }

    pub fn set(&mut self, family: FilterFamily, enabled: bool) {
        let flag = match family {
            FilterFamily::Dependency => &mut self.dependency,
            FilterFamily::Time => &mut self.time,
            FilterFamily::Location => &mut self.location,
            FilterFamily::Focus => &mut self.focus,
            FilterFamily::Energy => &mut self.energy,
        };
        *flag = enabled;
    }

    /// Only `family` switched on.
    pub fn only(family: FilterFamily) -> Self {
        let mut flags = Self::none();
        flags.set(family, true);
        flags
    }
}
