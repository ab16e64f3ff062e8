//! # nowdo Core Library
//!
//! Decides which of a user's tasks are actionable right now. Given a snapshot
//! of the user's situation (time, place, free minutes, social setting, energy)
//! the filter engine runs every task through an ordered set of rules and keeps
//! only those that every rule lets through, recording why.
//!
//! ## Architecture
//!
//! - **Context**: snapshots derived from raw signals by [`ContextResolver`],
//!   with free time from [`AvailabilityCalculator`]
//! - **Dependencies**: graph traversal, cycle detection and start readiness in
//!   [`DependencyResolver`]
//! - **Filtering**: [`FilterEngine`] and the built-in rules (dependency, time,
//!   location, focus, energy)
//! - **Storage**: [`SqliteStore`] backs every lookup trait in [`sources`];
//!   [`Config`] is TOML
//!
//! The CLI binary is a thin layer over the same library.

pub mod availability;
pub mod context;
pub mod dependency;
pub mod error;
pub mod filter;
pub mod geo;
pub mod location;
pub mod sources;
pub mod storage;
pub mod task;

pub use availability::{AvailabilityCalculator, CalendarEvent};
pub use context::{
    Context, ContextResolver, ContextUpdate, EnergyLevel, SocialContext, TrafficLevel,
    WeatherCondition,
};
pub use dependency::{DependencyCycle, DependencyResolver, StartReadiness};
pub use error::{
    ConfigError, CoreError, DependencyError, FilterError, Result, StoreError, ValidationError,
};
pub use filter::{
    FilterAudit, FilterEngine, FilterFamily, FilterFlags, FilterOutcome, FilterResult, FilterRule,
    FilterStats, RuleDecision, RuleEvaluation, RuleInfo, VisibilityExplanation,
};
pub use geo::Coordinates;
pub use location::Location;
pub use sources::{AuditStore, CalendarSource, DependencySource, LocationSource, TaskSource};
pub use storage::{Config, SqliteStore};
pub use task::{DependencyType, Task, TaskDependency, TaskStatus};
