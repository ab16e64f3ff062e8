//! Narrow read/write interfaces the core consumes.
//!
//! The engine never touches a database directly. Anything that can answer
//! these lookups can back it; [`crate::storage::SqliteStore`] is the bundled
//! implementation.

use chrono::{DateTime, Utc};

use crate::availability::CalendarEvent;
use crate::error::Result;
use crate::filter::FilterAudit;
use crate::geo::Coordinates;
use crate::location::Location;
use crate::task::{Task, TaskDependency};

/// Task lookup by id.
pub trait TaskSource: Send + Sync {
    fn task(&self, id: &str) -> Result<Option<Task>>;
}

/// Dependency edges in both directions.
pub trait DependencySource: Send + Sync {
    /// Edges where `task_id` is the dependent.
    fn dependencies_of(&self, task_id: &str) -> Result<Vec<TaskDependency>>;

    /// Edges where `task_id` is the prerequisite.
    fn dependents_of(&self, task_id: &str) -> Result<Vec<TaskDependency>>;
}

/// Calendar free/busy data.
pub trait CalendarSource: Send + Sync {
    /// Events overlapping `[start, end]`, ordered by start time.
    fn events_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>>;

    /// First event starting strictly after `at`.
    fn next_event_after(&self, user_id: &str, at: DateTime<Utc>) -> Result<Option<CalendarEvent>>;
}

/// Named locations.
pub trait LocationSource: Send + Sync {
    fn location(&self, id: &str) -> Result<Option<Location>>;

    fn locations_for_user(&self, user_id: &str) -> Result<Vec<Location>>;

    /// Locations whose center lies within `meters` of `point`, nearest first.
    fn locations_within(&self, point: Coordinates, meters: f64) -> Result<Vec<Location>>;
}

/// Append-only store for filter decisions.
pub trait AuditStore: Send + Sync {
    fn record(&self, audit: &FilterAudit) -> Result<()>;

    /// Decisions about `task_id` made for `user_id`, most recent first, at most
    /// `limit` records.
    fn audits_for_task(
        &self,
        task_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<FilterAudit>>;

    /// Most recent first, at most `limit` records created at or after `since`.
    fn audits_for_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FilterAudit>>;
}
