//! SQLite-backed implementation of every lookup the engine consumes.
//!
//! Provides persistent storage for:
//! - Tasks and their dependency edges
//! - Named locations and calendar events
//! - Append-only context history
//! - Filter audit records
//!
//! Timestamps are stored as fixed-width RFC 3339 text (nanosecond precision,
//! `Z` suffix) so that string comparison in SQL matches chronological order.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{data_dir, migrations};
use crate::availability::CalendarEvent;
use crate::context::{Context, EnergyLevel};
use crate::error::{DependencyError, Result, StoreError};
use crate::filter::FilterAudit;
use crate::geo::{self, Coordinates};
use crate::location::Location;
use crate::sources::{AuditStore, CalendarSource, DependencySource, LocationSource, TaskSource};
use crate::task::{Task, TaskDependency, TaskStatus};

const TASK_COLUMNS: &str = "id, title, creator_id, assignee_id, list_id, status, priority,
    estimated_minutes, due_at, completed_at, parent_task_id, recurrence_rule,
    requires_focus, required_location_ids, min_energy, metadata, created_at, updated_at";

const CONTEXT_COLUMNS: &str = "id, user_id, timestamp, latitude, longitude,
    current_location_id, available_minutes, social_context, energy, weather, traffic, metadata";

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_datetime(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_datetime(idx, &text)
}

fn optional_datetime_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| parse_datetime(idx, &text))
        .transpose()
}

fn enum_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

fn optional_enum_column<T>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    row.get::<_, Option<String>>(idx)?
        .map(|text| text.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        creator_id: row.get(2)?,
        assignee_id: row.get(3)?,
        list_id: row.get(4)?,
        status: enum_column(row, 5)?,
        priority: row.get(6)?,
        estimated_minutes: row.get(7)?,
        due_at: optional_datetime_column(row, 8)?,
        completed_at: optional_datetime_column(row, 9)?,
        parent_task_id: row.get(10)?,
        recurrence_rule: row.get(11)?,
        requires_focus: row.get(12)?,
        required_location_ids: json_column(row, 13)?,
        min_energy: row.get(14)?,
        metadata: json_column(row, 15)?,
        created_at: datetime_column(row, 16)?,
        updated_at: datetime_column(row, 17)?,
    })
}

fn row_to_dependency(row: &Row) -> rusqlite::Result<TaskDependency> {
    Ok(TaskDependency {
        id: row.get(0)?,
        task_id: row.get(1)?,
        depends_on_task_id: row.get(2)?,
        dependency_type: enum_column(row, 3)?,
        created_at: datetime_column(row, 4)?,
    })
}

fn row_to_location(row: &Row) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        center: Coordinates::new(row.get(3)?, row.get(4)?),
        radius_meters: row.get(5)?,
        created_at: datetime_column(row, 6)?,
    })
}

fn row_to_event(row: &Row) -> rusqlite::Result<CalendarEvent> {
    Ok(CalendarEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        start_time: datetime_column(row, 3)?,
        end_time: datetime_column(row, 4)?,
    })
}

fn row_to_context(row: &Row) -> rusqlite::Result<Context> {
    let latitude: Option<f64> = row.get(3)?;
    let longitude: Option<f64> = row.get(4)?;
    let energy: u8 = row.get(8)?;

    Ok(Context {
        id: row.get(0)?,
        user_id: row.get(1)?,
        timestamp: datetime_column(row, 2)?,
        position: latitude
            .zip(longitude)
            .map(|(lat, lon)| Coordinates::new(lat, lon)),
        current_location_id: row.get(5)?,
        available_minutes: row.get(6)?,
        social_context: enum_column(row, 7)?,
        energy: EnergyLevel::new(energy).map_err(|e| conversion_error(8, e))?,
        weather: optional_enum_column(row, 9)?,
        traffic: optional_enum_column(row, 10)?,
        metadata: json_column(row, 11)?,
    })
}

fn row_to_audit(row: &Row) -> rusqlite::Result<FilterAudit> {
    Ok(FilterAudit {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_id: row.get(2)?,
        context_id: row.get(3)?,
        visible: row.get(4)?,
        rules: json_column(row, 5)?,
        priority_score: row.get(6)?,
        created_at: datetime_column(row, 7)?,
    })
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// SQLite store for tasks, context inputs and audits.
///
/// The connection sits behind a mutex so one store can be shared as
/// `Arc<SqliteStore>` by every collaborator of the engine.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database at `<data_dir>/nowdo.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("nowdo.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(StoreError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock().map_err(|_| StoreError::LockPoisoned)?)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Insert or replace a task.
    pub fn insert_task(&self, task: &Task) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO tasks ({TASK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
            ),
            params![
                task.id,
                task.title,
                task.creator_id,
                task.assignee_id,
                task.list_id,
                task.status.as_str(),
                task.priority,
                task.estimated_minutes,
                task.due_at.as_ref().map(format_datetime),
                task.completed_at.as_ref().map(format_datetime),
                task.parent_task_id,
                task.recurrence_rule,
                task.requires_focus,
                serde_json::to_string(&task.required_location_ids)?,
                task.min_energy,
                serde_json::to_string(&task.metadata)?,
                format_datetime(&task.created_at),
                format_datetime(&task.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Tasks created by or assigned to `user_id`, newest first.
    ///
    /// Completed and cancelled tasks are skipped unless `include_closed`.
    pub fn tasks_for_user(&self, user_id: &str, include_closed: bool) -> Result<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE (creator_id = ?1 OR assignee_id = ?1)
               AND (?2 OR status NOT IN ('completed', 'cancelled'))
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let tasks = stmt
            .query_map(params![user_id, include_closed], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Move a task along the status graph and persist it.
    ///
    /// # Errors
    /// Returns an error if the task is missing or the transition is illegal.
    pub fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        let mut task = self
            .task(task_id)?
            .ok_or_else(|| DependencyError::TaskNotFound(task_id.to_string()))?;
        task.transition_to(status)?;

        let conn = self.conn()?;
        conn.execute(
            "UPDATE tasks SET status = ?1, completed_at = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                task.status.as_str(),
                task.completed_at.as_ref().map(format_datetime),
                format_datetime(&task.updated_at),
                task.id,
            ],
        )?;
        debug!(task_id, status = %task.status, "task status updated");
        Ok(task)
    }

    // ── Dependencies ─────────────────────────────────────────────────

    /// Record a dependency edge, replacing any edge between the same pair.
    ///
    /// Cycles are accepted here and reported when the graph is evaluated.
    pub fn add_dependency(&self, dependency: &TaskDependency) -> Result<()> {
        if dependency.task_id == dependency.depends_on_task_id {
            return Err(DependencyError::SelfDependency(dependency.task_id.clone()).into());
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO task_dependencies
                 (id, task_id, depends_on_task_id, dependency_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                dependency.id,
                dependency.task_id,
                dependency.depends_on_task_id,
                dependency.dependency_type.as_str(),
                format_datetime(&dependency.created_at),
            ],
        )?;
        Ok(())
    }

    /// Remove the edge `task_id -> depends_on_task_id`. Returns whether one existed.
    pub fn remove_dependency(&self, task_id: &str, depends_on_task_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM task_dependencies WHERE task_id = ?1 AND depends_on_task_id = ?2",
            params![task_id, depends_on_task_id],
        )?;
        Ok(removed > 0)
    }

    fn dependencies_where(&self, column: &str, task_id: &str) -> Result<Vec<TaskDependency>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, task_id, depends_on_task_id, dependency_type, created_at
             FROM task_dependencies WHERE {column} = ?1
             ORDER BY created_at, rowid"
        ))?;
        let deps = stmt
            .query_map(params![task_id], row_to_dependency)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(deps)
    }

    // ── Locations ────────────────────────────────────────────────────

    pub fn insert_location(&self, location: &Location) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO locations
                 (id, user_id, name, latitude, longitude, radius_meters, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                location.id,
                location.user_id,
                location.name,
                location.center.latitude,
                location.center.longitude,
                location.radius_meters,
                format_datetime(&location.created_at),
            ],
        )?;
        Ok(())
    }

    // ── Calendar ─────────────────────────────────────────────────────

    pub fn insert_event(&self, event: &CalendarEvent) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO calendar_events (id, user_id, title, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id,
                event.user_id,
                event.title,
                format_datetime(&event.start_time),
                format_datetime(&event.end_time),
            ],
        )?;
        Ok(())
    }

    /// All of a user's events ordered by start time.
    pub fn events_for_user(&self, user_id: &str) -> Result<Vec<CalendarEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, start_time, end_time FROM calendar_events
             WHERE user_id = ?1 ORDER BY start_time, rowid",
        )?;
        let events = stmt
            .query_map(params![user_id], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    // ── Contexts ─────────────────────────────────────────────────────

    /// Append a context snapshot to the user's history.
    pub fn insert_context(&self, context: &Context) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO contexts ({CONTEXT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                context.id,
                context.user_id,
                format_datetime(&context.timestamp),
                context.position.map(|p| p.latitude),
                context.position.map(|p| p.longitude),
                context.current_location_id,
                context.available_minutes,
                context.social_context.as_str(),
                context.energy.value(),
                context.weather.map(|w| w.as_str()),
                context.traffic.map(|t| t.as_str()),
                serde_json::to_string(&context.metadata)?,
            ],
        )?;
        Ok(())
    }

    /// Most recent context recorded for `user_id`.
    pub fn latest_context(&self, user_id: &str) -> Result<Option<Context>> {
        let conn = self.conn()?;
        let context = conn
            .query_row(
                &format!(
                    "SELECT {CONTEXT_COLUMNS} FROM contexts WHERE user_id = ?1
                     ORDER BY timestamp DESC, rowid DESC LIMIT 1"
                ),
                params![user_id],
                row_to_context,
            )
            .optional()?;
        Ok(context)
    }
}

impl TaskSource for SqliteStore {
    fn task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn()?;
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }
}

impl DependencySource for SqliteStore {
    fn dependencies_of(&self, task_id: &str) -> Result<Vec<TaskDependency>> {
        self.dependencies_where("task_id", task_id)
    }

    fn dependents_of(&self, task_id: &str) -> Result<Vec<TaskDependency>> {
        self.dependencies_where("depends_on_task_id", task_id)
    }
}

impl CalendarSource for SqliteStore {
    fn events_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, start_time, end_time FROM calendar_events
             WHERE user_id = ?1 AND start_time < ?2 AND end_time > ?3
             ORDER BY start_time, rowid",
        )?;
        let events = stmt
            .query_map(
                params![user_id, format_datetime(&end), format_datetime(&start)],
                row_to_event,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    fn next_event_after(&self, user_id: &str, at: DateTime<Utc>) -> Result<Option<CalendarEvent>> {
        let conn = self.conn()?;
        let event = conn
            .query_row(
                "SELECT id, user_id, title, start_time, end_time FROM calendar_events
                 WHERE user_id = ?1 AND start_time > ?2
                 ORDER BY start_time, rowid LIMIT 1",
                params![user_id, format_datetime(&at)],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }
}

impl LocationSource for SqliteStore {
    fn location(&self, id: &str) -> Result<Option<Location>> {
        let conn = self.conn()?;
        let location = conn
            .query_row(
                "SELECT id, user_id, name, latitude, longitude, radius_meters, created_at
                 FROM locations WHERE id = ?1",
                params![id],
                row_to_location,
            )
            .optional()?;
        Ok(location)
    }

    fn locations_for_user(&self, user_id: &str) -> Result<Vec<Location>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, latitude, longitude, radius_meters, created_at
             FROM locations WHERE user_id = ?1 ORDER BY name, rowid",
        )?;
        let locations = stmt
            .query_map(params![user_id], row_to_location)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(locations)
    }

    fn locations_within(&self, point: Coordinates, meters: f64) -> Result<Vec<Location>> {
        let (d_lat, d_lon) = geo::bounding_deltas(&point, meters);
        let crosses_antimeridian =
            point.longitude - d_lon < -180.0 || point.longitude + d_lon > 180.0;
        let (lon_min, lon_max) = if crosses_antimeridian {
            (-180.0, 180.0)
        } else {
            (point.longitude - d_lon, point.longitude + d_lon)
        };

        let candidates = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, latitude, longitude, radius_meters, created_at
                 FROM locations
                 WHERE latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4",
            )?;
            let rows = stmt
                .query_map(
                    params![point.latitude - d_lat, point.latitude + d_lat, lon_min, lon_max],
                    row_to_location,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut within: Vec<(f64, Location)> = candidates
            .into_iter()
            .map(|loc| (loc.distance_from(&point), loc))
            .filter(|(distance, _)| *distance <= meters)
            .collect();
        within.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(within.into_iter().map(|(_, loc)| loc).collect())
    }
}

impl AuditStore for SqliteStore {
    fn record(&self, audit: &FilterAudit) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO filter_audits
                 (id, user_id, task_id, context_id, visible, rules, priority_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                audit.id,
                audit.user_id,
                audit.task_id,
                audit.context_id,
                audit.visible,
                serde_json::to_string(&audit.rules)?,
                audit.priority_score,
                format_datetime(&audit.created_at),
            ],
        )?;
        Ok(())
    }

    fn audits_for_task(
        &self,
        task_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<FilterAudit>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, task_id, context_id, visible, rules, priority_score, created_at
             FROM filter_audits WHERE task_id = ?1 AND user_id = ?2
             ORDER BY created_at DESC, rowid DESC LIMIT ?3",
        )?;
        let audits = stmt
            .query_map(params![task_id, user_id, limit_param(limit)], row_to_audit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(audits)
    }

    fn audits_for_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FilterAudit>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, task_id, context_id, visible, rules, priority_score, created_at
             FROM filter_audits WHERE user_id = ?1 AND created_at >= ?2
             ORDER BY created_at DESC, rowid DESC LIMIT ?3",
        )?;
        let audits = stmt
            .query_map(
                params![user_id, format_datetime(&since), limit_param(limit)],
                row_to_audit,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(audits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SocialContext, WeatherCondition};
    use crate::error::{CoreError, ValidationError};
    use crate::filter::AuditRuleEntry;
    use crate::geo::METERS_PER_DEGREE;
    use crate::task::DependencyType;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn task_round_trips_every_column() {
        let store = SqliteStore::open_memory().unwrap();
        let mut task = Task::new("Renew passport", "u1")
            .unwrap()
            .with_priority(4)
            .unwrap()
            .with_estimated_minutes(45)
            .with_min_energy(2)
            .unwrap()
            .requiring_focus()
            .at_location("loc-1");
        task.due_at = Some(at(17, 0));
        task.metadata.insert("tag".into(), serde_json::json!("admin"));
        store.insert_task(&task).unwrap();

        let loaded = store.task(&task.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Renew passport");
        assert_eq!(loaded.priority, 4);
        assert_eq!(loaded.estimated_minutes, Some(45));
        assert_eq!(loaded.min_energy, Some(2));
        assert!(loaded.requires_focus);
        assert_eq!(loaded.required_location_ids, vec!["loc-1"]);
        assert_eq!(loaded.due_at, Some(at(17, 0)));
        assert_eq!(loaded.metadata["tag"], "admin");
        assert!(store.task("missing").unwrap().is_none());
    }

    #[test]
    fn status_updates_follow_transition_graph() {
        let store = SqliteStore::open_memory().unwrap();
        let task = Task::new("Ship it", "u1").unwrap();
        store.insert_task(&task).unwrap();

        let err = store
            .update_task_status(&task.id, TaskStatus::Completed)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidTransition { .. })
        ));

        store.update_task_status(&task.id, TaskStatus::Active).unwrap();
        let done = store
            .update_task_status(&task.id, TaskStatus::Completed)
            .unwrap();
        assert!(done.completed_at.is_some());
        assert_eq!(
            store.task(&task.id).unwrap().unwrap().status,
            TaskStatus::Completed
        );

        assert!(matches!(
            store.update_task_status("ghost", TaskStatus::Active),
            Err(CoreError::Dependency(DependencyError::TaskNotFound(_)))
        ));
    }

    #[test]
    fn closed_tasks_hidden_from_listing_by_default() {
        let store = SqliteStore::open_memory().unwrap();
        let open = Task::new("Open", "u1").unwrap();
        let mut done = Task::new("Done", "u1").unwrap();
        done.status = TaskStatus::Completed;
        let other = Task::new("Theirs", "u2").unwrap();
        for t in [&open, &done, &other] {
            store.insert_task(t).unwrap();
        }

        let titles: Vec<String> = store
            .tasks_for_user("u1", false)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Open"]);
        assert_eq!(store.tasks_for_user("u1", true).unwrap().len(), 2);
    }

    #[test]
    fn dependency_edges_both_directions() {
        let store = SqliteStore::open_memory().unwrap();
        let edge = TaskDependency::new("a", "b", DependencyType::Related).unwrap();
        store.add_dependency(&edge).unwrap();

        assert_eq!(store.dependencies_of("a").unwrap(), vec![edge.clone()]);
        assert_eq!(store.dependents_of("b").unwrap(), vec![edge]);
        assert!(store.dependencies_of("b").unwrap().is_empty());

        assert!(store.remove_dependency("a", "b").unwrap());
        assert!(!store.remove_dependency("a", "b").unwrap());
        assert!(store.dependencies_of("a").unwrap().is_empty());
    }

    #[test]
    fn self_dependency_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let mut edge = TaskDependency::new("a", "b", DependencyType::Blocking).unwrap();
        edge.depends_on_task_id = "a".into();
        assert!(matches!(
            store.add_dependency(&edge),
            Err(CoreError::Dependency(DependencyError::SelfDependency(_)))
        ));
    }

    #[test]
    fn events_between_uses_overlap() {
        let store = SqliteStore::open_memory().unwrap();
        let morning = CalendarEvent::new("u1", "Standup", at(9, 0), at(9, 15));
        let lunch = CalendarEvent::new("u1", "Lunch", at(12, 0), at(13, 0));
        let theirs = CalendarEvent::new("u2", "Other", at(10, 0), at(11, 0));
        for e in [&lunch, &morning, &theirs] {
            store.insert_event(e).unwrap();
        }

        let found = store.events_between("u1", at(9, 10), at(12, 30)).unwrap();
        assert_eq!(found, vec![morning.clone(), lunch.clone()]);
        assert!(store.events_between("u1", at(9, 15), at(12, 0)).unwrap().is_empty());

        assert_eq!(store.next_event_after("u1", at(9, 0)).unwrap(), Some(lunch));
        assert_eq!(store.next_event_after("u1", at(13, 0)).unwrap(), None);
        assert_eq!(store.events_for_user("u1").unwrap().len(), 2);
    }

    #[test]
    fn sub_second_timestamps_compare_correctly() {
        let store = SqliteStore::open_memory().unwrap();
        let start = at(10, 0) + Duration::milliseconds(500);
        let event = CalendarEvent::new("u1", "Precise", start, start + Duration::minutes(5));
        store.insert_event(&event).unwrap();
        assert_eq!(store.next_event_after("u1", at(10, 0)).unwrap(), Some(event));
    }

    #[test]
    fn locations_within_sorted_nearest_first() {
        let store = SqliteStore::open_memory().unwrap();
        let origin = Coordinates::new(51.5, -0.12);
        let north = |meters: f64| Coordinates::new(51.5 + meters / METERS_PER_DEGREE, -0.12);
        let near = Location::new("u1", "Near", north(100.0), 50.0).unwrap();
        let mid = Location::new("u1", "Mid", north(400.0), 50.0).unwrap();
        let far = Location::new("u1", "Far", north(111_000.0), 50.0).unwrap();
        for l in [&mid, &far, &near] {
            store.insert_location(l).unwrap();
        }

        let names: Vec<String> = store
            .locations_within(origin, 1_000.0)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Near", "Mid"]);
        assert_eq!(store.locations_for_user("u1").unwrap().len(), 3);
        assert_eq!(store.location(&near.id).unwrap(), Some(near));
    }

    #[test]
    fn locations_within_across_antimeridian() {
        let store = SqliteStore::open_memory().unwrap();
        let east = Location::new("u1", "Fiji", Coordinates::new(-17.0, 179.999), 100.0).unwrap();
        store.insert_location(&east).unwrap();
        let found = store
            .locations_within(Coordinates::new(-17.0, -179.999), 1_000.0)
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn latest_context_wins() {
        let store = SqliteStore::open_memory().unwrap();
        let older = Context::new("u1", at(8, 0));
        let mut newer = Context::new("u1", at(9, 0))
            .with_position(Coordinates::new(1.0, 2.0))
            .with_available_minutes(30)
            .with_social_context(SocialContext::AtWork);
        newer.weather = Some(WeatherCondition::Rain);
        store.insert_context(&newer).unwrap();
        store.insert_context(&older).unwrap();

        let latest = store.latest_context("u1").unwrap().unwrap();
        assert_eq!(latest, newer);
        assert!(store.latest_context("u2").unwrap().is_none());
    }

    #[test]
    fn audits_most_recent_first_and_bounded() {
        let store = SqliteStore::open_memory().unwrap();
        let base = Utc::now();
        for i in 0..5 {
            let audit = FilterAudit {
                id: format!("a{i}"),
                user_id: if i == 4 { "u2".into() } else { "u1".into() },
                task_id: "t1".into(),
                context_id: "c1".into(),
                visible: i % 2 == 0,
                rules: vec![AuditRuleEntry {
                    rule_name: "time".into(),
                    passed: i % 2 == 0,
                    details: "x".into(),
                    score: if i % 2 == 0 { 1.0 } else { 0.0 },
                }],
                priority_score: 3.0,
                created_at: base + Duration::seconds(i),
            };
            store.record(&audit).unwrap();
        }

        // a4 is the newest record but belongs to u2; the limit applies to u1's rows
        let ids: Vec<String> = store
            .audits_for_task("t1", "u1", 3)
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["a3", "a2", "a1"]);

        let other: Vec<String> = store
            .audits_for_task("t1", "u2", 3)
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(other, vec!["a4"]);

        let since = store
            .audits_for_user_since("u1", base + Duration::seconds(1), 10)
            .unwrap();
        assert_eq!(since.len(), 3);
        assert!(since.iter().all(|a| a.user_id == "u1"));
        assert_eq!(since[0].rules[0].rule_name, "time");
    }
}
