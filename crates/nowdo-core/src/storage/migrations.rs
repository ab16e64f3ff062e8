//! Database schema migrations for nowdo.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{info, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < SCHEMA_VERSION {
        info!(from = current_version, to = SCHEMA_VERSION, "database migrated");
    }
    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: tasks and the dependency graph.
///
/// Dependency rows may reference tasks that do not exist (yet); the
/// evaluation path treats those as unmet, so no foreign keys are declared.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                    TEXT PRIMARY KEY,
            title                 TEXT NOT NULL,
            creator_id            TEXT NOT NULL,
            assignee_id           TEXT,
            list_id               TEXT,
            status                TEXT NOT NULL DEFAULT 'pending',
            priority              INTEGER NOT NULL DEFAULT 3,
            estimated_minutes     INTEGER,
            due_at                TEXT,
            completed_at          TEXT,
            parent_task_id        TEXT,
            recurrence_rule       TEXT,
            requires_focus        INTEGER NOT NULL DEFAULT 0,
            required_location_ids TEXT NOT NULL DEFAULT '[]',
            min_energy            INTEGER,
            metadata              TEXT NOT NULL DEFAULT '{}',
            created_at            TEXT NOT NULL,
            updated_at            TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS task_dependencies (
            id                 TEXT PRIMARY KEY,
            task_id            TEXT NOT NULL,
            depends_on_task_id TEXT NOT NULL,
            dependency_type    TEXT NOT NULL DEFAULT 'blocking',
            created_at         TEXT NOT NULL,
            UNIQUE (task_id, depends_on_task_id)
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_creator ON tasks(creator_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_deps_task ON task_dependencies(task_id);
        CREATE INDEX IF NOT EXISTS idx_deps_depends_on ON task_dependencies(depends_on_task_id);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: context inputs and the audit trail.
///
/// Adds locations, calendar events, the append-only context history and
/// filter audits.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS locations (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL,
            name          TEXT NOT NULL,
            latitude      REAL NOT NULL,
            longitude     REAL NOT NULL,
            radius_meters REAL NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS calendar_events (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            title      TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS contexts (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL,
            timestamp           TEXT NOT NULL,
            latitude            REAL,
            longitude           REAL,
            current_location_id TEXT,
            available_minutes   INTEGER NOT NULL,
            social_context      TEXT NOT NULL,
            energy              INTEGER NOT NULL,
            weather             TEXT,
            traffic             TEXT,
            metadata            TEXT NOT NULL DEFAULT '{}'
        );

        CREATE TABLE IF NOT EXISTS filter_audits (
            id             TEXT PRIMARY KEY,
            user_id        TEXT NOT NULL,
            task_id        TEXT NOT NULL,
            context_id     TEXT NOT NULL,
            visible        INTEGER NOT NULL,
            rules          TEXT NOT NULL,
            priority_score REAL NOT NULL,
            created_at     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_locations_user ON locations(user_id);
        CREATE INDEX IF NOT EXISTS idx_locations_lat_lon ON locations(latitude, longitude);
        CREATE INDEX IF NOT EXISTS idx_events_user_start ON calendar_events(user_id, start_time);
        CREATE INDEX IF NOT EXISTS idx_contexts_user_ts ON contexts(user_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_audits_task ON filter_audits(task_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_audits_user ON filter_audits(user_id, created_at);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
