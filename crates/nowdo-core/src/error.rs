//! Core error types for nowdo-core.
//!
//! Structural and configuration problems (unknown rule, unknown filter,
//! circular dependency on an explicit chain request) surface as errors.
//! Data gaps found while filtering never do: the rules degrade to hidden.

use std::path::PathBuf;
use thiserror::Error;

use crate::task::TaskStatus;

/// Core error type for nowdo-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Filter engine errors
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Dependency graph errors
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by the filter engine's introspection surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// No rule with this name is registered
    #[error("Filter rule '{0}' not found")]
    RuleNotFound(String),

    /// Name does not match any of the fixed rule families
    #[error("Unknown filter '{0}' (expected one of: dependency, time, location, focus, energy)")]
    UnknownFilter(String),
}

/// Errors raised while walking the task dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// A cycle was found while building a dependency chain
    #[error("Circular dependency detected at task {task_id}: {cycle}")]
    CircularDependency { task_id: String, cycle: String },

    /// A referenced task does not exist
    #[error("Task {0} not found")]
    TaskNotFound(String),

    /// A task cannot depend on itself
    #[error("Task {0} cannot depend on itself")]
    SelfDependency(String),

    /// The task or dependency store failed
    #[error("Dependency lookup failed: {0}")]
    Lookup(String),
}

/// Validation errors for domain values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Title is empty or whitespace
    #[error("Task title must not be empty")]
    EmptyTitle,

    /// Title exceeds the length limit
    #[error("Task title is {len} characters long (maximum {max})")]
    TitleTooLong { len: usize, max: usize },

    /// Priority outside 1..=5
    #[error("Priority {0} is out of range (expected 1-5)")]
    PriorityOutOfRange(i64),

    /// Energy level outside 1..=5
    #[error("Energy level {0} is out of range (expected 1-5)")]
    EnergyOutOfRange(i64),

    /// Location radius outside (0, 10000]
    #[error("Location radius {0}m is out of range (expected 0 < radius <= 10000)")]
    RadiusOutOfRange(f64),

    /// Latitude/longitude outside the valid range
    #[error("Invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// Status change not allowed by the transition graph
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON column could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),

    /// Connection mutex was poisoned by a panicking writer
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(StoreError::Sqlite(err))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Store(StoreError::Json(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
