//! Task types and status transitions.
//!
//! Status follows a restricted graph:
//!
//!   PENDING ──> ACTIVE ──> COMPLETED
//!      │  \       │  ^
//!      │   \      v  │
//!      │    └─> BLOCKED
//!      │          │
//!      └──────────┴──────> CANCELLED
//!
//! Valid transitions:
//! - PENDING → ACTIVE | CANCELLED | BLOCKED
//! - ACTIVE → COMPLETED | BLOCKED | CANCELLED
//! - BLOCKED → ACTIVE | CANCELLED
//! - COMPLETED and CANCELLED are terminal

pub mod dependency;

pub use dependency::{DependencyType, TaskDependency};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 500;

/// Task status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not started
    #[default]
    Pending,
    /// Being worked on
    Active,
    /// Finished (terminal)
    Completed,
    /// Abandoned (terminal)
    Cancelled,
    /// Waiting on something outside the task
    Blocked,
}

impl TaskStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &TaskStatus) -> bool {
        self.valid_transitions().contains(to)
    }

    /// Get valid next states for this state.
    pub fn valid_transitions(&self) -> &'static [TaskStatus] {
        match self {
            TaskStatus::Pending => &[
                TaskStatus::Active,
                TaskStatus::Cancelled,
                TaskStatus::Blocked,
            ],
            TaskStatus::Active => &[
                TaskStatus::Completed,
                TaskStatus::Blocked,
                TaskStatus::Cancelled,
            ],
            TaskStatus::Blocked => &[TaskStatus::Active, TaskStatus::Cancelled],
            TaskStatus::Completed | TaskStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "active" => Ok(TaskStatus::Active),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            "blocked" => Ok(TaskStatus::Blocked),
            other => Err(ValidationError::InvalidValue {
                field: "status".to_string(),
                message: format!("unknown status '{other}'"),
            }),
        }
    }
}

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Task title (1-500 characters)
    pub title: String,
    /// User who created the task
    pub creator_id: String,
    /// User the task is assigned to
    pub assignee_id: Option<String>,
    /// List the task belongs to
    pub list_id: Option<String>,
    /// Current status
    pub status: TaskStatus,
    /// Priority 1 (lowest) to 5 (highest)
    pub priority: u8,
    /// Estimated duration in minutes
    pub estimated_minutes: Option<u32>,
    /// Due date
    pub due_at: Option<DateTime<Utc>>,
    /// Completion timestamp (set on transition to completed)
    pub completed_at: Option<DateTime<Utc>>,
    /// Parent task for subtasks
    pub parent_task_id: Option<String>,
    /// Recurrence rule (RRULE text)
    pub recurrence_rule: Option<String>,
    /// Whether the task needs a setting conducive to concentration
    #[serde(default)]
    pub requires_focus: bool,
    /// Locations at which the task can be done (any one suffices)
    #[serde(default)]
    pub required_location_ids: Vec<String>,
    /// Explicit effort floor (1-5); defaults to the priority
    #[serde(default)]
    pub min_energy: Option<u8>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending task with priority 3.
    pub fn new(title: impl Into<String>, creator_id: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        validate_title(&title)?;
        let now = Utc::now();
        Ok(Task {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            creator_id: creator_id.into(),
            assignee_id: None,
            list_id: None,
            status: TaskStatus::Pending,
            priority: 3,
            estimated_minutes: None,
            due_at: None,
            completed_at: None,
            parent_task_id: None,
            recurrence_rule: None,
            requires_focus: false,
            required_location_ids: Vec::new(),
            min_energy: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_priority(mut self, priority: u8) -> Result<Self, ValidationError> {
        validate_priority(priority)?;
        self.priority = priority;
        Ok(self)
    }

    pub fn with_estimated_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn with_min_energy(mut self, energy: u8) -> Result<Self, ValidationError> {
        if !(1..=5).contains(&energy) {
            return Err(ValidationError::EnergyOutOfRange(energy as i64));
        }
        self.min_energy = Some(energy);
        Ok(self)
    }

    pub fn requiring_focus(mut self) -> Self {
        self.requires_focus = true;
        self
    }

    pub fn at_location(mut self, location_id: impl Into<String>) -> Self {
        self.required_location_ids.push(location_id.into());
        self
    }

    /// Transition to a new status.
    ///
    /// Returns an error if the transition is not in the graph.
    pub fn transition_to(&mut self, new_status: TaskStatus) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(&new_status) {
            return Err(ValidationError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        let now = Utc::now();
        if new_status == TaskStatus::Completed {
            self.completed_at = Some(now);
        }
        self.status = new_status;
        self.updated_at = now;
        Ok(())
    }

    /// Minimum energy level needed to take this task on.
    pub fn effort_floor(&self) -> u8 {
        self.min_energy.unwrap_or(self.priority)
    }

    /// Whether the task is still open (not completed or cancelled).
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Check a title is non-empty and at most 500 characters.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong {
            len,
            max: MAX_TITLE_LEN,
        });
    }
    Ok(())
}

/// Check a priority lies in 1..=5.
pub fn validate_priority(priority: u8) -> Result<(), ValidationError> {
    if (1..=5).contains(&priority) {
        Ok(())
    } else {
        Err(ValidationError::PriorityOutOfRange(priority as i64))
    }
}
