//! Directed task-to-task prerequisite edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::TaskStatus;
use crate::error::{DependencyError, ValidationError};

/// Strength of a prerequisite relationship.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// Prerequisite must be completed
    #[default]
    Blocking,
    /// Prerequisite must at least be started
    Related,
    /// Prerequisite must be completed on its schedule
    Scheduled,
}

impl DependencyType {
    /// Whether a prerequisite in `status` satisfies this dependency.
    pub fn is_met(&self, status: TaskStatus) -> bool {
        match self {
            DependencyType::Blocking | DependencyType::Scheduled => status == TaskStatus::Completed,
            DependencyType::Related => {
                matches!(status, TaskStatus::Active | TaskStatus::Completed)
            }
        }
    }

    /// Phrase describing what an unmet prerequisite still needs.
    pub fn unmet_phrase(&self) -> &'static str {
        match self {
            DependencyType::Blocking => "must be completed first",
            DependencyType::Related => "must be started first",
            DependencyType::Scheduled => "must be completed according to schedule",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Blocking => "blocking",
            DependencyType::Related => "related",
            DependencyType::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" => Ok(DependencyType::Blocking),
            "related" => Ok(DependencyType::Related),
            "scheduled" => Ok(DependencyType::Scheduled),
            other => Err(ValidationError::InvalidValue {
                field: "dependency_type".to_string(),
                message: format!("unknown dependency type '{other}'"),
            }),
        }
    }
}

/// Edge: `task_id` depends on `depends_on_task_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: String,
    pub task_id: String,
    pub depends_on_task_id: String,
    pub dependency_type: DependencyType,
    pub created_at: DateTime<Utc>,
}

impl TaskDependency {
    /// Create a dependency edge. Self-dependencies are rejected; cycles are not
    /// checked here.
    pub fn new(
        task_id: impl Into<String>,
        depends_on_task_id: impl Into<String>,
        dependency_type: DependencyType,
    ) -> Result<Self, DependencyError> {
        let task_id = task_id.into();
        let depends_on_task_id = depends_on_task_id.into();
        if task_id == depends_on_task_id {
            return Err(DependencyError::SelfDependency(task_id));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id,
            depends_on_task_id,
            dependency_type,
            created_at: Utc::now(),
        })
    }

    /// Whether the prerequisite, currently in `prerequisite_status`, satisfies this edge.
    pub fn is_met(&self, prerequisite_status: TaskStatus) -> bool {
        self.dependency_type.is_met(prerequisite_status)
    }
}
