//! Task management and dependency graph commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use nowdo_core::{DependencyType, Task, TaskDependency, TaskStatus};
use serde_json::json;

use super::{parse_metadata, print_json, CliResult, Runtime, DEFAULT_USER};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a task
    Add {
        /// Task title
        title: String,
        /// Creator of the task
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
        /// Priority 1 (lowest) to 5 (highest)
        #[arg(long, default_value_t = 3)]
        priority: u8,
        /// Estimated duration in minutes
        #[arg(long)]
        minutes: Option<u32>,
        /// Needs a setting conducive to concentration
        #[arg(long)]
        focus: bool,
        /// Location id where the task can be done (repeatable)
        #[arg(long = "location")]
        locations: Vec<String>,
        /// Minimum energy level (defaults to the priority)
        #[arg(long)]
        min_energy: Option<u8>,
        /// Due date, RFC 3339
        #[arg(long)]
        due: Option<DateTime<Utc>>,
        /// Assignee user id
        #[arg(long)]
        assignee: Option<String>,
        /// List id
        #[arg(long)]
        list: Option<String>,
        /// Parent task id
        #[arg(long)]
        parent: Option<String>,
        /// Metadata as key=value (repeatable)
        #[arg(long = "meta")]
        metadata: Vec<String>,
    },
    /// List tasks created by or assigned to a user
    List {
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
        /// Include completed and cancelled tasks
        #[arg(long)]
        all: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Change a task's status (pending, active, completed, cancelled, blocked)
    Status {
        /// Task ID
        id: String,
        /// New status
        status: TaskStatus,
    },
    /// Make a task depend on another
    Depend {
        /// Dependent task ID
        id: String,
        /// Prerequisite task ID
        on: String,
        /// blocking, related or scheduled
        #[arg(long, default_value = "blocking")]
        kind: DependencyType,
    },
    /// Remove a dependency edge
    Undepend {
        /// Dependent task ID
        id: String,
        /// Prerequisite task ID
        on: String,
    },
    /// Prerequisites in the order they must be done, the task itself last
    Chain {
        /// Task ID
        id: String,
    },
    /// Whether a task's blocking prerequisites are all met
    CanStart {
        /// Task ID
        id: String,
    },
    /// Report a dependency cycle reachable from a task
    Cycle {
        /// Task ID
        id: String,
    },
    /// Tasks that depend on this one
    Dependents {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> CliResult {
    let rt = Runtime::open()?;

    match action {
        TaskAction::Add {
            title,
            user,
            priority,
            minutes,
            focus,
            locations,
            min_energy,
            due,
            assignee,
            list,
            parent,
            metadata,
        } => {
            let mut task = Task::new(title, user)?.with_priority(priority)?;
            if let Some(minutes) = minutes {
                task = task.with_estimated_minutes(minutes);
            }
            if let Some(energy) = min_energy {
                task = task.with_min_energy(energy)?;
            }
            if focus {
                task = task.requiring_focus();
            }
            for location in locations {
                task = task.at_location(location);
            }
            task.due_at = due;
            task.assignee_id = assignee;
            task.list_id = list;
            task.parent_task_id = parent;
            task.metadata = parse_metadata(&metadata);

            rt.store.insert_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::List { user, all } => {
            let tasks = rt.store.tasks_for_user(&user, all)?;
            print_json(&tasks)?;
        }
        TaskAction::Get { id } => {
            let task = rt
                .dependencies
                .task(&id)?
                .ok_or_else(|| format!("task not found: {id}"))?;
            print_json(&task)?;
        }
        TaskAction::Status { id, status } => {
            let task = rt.store.update_task_status(&id, status)?;
            print_json(&task)?;
        }
        TaskAction::Depend { id, on, kind } => {
            let edge = TaskDependency::new(id, on, kind)?;
            rt.store.add_dependency(&edge)?;
            print_json(&edge)?;
        }
        TaskAction::Undepend { id, on } => {
            let removed = rt.store.remove_dependency(&id, &on)?;
            print_json(&json!({ "task_id": id, "depends_on_task_id": on, "removed": removed }))?;
        }
        TaskAction::Chain { id } => {
            let chain = rt.dependencies.chain(&id)?;
            print_json(&chain)?;
        }
        TaskAction::CanStart { id } => {
            let readiness = rt.dependencies.can_start(&id)?;
            print_json(&readiness)?;
        }
        TaskAction::Cycle { id } => {
            let cycle = rt.dependencies.has_cycle(&id)?;
            print_json(&json!({
                "task_id": id,
                "has_cycle": cycle.is_some(),
                "cycle": cycle.map(|c| c.path),
            }))?;
        }
        TaskAction::Dependents { id } => {
            let dependents = rt.dependencies.dependents(&id)?;
            print_json(&dependents)?;
        }
    }
    Ok(())
}
