//! Prerequisite resolution over the task dependency graph.
//!
//! The graph is not guaranteed acyclic: edges are accepted at insert time and
//! cycles are detected when the graph is walked. Every walk keeps the set of
//! nodes on the current DFS path, adding on entry and removing on exit, so a
//! node reachable along two independent paths (a diamond) is not mistaken for
//! a cycle.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, DependencyError};
use crate::sources::{DependencySource, TaskSource};
use crate::task::{DependencyType, Task, TaskDependency, TaskStatus};

/// A cycle found in the dependency graph, as the ids along it.
///
/// The first and last ids are the same task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCycle {
    pub path: Vec<String>,
}

impl DependencyCycle {
    /// Whether the cycle passes through `task_id`.
    pub fn contains(&self, task_id: &str) -> bool {
        self.path.iter().any(|id| id == task_id)
    }
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join(" -> "))
    }
}

/// Answer to "can this task start now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReadiness {
    pub can_start: bool,
    /// Titles of unmet blocking prerequisites
    pub blocking: Vec<String>,
}

/// Walks dependency edges using the task and dependency stores.
pub struct DependencyResolver {
    tasks: Arc<dyn TaskSource>,
    dependencies: Arc<dyn DependencySource>,
}

impl DependencyResolver {
    pub fn new(tasks: Arc<dyn TaskSource>, dependencies: Arc<dyn DependencySource>) -> Self {
        Self {
            tasks,
            dependencies,
        }
    }

    /// Whether `dependency` is satisfied by a prerequisite in `prerequisite_status`.
    pub fn is_met(dependency: &TaskDependency, prerequisite_status: TaskStatus) -> bool {
        dependency.is_met(prerequisite_status)
    }

    pub fn task(&self, task_id: &str) -> Result<Option<Task>, DependencyError> {
        self.tasks.task(task_id).map_err(lookup)
    }

    /// Edges where `task_id` is the dependent.
    pub fn dependencies(&self, task_id: &str) -> Result<Vec<TaskDependency>, DependencyError> {
        self.dependencies.dependencies_of(task_id).map_err(lookup)
    }

    /// Tasks that depend on `task_id`. Dangling edges are skipped.
    pub fn dependents(&self, task_id: &str) -> Result<Vec<Task>, DependencyError> {
        let edges = self.dependencies.dependents_of(task_id).map_err(lookup)?;
        let mut dependents = Vec::with_capacity(edges.len());
        for edge in edges {
            if let Some(task) = self.task(&edge.task_id)? {
                dependents.push(task);
            }
        }
        Ok(dependents)
    }

    /// Look for a cycle anywhere in the dependency closure of `task_id`.
    pub fn has_cycle(&self, task_id: &str) -> Result<Option<DependencyCycle>, DependencyError> {
        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        let mut finished = HashSet::new();
        self.find_cycle(task_id, &mut path, &mut on_path, &mut finished)
    }

    fn find_cycle(
        &self,
        task_id: &str,
        path: &mut Vec<String>,
        on_path: &mut HashSet<String>,
        finished: &mut HashSet<String>,
    ) -> Result<Option<DependencyCycle>, DependencyError> {
        if on_path.contains(task_id) {
            return Ok(Some(cycle_from(path, task_id)));
        }
        // Fully explored without a cycle: nothing new below it.
        if finished.contains(task_id) {
            return Ok(None);
        }

        on_path.insert(task_id.to_string());
        path.push(task_id.to_string());

        for edge in self.dependencies(task_id)? {
            if let Some(cycle) = self.find_cycle(&edge.depends_on_task_id, path, on_path, finished)? {
                return Ok(Some(cycle));
            }
        }

        path.pop();
        on_path.remove(task_id);
        finished.insert(task_id.to_string());
        Ok(None)
    }

    /// Prerequisites of `task_id` in dependency order, ending with the task itself.
    ///
    /// # Errors
    /// `CircularDependency` if the walk meets a cycle, `TaskNotFound` if any
    /// task along the way is missing.
    pub fn chain(&self, task_id: &str) -> Result<Vec<Task>, DependencyError> {
        let mut path = Vec::new();
        let mut emitted = HashSet::new();
        let mut ordered = Vec::new();
        self.collect_chain(task_id, &mut path, &mut emitted, &mut ordered)?;
        Ok(ordered)
    }

    fn collect_chain(
        &self,
        task_id: &str,
        path: &mut Vec<String>,
        emitted: &mut HashSet<String>,
        ordered: &mut Vec<Task>,
    ) -> Result<(), DependencyError> {
        if path.iter().any(|id| id == task_id) {
            return Err(DependencyError::CircularDependency {
                task_id: task_id.to_string(),
                cycle: cycle_from(path, task_id).to_string(),
            });
        }
        if emitted.contains(task_id) {
            return Ok(());
        }

        let task = self
            .task(task_id)?
            .ok_or_else(|| DependencyError::TaskNotFound(task_id.to_string()))?;

        path.push(task_id.to_string());
        for edge in self.dependencies(task_id)? {
            self.collect_chain(&edge.depends_on_task_id, path, emitted, ordered)?;
        }
        path.pop();

        emitted.insert(task_id.to_string());
        ordered.push(task);
        Ok(())
    }

    /// Whether `task_id` can start. Only unmet `blocking` edges prevent it.
    pub fn can_start(&self, task_id: &str) -> Result<StartReadiness, DependencyError> {
        if self.task(task_id)?.is_none() {
            return Err(DependencyError::TaskNotFound(task_id.to_string()));
        }

        let mut blocking = Vec::new();
        for edge in self.dependencies(task_id)? {
            if edge.dependency_type != DependencyType::Blocking {
                continue;
            }
            match self.task(&edge.depends_on_task_id)? {
                Some(prerequisite) if edge.is_met(prerequisite.status) => {}
                Some(prerequisite) => blocking.push(prerequisite.title),
                None => blocking.push(format!("unknown task {}", edge.depends_on_task_id)),
            }
        }

        Ok(StartReadiness {
            can_start: blocking.is_empty(),
            blocking,
        })
    }
}

fn cycle_from(path: &[String], task_id: &str) -> DependencyCycle {
    let start = path.iter().position(|id| id == task_id).unwrap_or(0);
    let mut cycle: Vec<String> = path[start..].to_vec();
    cycle.push(task_id.to_string());
    DependencyCycle { path: cycle }
}

fn lookup(err: CoreError) -> DependencyError {
    DependencyError::Lookup(err.to_string())
}
