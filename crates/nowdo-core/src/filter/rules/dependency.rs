//! Hides tasks whose prerequisites are not yet met.
//!
//! Fails closed: a prerequisite that cannot be looked up counts as unmet, and
//! a graph that cannot be walked hides the task, so one bad record never
//! aborts evaluation of the rest of the batch.

use std::sync::Arc;

use tracing::warn;

use super::DEPENDENCY_PRIORITY;
use crate::context::Context;
use crate::dependency::DependencyResolver;
use crate::filter::{FilterFamily, FilterRule, RuleDecision};
use crate::task::Task;

pub struct DependencyRule {
    resolver: Arc<DependencyResolver>,
}

impl DependencyRule {
    pub const NAME: &'static str = "dependency";

    pub fn new(resolver: Arc<DependencyResolver>) -> Self {
        Self { resolver }
    }
}

impl FilterRule for DependencyRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        DEPENDENCY_PRIORITY
    }

    fn family(&self) -> Option<FilterFamily> {
        Some(FilterFamily::Dependency)
    }

    fn apply(&self, _context: &Context, task: &Task) -> RuleDecision {
        let edges = match self.resolver.dependencies(&task.id) {
            Ok(edges) => edges,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "dependency lookup failed, hiding task");
                return RuleDecision::hidden(format!("dependencies could not be checked: {e}"));
            }
        };

        if edges.is_empty() {
            return RuleDecision::visible("no dependencies");
        }

        match self.resolver.has_cycle(&task.id) {
            Ok(None) => {}
            Ok(Some(cycle)) => {
                return RuleDecision::hidden(format!("circular dependency detected: {cycle}"));
            }
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "cycle check failed, hiding task");
                return RuleDecision::hidden(format!("dependencies could not be checked: {e}"));
            }
        }

        let mut unmet = Vec::new();
        for edge in &edges {
            let phrase = edge.dependency_type.unmet_phrase();
            match self.resolver.task(&edge.depends_on_task_id) {
                Ok(Some(prerequisite)) if edge.is_met(prerequisite.status) => {}
                Ok(Some(prerequisite)) => unmet.push(format!("'{}' {phrase}", prerequisite.title)),
                Ok(None) => unmet.push(format!("unknown task {} {phrase}", edge.depends_on_task_id)),
                Err(e) => {
                    warn!(
                        task_id = %task.id,
                        prerequisite = %edge.depends_on_task_id,
                        error = %e,
                        "prerequisite lookup failed"
                    );
                    unmet.push(format!("unknown task {} {phrase}", edge.depends_on_task_id));
                }
            }
        }

        if unmet.is_empty() {
            RuleDecision::visible(format!("all {} dependencies met", edges.len()))
        } else {
            RuleDecision::hidden(format!("unmet dependencies: {}", unmet.join("; ")))
        }
    }
}
