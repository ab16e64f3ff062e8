//! Persisted record of one visibility decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::RuleEvaluation;
use crate::context::Context;
use crate::task::Task;

/// One rule's contribution to an audited decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRuleEntry {
    pub rule_name: String,
    pub passed: bool,
    pub details: String,
    /// 1.0 when the rule passed, 0.0 otherwise
    pub score: f64,
}

/// Append-only audit record for one (context, task) evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterAudit {
    pub id: String,
    pub user_id: String,
    pub task_id: String,
    pub context_id: String,
    pub visible: bool,
    /// Rule entries in evaluation (descending priority) order
    pub rules: Vec<AuditRuleEntry>,
    /// Task priority scaled by the fraction of rules passed (0-5)
    pub priority_score: f64,
    pub created_at: DateTime<Utc>,
}

impl FilterAudit {
    /// Fold a task's rule evaluations into an audit record.
    pub fn from_evaluations(context: &Context, task: &Task, evaluations: &[RuleEvaluation]) -> Self {
        let rules: Vec<AuditRuleEntry> = evaluations
            .iter()
            .map(|eval| AuditRuleEntry {
                rule_name: eval.rule_name.clone(),
                passed: eval.visible,
                details: eval.reason.clone(),
                score: if eval.visible { 1.0 } else { 0.0 },
            })
            .collect();

        let visible = rules.iter().all(|r| r.passed);
        let pass_ratio = if rules.is_empty() {
            1.0
        } else {
            rules.iter().map(|r| r.score).sum::<f64>() / rules.len() as f64
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: context.user_id.clone(),
            task_id: task.id.clone(),
            context_id: context.id.clone(),
            visible,
            rules,
            priority_score: task.priority as f64 * pass_ratio,
            created_at: Utc::now(),
        }
    }

    /// Names of the rules that hid the task.
    pub fn failed_rules(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.rule_name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(name: &str, visible: bool) -> RuleEvaluation {
        RuleEvaluation {
            rule_name: name.to_string(),
            priority: 0,
            visible,
            reason: format!("{name} said {visible}"),
        }
    }

    #[test]
    fn score_scales_with_passed_rules() {
        let ctx = Context::new("u1", Utc::now());
        let task = Task::new("t", "u1").unwrap().with_priority(4).unwrap();
        let audit =
            FilterAudit::from_evaluations(&ctx, &task, &[eval("a", true), eval("b", false)]);
        assert!(!audit.visible);
        assert_eq!(audit.priority_score, 2.0);
        assert_eq!(audit.failed_rules(), vec!["b"]);
        assert_eq!(audit.context_id, ctx.id);
        assert_eq!(audit.user_id, "u1");
    }

    #[test]
    fn no_rules_means_visible() {
        let ctx = Context::new("u1", Utc::now());
        let task = Task::new("t", "u1").unwrap();
        let audit = FilterAudit::from_evaluations(&ctx, &task, &[]);
        assert!(audit.visible);
        assert_eq!(audit.priority_score, 3.0);
    }
}
