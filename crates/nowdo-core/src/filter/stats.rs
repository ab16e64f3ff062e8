use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::engine::RuleEvaluation;

/// Pass/fail tally for one rule over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStats {
    pub priority: i32,
    pub visible: usize,
    pub hidden: usize,
    /// Reason text -> occurrences
    pub reasons: BTreeMap<String, usize>,
}

/// Aggregate view of how a batch was filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub total_tasks: usize,
    pub visible_tasks: usize,
    pub hidden_tasks: usize,
    pub rules: BTreeMap<String, RuleStats>,
}

impl FilterStats {
    /// Fold per-task evaluations (one inner vec per task).
    pub fn from_evaluations(evaluations: &[Vec<RuleEvaluation>]) -> Self {
        let mut stats = FilterStats {
            total_tasks: evaluations.len(),
            ..Default::default()
        };

        for task_evals in evaluations {
            if task_evals.iter().all(|e| e.visible) {
                stats.visible_tasks += 1;
            } else {
                stats.hidden_tasks += 1;
            }

            for eval in task_evals {
                let entry = stats.rules.entry(eval.rule_name.clone()).or_default();
                entry.priority = eval.priority;
                if eval.visible {
                    entry.visible += 1;
                } else {
                    entry.hidden += 1;
                }
                *entry.reasons.entry(eval.reason.clone()).or_default() += 1;
            }
        }

        stats
    }

    /// Rule that hid the most tasks, if any rule hid anything.
    pub fn most_restrictive(&self) -> Option<&str> {
        self.rules
            .iter()
            .filter(|(_, s)| s.hidden > 0)
            .max_by(|(an, a), (bn, b)| a.hidden.cmp(&b.hidden).then_with(|| bn.cmp(an)))
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(name: &str, visible: bool, reason: &str) -> RuleEvaluation {
        RuleEvaluation {
            rule_name: name.to_string(),
            priority: 1,
            visible,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn tallies_reasons() {
        let stats = FilterStats::from_evaluations(&[
            vec![eval("time", false, "too long"), eval("focus", true, "ok")],
            vec![eval("time", false, "too long"), eval("focus", false, "busy")],
            vec![eval("time", true, "fits"), eval("focus", true, "ok")],
        ]);
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.visible_tasks, 1);
        assert_eq!(stats.hidden_tasks, 2);
        assert_eq!(stats.rules["time"].reasons["too long"], 2);
        assert_eq!(stats.rules["focus"].hidden, 1);
        assert_eq!(stats.most_restrictive(), Some("time"));
    }

    #[test]
    fn empty_batch() {
        let stats = FilterStats::from_evaluations(&[]);
        assert_eq!(stats, FilterStats::default());
        assert_eq!(stats.most_restrictive(), None);
    }
}
