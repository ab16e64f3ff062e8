//! Filter engine: owns the rule set and evaluates tasks against it.
//!
//! The rule set and family flags sit behind one `RwLock`. Evaluations take the
//! read side and may run concurrently; `add_rule`, `remove_rule` and the
//! enable/disable toggles take the write side and exclude everything else.
//! Audit records are written after the read lock is released, and a failing
//! audit store never changes or blocks a visibility decision.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::audit::FilterAudit;
use super::rules::{DependencyRule, EnergyRule, FocusRule, LocationRule, TimeRule};
use super::stats::FilterStats;
use super::{FilterFamily, FilterFlags, FilterResult, FilterRule, RuleDecision};
use crate::context::Context;
use crate::dependency::DependencyResolver;
use crate::error::{FilterError, Result};
use crate::sources::{AuditStore, LocationSource};
use crate::storage::Config;
use crate::task::Task;

/// Default number of audit records returned by [`FilterEngine::audit_log`].
pub const DEFAULT_AUDIT_HISTORY_LIMIT: usize = 50;

/// One rule's verdict for one task, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub rule_name: String,
    pub priority: i32,
    pub visible: bool,
    pub reason: String,
}

/// Result of filtering a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOutcome {
    /// Tasks every rule let through, in input order
    pub visible: Vec<Task>,
    /// Every (task, rule) verdict, grouped by task in input order
    pub results: Vec<FilterResult>,
}

/// Why a single task is or is not visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityExplanation {
    pub task_id: String,
    pub task_title: String,
    pub context_id: String,
    pub visible: bool,
    pub rules: Vec<RuleEvaluation>,
}

impl VisibilityExplanation {
    /// Rules that hid the task.
    pub fn blocking_rules(&self) -> Vec<&RuleEvaluation> {
        self.rules.iter().filter(|r| !r.visible).collect()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        if self.visible {
            return format!("'{}' is visible: all {} rules passed", self.task_title, self.rules.len());
        }
        let reasons: Vec<String> = self
            .blocking_rules()
            .iter()
            .map(|r| format!("{}: {}", r.rule_name, r.reason))
            .collect();
        format!("'{}' is hidden ({})", self.task_title, reasons.join("; "))
    }
}

/// Registered rule as seen from outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleInfo {
    pub name: String,
    pub priority: i32,
    pub family: Option<FilterFamily>,
    pub enabled: bool,
}

struct RuleSet {
    /// Sorted by descending priority
    rules: Vec<Arc<dyn FilterRule>>,
    flags: FilterFlags,
}

impl RuleSet {
    fn sort(&mut self) {
        self.rules.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.name().cmp(b.name()))
        });
    }

    fn decide(&self, rule: &dyn FilterRule, context: &Context, task: &Task) -> RuleDecision {
        match rule.family() {
            Some(family) if !self.flags.is_enabled(family) => RuleDecision::disabled(),
            _ => rule.apply(context, task),
        }
    }

    fn evaluate(&self, context: &Context, task: &Task) -> Vec<RuleEvaluation> {
        self.rules
            .iter()
            .map(|rule| {
                let decision = self.decide(rule.as_ref(), context, task);
                RuleEvaluation {
                    rule_name: rule.name().to_string(),
                    priority: rule.priority(),
                    visible: decision.visible,
                    reason: decision.reason,
                }
            })
            .collect()
    }

    fn evaluate_batch(&self, context: &Context, tasks: &[Task]) -> Vec<Vec<RuleEvaluation>> {
        tasks
            .par_iter()
            .map(|task| self.evaluate(context, task))
            .collect()
    }
}

/// Context-aware task visibility engine.
pub struct FilterEngine {
    state: RwLock<RuleSet>,
    audit: Arc<dyn AuditStore>,
    audit_history_limit: usize,
}

impl FilterEngine {
    /// Create an engine with no rules.
    pub fn new(audit: Arc<dyn AuditStore>, flags: FilterFlags) -> Self {
        Self {
            state: RwLock::new(RuleSet {
                rules: Vec::new(),
                flags,
            }),
            audit,
            audit_history_limit: DEFAULT_AUDIT_HISTORY_LIMIT,
        }
    }

    /// Create an engine with the five built-in rules registered, taking flags,
    /// focus settings and the audit history bound from `config`.
    pub fn with_default_rules(
        resolver: Arc<DependencyResolver>,
        locations: Arc<dyn LocationSource>,
        audit: Arc<dyn AuditStore>,
        config: &Config,
    ) -> Self {
        let engine = Self::new(audit, config.filters)
            .with_audit_history_limit(config.audit.history_limit);
        engine.add_rule(Arc::new(DependencyRule::new(resolver)));
        engine.add_rule(Arc::new(TimeRule));
        engine.add_rule(Arc::new(LocationRule::new(locations)));
        engine.add_rule(Arc::new(FocusRule::new(
            config.focus.conducive_contexts.clone(),
        )));
        engine.add_rule(Arc::new(EnergyRule));
        engine
    }

    /// Bound on records returned by [`audit_log`](Self::audit_log).
    pub fn with_audit_history_limit(mut self, limit: usize) -> Self {
        self.audit_history_limit = limit;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, RuleSet> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RuleSet> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a rule, replacing any rule with the same name.
    pub fn add_rule(&self, rule: Arc<dyn FilterRule>) {
        let mut set = self.write();
        set.rules.retain(|existing| existing.name() != rule.name());
        info!(rule = rule.name(), priority = rule.priority(), "registered filter rule");
        set.rules.push(rule);
        set.sort();
    }

    /// Unregister a rule by name. Unknown names are ignored.
    pub fn remove_rule(&self, name: &str) {
        let mut set = self.write();
        let before = set.rules.len();
        set.rules.retain(|rule| rule.name() != name);
        if set.rules.len() != before {
            info!(rule = name, "removed filter rule");
        }
    }

    /// Registered rules in evaluation order.
    pub fn rules(&self) -> Vec<RuleInfo> {
        let set = self.read();
        set.rules
            .iter()
            .map(|rule| RuleInfo {
                name: rule.name().to_string(),
                priority: rule.priority(),
                family: rule.family(),
                enabled: rule.family().map_or(true, |f| set.flags.is_enabled(f)),
            })
            .collect()
    }

    pub fn flags(&self) -> FilterFlags {
        self.read().flags
    }

    /// Switch a rule family on.
    pub fn enable_filter(&self, name: &str) -> Result<(), FilterError> {
        self.set_filter(name, true)
    }

    /// Switch a rule family off; its rules then report visible/"disabled".
    pub fn disable_filter(&self, name: &str) -> Result<(), FilterError> {
        self.set_filter(name, false)
    }

    fn set_filter(&self, name: &str, enabled: bool) -> Result<(), FilterError> {
        let family: FilterFamily = name.parse()?;
        self.write().flags.set(family, enabled);
        info!(filter = %family, enabled, "filter toggled");
        Ok(())
    }

    /// Evaluate every task against every rule and persist one audit per task.
    ///
    /// A task is visible iff all rules pass. All rules run for every task so
    /// each reason is available for the audit trail.
    pub fn filter_tasks(&self, context: &Context, tasks: &[Task]) -> FilterOutcome {
        let evaluations = {
            let set = self.read();
            set.evaluate_batch(context, tasks)
        };

        let mut outcome = FilterOutcome::default();
        for (task, evals) in tasks.iter().zip(&evaluations) {
            let audit = FilterAudit::from_evaluations(context, task, evals);
            if let Err(e) = self.audit.record(&audit) {
                warn!(task_id = %task.id, error = %e, "failed to persist filter audit");
            }

            outcome.results.extend(evals.iter().map(|eval| FilterResult {
                task_id: task.id.clone(),
                rule_name: eval.rule_name.clone(),
                visible: eval.visible,
                reason: eval.reason.clone(),
            }));
            if audit.visible {
                outcome.visible.push(task.clone());
            }
        }

        debug!(
            context_id = %context.id,
            total = tasks.len(),
            visible = outcome.visible.len(),
            "filtered tasks"
        );
        outcome
    }

    /// Evaluate one task without persisting anything.
    pub fn explain_task_visibility(&self, context: &Context, task: &Task) -> VisibilityExplanation {
        let rules = self.read().evaluate(context, task);
        VisibilityExplanation {
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            context_id: context.id.clone(),
            visible: rules.iter().all(|r| r.visible),
            rules,
        }
    }

    /// Persisted decisions for a task made for the context's user, most recent first.
    pub fn audit_log(&self, task_id: &str, context: &Context) -> Result<Vec<FilterAudit>> {
        self.audit
            .audits_for_task(task_id, &context.user_id, self.audit_history_limit)
    }

    /// Per-rule pass/fail counts and reason histogram over a batch.
    pub fn filter_stats(&self, context: &Context, tasks: &[Task]) -> FilterStats {
        let evaluations = {
            let set = self.read();
            set.evaluate_batch(context, tasks)
        };
        FilterStats::from_evaluations(&evaluations)
    }

    /// Evaluate one named rule in isolation, honouring its family flag.
    pub fn apply_single_filter(
        &self,
        name: &str,
        context: &Context,
        task: &Task,
    ) -> Result<RuleDecision, FilterError> {
        let set = self.read();
        let rule = set
            .rules
            .iter()
            .find(|rule| rule.name() == name)
            .ok_or_else(|| FilterError::RuleNotFound(name.to_string()))?;
        Ok(set.decide(rule.as_ref(), context, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, StoreError};
    use crate::filter::DISABLED_REASON;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryAudit {
        records: Mutex<Vec<FilterAudit>>,
        fail: bool,
    }

    impl AuditStore for MemoryAudit {
        fn record(&self, audit: &FilterAudit) -> Result<()> {
            if self.fail {
                return Err(CoreError::Store(StoreError::LockPoisoned));
            }
            self.records.lock().unwrap().push(audit.clone());
            Ok(())
        }

        fn audits_for_task(
            &self,
            task_id: &str,
            user_id: &str,
            limit: usize,
        ) -> Result<Vec<FilterAudit>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|a| a.task_id == task_id && a.user_id == user_id)
                .take(limit)
                .cloned()
                .collect())
        }

        fn audits_for_user_since(
            &self,
            user_id: &str,
            since: DateTime<Utc>,
            limit: usize,
        ) -> Result<Vec<FilterAudit>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|a| a.user_id == user_id && a.created_at >= since)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    /// Hides tasks whose title contains a word.
    struct TitleRule {
        name: &'static str,
        priority: i32,
        word: &'static str,
    }

    impl FilterRule for TitleRule {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn apply(&self, _context: &Context, task: &Task) -> RuleDecision {
            if task.title.contains(self.word) {
                RuleDecision::hidden(format!("title mentions {}", self.word))
            } else {
                RuleDecision::visible("title ok")
            }
        }
    }

    fn title_rule(name: &'static str, priority: i32, word: &'static str) -> Arc<dyn FilterRule> {
        Arc::new(TitleRule {
            name,
            priority,
            word,
        })
    }

    fn engine(audit: Arc<MemoryAudit>) -> FilterEngine {
        FilterEngine::new(audit, FilterFlags::all())
    }

    fn ctx() -> Context {
        Context::new("u1", Utc::now()).with_available_minutes(10)
    }

    fn task(title: &str, minutes: u32) -> Task {
        Task::new(title, "u1").unwrap().with_estimated_minutes(minutes)
    }

    #[test]
    fn rules_sorted_by_descending_priority() {
        let engine = engine(Arc::default());
        engine.add_rule(title_rule("low", 1, "x"));
        engine.add_rule(title_rule("high", 50, "y"));
        engine.add_rule(Arc::new(TimeRule));
        let names: Vec<String> = engine.rules().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["time", "high", "low"]);
    }

    #[test]
    fn add_rule_replaces_same_name() {
        let engine = engine(Arc::default());
        engine.add_rule(title_rule("words", 5, "secret"));
        engine.add_rule(title_rule("words", 5, "draft"));
        assert_eq!(engine.rules().len(), 1);

        let t = task("secret plan", 1);
        assert!(engine.apply_single_filter("words", &ctx(), &t).unwrap().visible);
    }

    #[test]
    fn remove_rule_ignores_unknown() {
        let engine = engine(Arc::default());
        engine.add_rule(Arc::new(TimeRule));
        engine.remove_rule("nope");
        assert_eq!(engine.rules().len(), 1);
        engine.remove_rule("time");
        assert!(engine.rules().is_empty());
    }

    #[test]
    fn visible_only_when_all_rules_pass() {
        let audit = Arc::new(MemoryAudit::default());
        let engine = engine(audit.clone());
        engine.add_rule(Arc::new(TimeRule));
        engine.add_rule(title_rule("words", 5, "later"));

        let tasks = vec![task("quick", 5), task("long", 30), task("quick later", 5)];
        let outcome = engine.filter_tasks(&ctx(), &tasks);

        let titles: Vec<&str> = outcome.visible.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["quick"]);
        assert_eq!(outcome.results.len(), 6);
        assert_eq!(outcome.results[0].rule_name, "time");
        assert_eq!(outcome.results[1].rule_name, "words");
        assert_eq!(audit.records.lock().unwrap().len(), 3);
    }

    #[test]
    fn audit_failure_does_not_block_filtering() {
        let audit = Arc::new(MemoryAudit {
            fail: true,
            ..Default::default()
        });
        let engine = engine(audit);
        engine.add_rule(Arc::new(TimeRule));
        let outcome = engine.filter_tasks(&ctx(), &[task("quick", 5)]);
        assert_eq!(outcome.visible.len(), 1);
    }

    #[test]
    fn disabled_family_reports_disabled() {
        let engine = engine(Arc::default());
        engine.add_rule(Arc::new(TimeRule));
        engine.disable_filter("time").unwrap();

        let long = task("long", 300);
        let decision = engine.apply_single_filter("time", &ctx(), &long).unwrap();
        assert_eq!(decision, RuleDecision::visible(DISABLED_REASON));
        assert_eq!(engine.filter_tasks(&ctx(), &[long.clone()]).visible.len(), 1);

        engine.enable_filter("time").unwrap();
        assert!(!engine.apply_single_filter("time", &ctx(), &long).unwrap().visible);
        assert!(engine.rules()[0].enabled);
    }

    #[test]
    fn unknown_names_are_errors() {
        let engine = engine(Arc::default());
        assert_eq!(
            engine.disable_filter("mood").unwrap_err(),
            FilterError::UnknownFilter("mood".to_string())
        );
        assert_eq!(
            engine
                .apply_single_filter("time", &ctx(), &task("t", 1))
                .unwrap_err(),
            FilterError::RuleNotFound("time".to_string())
        );
    }

    #[test]
    fn explain_does_not_write_audits() {
        let audit = Arc::new(MemoryAudit::default());
        let engine = engine(audit.clone());
        engine.add_rule(Arc::new(TimeRule));
        let explanation = engine.explain_task_visibility(&ctx(), &task("long", 30));
        assert!(!explanation.visible);
        assert_eq!(explanation.blocking_rules().len(), 1);
        assert!(explanation.summary().contains("time: needs 30 minutes"));
        assert!(audit.records.lock().unwrap().is_empty());
    }

    #[test]
    fn audit_log_is_scoped_to_user_and_bounded() {
        let audit = Arc::new(MemoryAudit::default());
        let engine = engine(audit).with_audit_history_limit(2);
        engine.add_rule(Arc::new(TimeRule));
        let t = task("quick", 5);
        for _ in 0..3 {
            engine.filter_tasks(&ctx(), std::slice::from_ref(&t));
        }
        // u2's evaluations are the most recent; they must not crowd out u1's
        let other = Context::new("u2", Utc::now());
        for _ in 0..2 {
            engine.filter_tasks(&other, std::slice::from_ref(&t));
        }

        let log = engine.audit_log(&t.id, &ctx()).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|a| a.user_id == "u1"));

        let log = engine.audit_log(&t.id, &other).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|a| a.user_id == "u2"));
    }

    #[test]
    fn stats_count_per_rule() {
        let engine = engine(Arc::default());
        engine.add_rule(Arc::new(TimeRule));
        let stats = engine.filter_stats(&ctx(), &[task("a", 5), task("b", 30), task("c", 60)]);
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.visible_tasks, 1);
        let time = &stats.rules["time"];
        assert_eq!((time.visible, time.hidden), (1, 2));
        assert_eq!(stats.most_restrictive(), Some("time"));
    }
}
