//! Keeps focus-heavy tasks out of distracting social settings.

use super::FOCUS_PRIORITY;
use crate::context::{Context, SocialContext};
use crate::filter::{FilterFamily, FilterRule, RuleDecision};
use crate::task::Task;

pub struct FocusRule {
    conducive: Vec<SocialContext>,
}

impl FocusRule {
    pub const NAME: &'static str = "focus";

    /// Focus tasks are visible only in the given social settings.
    pub fn new(conducive: Vec<SocialContext>) -> Self {
        Self { conducive }
    }
}

impl Default for FocusRule {
    fn default() -> Self {
        Self::new(vec![SocialContext::Alone])
    }
}

impl FilterRule for FocusRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        FOCUS_PRIORITY
    }

    fn family(&self) -> Option<FilterFamily> {
        Some(FilterFamily::Focus)
    }

    fn apply(&self, context: &Context, task: &Task) -> RuleDecision {
        if !task.requires_focus {
            return RuleDecision::visible("does not require focus");
        }

        let social = context.social_context;
        if self.conducive.contains(&social) {
            RuleDecision::visible(format!("focus possible while {social}"))
        } else {
            RuleDecision::hidden(format!("requires focus, not possible while {social}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn focus_tasks_need_solitude_by_default() {
        let task = Task::new("Write thesis", "u1").unwrap().requiring_focus();
        let rule = FocusRule::default();

        let alone = Context::new("u1", Utc::now());
        assert!(rule.apply(&alone, &task).visible);

        let driving = Context::new("u1", Utc::now()).with_social_context(SocialContext::Driving);
        let decision = rule.apply(&driving, &task);
        assert!(!decision.visible);
        assert_eq!(decision.reason, "requires focus, not possible while driving");
    }

    #[test]
    fn ordinary_tasks_ignore_social_setting() {
        let task = Task::new("Buy milk", "u1").unwrap();
        let ctx = Context::new("u1", Utc::now()).with_social_context(SocialContext::InPublic);
        assert!(FocusRule::default().apply(&ctx, &task).visible);
    }

    #[test]
    fn conducive_settings_are_configurable() {
        let task = Task::new("Review PR", "u1").unwrap().requiring_focus();
        let rule = FocusRule::new(vec![SocialContext::Alone, SocialContext::AtWork]);
        let ctx = Context::new("u1", Utc::now()).with_social_context(SocialContext::AtWork);
        assert!(rule.apply(&ctx, &task).visible);
    }
}
