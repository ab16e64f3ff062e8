//! Hides tasks that do not fit in the time the user has right now.

use super::TIME_PRIORITY;
use crate::context::Context;
use crate::filter::{FilterFamily, FilterRule, RuleDecision};
use crate::task::Task;

#[derive(Debug, Default, Clone, Copy)]
pub struct TimeRule;

impl TimeRule {
    pub const NAME: &'static str = "time";
}

impl FilterRule for TimeRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        TIME_PRIORITY
    }

    fn family(&self) -> Option<FilterFamily> {
        Some(FilterFamily::Time)
    }

    fn apply(&self, context: &Context, task: &Task) -> RuleDecision {
        let Some(needed) = task.estimated_minutes else {
            return RuleDecision::visible("no time estimate");
        };
        let available = context.available_minutes;

        if available >= needed {
            RuleDecision::visible(format!(
                "fits in available time ({needed} of {available} minutes)"
            ))
        } else {
            RuleDecision::hidden(format!(
                "needs {needed} minutes, only {available} available"
            ))
        }
    }
}
