//! Hides demanding tasks when the user's energy is too low for them.

use super::ENERGY_PRIORITY;
use crate::context::Context;
use crate::filter::{FilterFamily, FilterRule, RuleDecision};
use crate::task::Task;

#[derive(Debug, Default, Clone, Copy)]
pub struct EnergyRule;

impl EnergyRule {
    pub const NAME: &'static str = "energy";
}

impl FilterRule for EnergyRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        ENERGY_PRIORITY
    }

    fn family(&self) -> Option<FilterFamily> {
        Some(FilterFamily::Energy)
    }

    fn apply(&self, context: &Context, task: &Task) -> RuleDecision {
        let floor = task.effort_floor();
        let energy = context.energy.value();

        if floor <= energy {
            RuleDecision::visible(format!("energy {energy} meets effort level {floor}"))
        } else {
            RuleDecision::hidden(format!("needs energy {floor}, current energy is {energy}"))
        }
    }
}
