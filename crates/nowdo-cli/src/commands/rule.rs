use clap::Subcommand;
use nowdo_core::TaskSource;
use serde_json::json;

use super::{print_json, CliResult, ContextArgs, Runtime};

#[derive(Subcommand)]
pub enum RuleAction {
    /// Registered rules in evaluation order
    List,
    /// Evaluate one rule against one task
    Test {
        /// Rule name
        name: String,
        /// Task ID
        task: String,
        #[command(flatten)]
        context: ContextArgs,
    },
}

pub fn run(action: RuleAction) -> CliResult {
    let rt = Runtime::open()?;
    let engine = rt.engine();

    match action {
        RuleAction::List => print_json(&engine.rules()),
        RuleAction::Test {
            name,
            task,
            context,
        } => {
            let task = rt
                .store
                .task(&task)?
                .ok_or_else(|| format!("task not found: {task}"))?;
            let context = rt.context(&context)?;
            let decision = engine.apply_single_filter(&name, &context, &task)?;
            print_json(&json!({
                "rule": name,
                "task_id": task.id,
                "visible": decision.visible,
                "reason": decision.reason,
            }))
        }
    }
}
