//! Visibility commands: filter, explain, stats, audit.

use chrono::{DateTime, Duration, Utc};
use clap::Args;
use nowdo_core::{AuditStore, Context, TaskSource};
use serde_json::json;

use super::{print_json, CliResult, ContextArgs, Runtime, DEFAULT_USER};

#[derive(Args)]
pub struct FilterArgs {
    #[command(flatten)]
    pub context: ContextArgs,
    /// Also evaluate completed and cancelled tasks
    #[arg(long)]
    pub all: bool,
    /// Print every rule verdict, not just the visible tasks
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Task ID
    pub task: String,
    #[command(flatten)]
    pub context: ContextArgs,
}

#[derive(Args)]
pub struct AuditArgs {
    /// Task ID; omit to list the user's recent decisions
    pub task: Option<String>,
    #[arg(long, default_value = DEFAULT_USER)]
    pub user: String,
    /// Earliest decision to include when listing by user, RFC 3339 (default: 24h ago)
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,
}

pub fn filter(args: FilterArgs) -> CliResult {
    let rt = Runtime::open()?;
    let context = rt.context(&args.context)?;
    let tasks = rt.store.tasks_for_user(&context.user_id, args.all)?;
    let outcome = rt.engine().filter_tasks(&context, &tasks);

    if args.verbose {
        print_json(&json!({
            "context_id": context.id,
            "visible": outcome.visible,
            "results": outcome.results,
        }))
    } else {
        print_json(&outcome.visible)
    }
}

pub fn explain(args: ExplainArgs) -> CliResult {
    let rt = Runtime::open()?;
    let task = rt
        .store
        .task(&args.task)?
        .ok_or_else(|| format!("task not found: {}", args.task))?;
    let context = rt.context(&args.context)?;
    let explanation = rt.engine().explain_task_visibility(&context, &task);

    print_json(&json!({
        "summary": explanation.summary(),
        "explanation": explanation,
    }))
}

pub fn stats(args: FilterArgs) -> CliResult {
    let rt = Runtime::open()?;
    let context = rt.context(&args.context)?;
    let tasks = rt.store.tasks_for_user(&context.user_id, args.all)?;
    let stats = rt.engine().filter_stats(&context, &tasks);

    print_json(&json!({
        "most_restrictive": stats.most_restrictive(),
        "stats": stats,
    }))
}

pub fn audit(args: AuditArgs) -> CliResult {
    let rt = Runtime::open()?;
    let limit = rt.config.audit.history_limit;

    let records = match args.task {
        Some(task_id) => {
            let context = Context::new(args.user, Utc::now());
            rt.engine().audit_log(&task_id, &context)?
        }
        None => {
            let since = args.since.unwrap_or_else(|| Utc::now() - Duration::hours(24));
            rt.store.audits_for_user_since(&args.user, since, limit)?
        }
    };
    print_json(&records)
}
