use clap::Subcommand;

use super::{print_json, CliResult, ContextArgs, Runtime, DEFAULT_USER};

#[derive(Subcommand)]
pub enum ContextAction {
    /// Derive a context from flags, record it, and print it
    Show {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Most recently recorded context for a user
    Last {
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
    },
}

pub fn run(action: ContextAction) -> CliResult {
    let rt = Runtime::open()?;

    match action {
        ContextAction::Show { context } => {
            let context = rt.context(&context)?;
            print_json(&context)?;
        }
        ContextAction::Last { user } => {
            let context = rt
                .store
                .latest_context(&user)?
                .ok_or_else(|| format!("no context recorded for {user}"))?;
            print_json(&context)?;
        }
    }
    Ok(())
}
