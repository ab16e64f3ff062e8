use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "nowdo", version, about = "Show the tasks you can actually do right now")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management and dependency graph
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Named locations
    Location {
        #[command(subcommand)]
        action: commands::location::LocationAction,
    },
    /// Calendar events used for availability
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Build and inspect context snapshots
    Context {
        #[command(subcommand)]
        action: commands::context::ContextAction,
    },
    /// List the tasks visible in a context
    Filter(commands::filter::FilterArgs),
    /// Explain why one task is visible or hidden
    Explain(commands::filter::ExplainArgs),
    /// Per-rule statistics over the user's open tasks
    Stats(commands::filter::FilterArgs),
    /// Past visibility decisions
    Audit(commands::filter::AuditArgs),
    /// Filter rule introspection
    Rule {
        #[command(subcommand)]
        action: commands::rule::RuleAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print a shell completion script
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Logs go to stderr so stdout stays valid JSON. Level comes from `NOWDO_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("NOWDO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action),
        Commands::Location { action } => commands::location::run(action),
        Commands::Event { action } => commands::event::run(action),
        Commands::Context { action } => commands::context::run(action),
        Commands::Filter(args) => commands::filter::filter(args),
        Commands::Explain(args) => commands::filter::explain(args),
        Commands::Stats(args) => commands::filter::stats(args),
        Commands::Audit(args) => commands::filter::audit(args),
        Commands::Rule { action } => commands::rule::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "nowdo", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
