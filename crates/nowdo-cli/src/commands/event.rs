use chrono::{DateTime, Utc};
use clap::Subcommand;
use nowdo_core::CalendarEvent;

use super::{print_json, CliResult, Runtime, DEFAULT_USER};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add a calendar event
    Add {
        /// Event title
        title: String,
        /// Start time, RFC 3339
        #[arg(long)]
        start: DateTime<Utc>,
        /// End time, RFC 3339
        #[arg(long)]
        end: DateTime<Utc>,
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
    },
    /// List a user's events by start time
    List {
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
    },
}

pub fn run(action: EventAction) -> CliResult {
    let rt = Runtime::open()?;

    match action {
        EventAction::Add {
            title,
            start,
            end,
            user,
        } => {
            if end <= start {
                return Err(format!("event must end after it starts ({start} >= {end})").into());
            }
            let event = CalendarEvent::new(user, title, start, end);
            rt.store.insert_event(&event)?;
            print_json(&event)?;
        }
        EventAction::List { user } => {
            print_json(&rt.store.events_for_user(&user)?)?;
        }
    }
    Ok(())
}
