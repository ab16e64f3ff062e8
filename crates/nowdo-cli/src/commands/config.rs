use clap::Subcommand;
use nowdo_core::Config;
use serde_json::json;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "filters.energy", "audit.history_limit")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Switch a filter family on (dependency, time, location, focus, energy)
    Enable {
        /// Filter family name
        name: String,
    },
    /// Switch a filter family off
    Disable {
        /// Filter family name
        name: String,
    },
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            print_json(&config.entries())?;
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Enable { name } => toggle(&name, true)?,
        ConfigAction::Disable { name } => toggle(&name, false)?,
    }
    Ok(())
}

fn toggle(name: &str, enabled: bool) -> CliResult {
    let mut config = Config::load()?;
    let family = config.set_filter_enabled(name, enabled)?;
    config.save()?;
    print_json(&json!({ "filter": family, "enabled": enabled }))
}
