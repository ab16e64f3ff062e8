//! Subcommands and the plumbing they share.

pub mod config;
pub mod context;
pub mod event;
pub mod filter;
pub mod location;
pub mod rule;
pub mod task;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use nowdo_core::{
    AvailabilityCalculator, Config, Context, ContextResolver, ContextUpdate, Coordinates,
    DependencyResolver, EnergyLevel, FilterEngine, SocialContext, SqliteStore, TrafficLevel,
    WeatherCondition,
};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// User assumed when `--user` is omitted.
pub const DEFAULT_USER: &str = "me";

/// Flags describing the user's current situation.
#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    /// User whose context this is
    #[arg(long, default_value = DEFAULT_USER)]
    pub user: String,
    /// Latitude of the current position
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    /// Longitude of the current position
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
    /// Id of the named location the user is at
    #[arg(long)]
    pub location: Option<String>,
    /// Free minutes (computed from the calendar when omitted)
    #[arg(long)]
    pub minutes: Option<u32>,
    /// alone, with_family, at_work, in_public, driving
    #[arg(long, default_value = "alone")]
    pub social: SocialContext,
    /// Energy level 1-5
    #[arg(long, default_value_t = 3)]
    pub energy: u8,
    /// clear, cloudy, rain, snow, storm, fog
    #[arg(long)]
    pub weather: Option<WeatherCondition>,
    /// light, moderate, heavy
    #[arg(long)]
    pub traffic: Option<TrafficLevel>,
    /// Instant to evaluate at, RFC 3339 (default: now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
    /// Extra context metadata as key=value (repeatable)
    #[arg(long = "meta")]
    pub metadata: Vec<String>,
}

impl ContextArgs {
    fn to_update(&self) -> Result<ContextUpdate, Box<dyn std::error::Error>> {
        let position = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::checked(lat, lon)?),
            _ => None,
        };

        let mut update = ContextUpdate::new(self.user.clone());
        update.timestamp = self.at;
        update.position = position;
        update.location_id = self.location.clone();
        update.available_minutes = self.minutes;
        update.social_context = self.social;
        update.energy = EnergyLevel::new(self.energy)?;
        update.weather = self.weather;
        update.traffic = self.traffic;
        update.metadata = parse_metadata(&self.metadata);
        Ok(update)
    }
}

/// Parse `key=value` pairs; values that are valid JSON keep their type.
pub fn parse_metadata(pairs: &[String]) -> HashMap<String, serde_json::Value> {
    pairs
        .iter()
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            (key.trim().to_string(), value)
        })
        .collect()
}

/// Store, configuration and resolvers opened once per invocation.
pub struct Runtime {
    pub store: Arc<SqliteStore>,
    pub config: Config,
    pub dependencies: Arc<DependencyResolver>,
}

impl Runtime {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let store = Arc::new(SqliteStore::open()?);
        let dependencies = Arc::new(DependencyResolver::new(store.clone(), store.clone()));
        Ok(Self {
            store,
            config,
            dependencies,
        })
    }

    pub fn engine(&self) -> FilterEngine {
        FilterEngine::with_default_rules(
            self.dependencies.clone(),
            self.store.clone(),
            self.store.clone(),
            &self.config,
        )
    }

    pub fn context_resolver(&self) -> ContextResolver {
        let availability = AvailabilityCalculator::new(self.store.clone())
            .with_offset_minutes(self.config.availability.utc_offset_minutes);
        ContextResolver::new(availability, self.store.clone())
    }

    /// Resolve a context from flags and append it to the user's history.
    pub fn context(&self, args: &ContextArgs) -> Result<Context, Box<dyn std::error::Error>> {
        let context = self.context_resolver().resolve(args.to_update()?);
        self.store.insert_context(&context)?;
        Ok(context)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_pairs_keep_json_types() {
        let meta = parse_metadata(&[
            "mood=happy".to_string(),
            "count=3".to_string(),
            "broken".to_string(),
        ]);
        assert_eq!(meta["mood"], "happy");
        assert_eq!(meta["count"], 3);
        assert_eq!(meta.len(), 2);
    }
}
