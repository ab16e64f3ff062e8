use clap::Subcommand;
use nowdo_core::{Coordinates, Location, LocationSource};
use serde_json::json;

use super::{print_json, CliResult, Runtime, DEFAULT_USER};

#[derive(Subcommand)]
pub enum LocationAction {
    /// Register a named location
    Add {
        /// Display name
        name: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Containment radius in meters (0 < radius <= 10000)
        #[arg(long, default_value_t = 100.0)]
        radius: f64,
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
    },
    /// List a user's locations
    List {
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
    },
    /// Locations near a point, nearest first
    Near {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Search radius in meters
        #[arg(long, default_value_t = 1000.0)]
        meters: f64,
    },
}

pub fn run(action: LocationAction) -> CliResult {
    let rt = Runtime::open()?;

    match action {
        LocationAction::Add {
            name,
            lat,
            lon,
            radius,
            user,
        } => {
            let center = Coordinates::checked(lat, lon)?;
            let location = Location::new(user, name, center, radius)?;
            rt.store.insert_location(&location)?;
            print_json(&location)?;
        }
        LocationAction::List { user } => {
            print_json(&rt.store.locations_for_user(&user)?)?;
        }
        LocationAction::Near { lat, lon, meters } => {
            let point = Coordinates::checked(lat, lon)?;
            let found: Vec<_> = rt
                .store
                .locations_within(point, meters)?
                .into_iter()
                .map(|loc| {
                    let distance = loc.distance_from(&point).round();
                    json!({ "distance_meters": distance, "location": loc })
                })
                .collect();
            print_json(&found)?;
        }
    }
    Ok(())
}
