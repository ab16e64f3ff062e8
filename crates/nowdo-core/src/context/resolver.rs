//! Derives a fresh [`Context`] from raw situational input.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Context, EnergyLevel, SocialContext, TrafficLevel, WeatherCondition};
use crate::availability::AvailabilityCalculator;
use crate::geo::{self, Coordinates};
use crate::location::{Location, MAX_RADIUS_METERS};
use crate::sources::LocationSource;

/// Raw input for a context refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextUpdate {
    pub user_id: String,
    /// Defaults to now
    pub timestamp: Option<DateTime<Utc>>,
    pub position: Option<Coordinates>,
    /// Overrides location derivation from `position`
    pub location_id: Option<String>,
    /// Overrides calendar-derived availability
    pub available_minutes: Option<u32>,
    pub social_context: SocialContext,
    pub energy: EnergyLevel,
    pub weather: Option<WeatherCondition>,
    pub traffic: Option<TrafficLevel>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ContextUpdate {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

/// Builds contexts by computing availability and the current named location.
pub struct ContextResolver {
    availability: AvailabilityCalculator,
    locations: Arc<dyn LocationSource>,
}

impl ContextResolver {
    pub fn new(availability: AvailabilityCalculator, locations: Arc<dyn LocationSource>) -> Self {
        Self {
            availability,
            locations,
        }
    }

    pub fn availability(&self) -> &AvailabilityCalculator {
        &self.availability
    }

    /// Produce a new context snapshot. Each call yields a new context id.
    pub fn resolve(&self, update: ContextUpdate) -> Context {
        let timestamp = update.timestamp.unwrap_or_else(Utc::now);

        let available_minutes = update
            .available_minutes
            .unwrap_or_else(|| self.availability.compute(&update.user_id, timestamp));

        let current_location_id = update.location_id.clone().or_else(|| {
            update
                .position
                .and_then(|point| self.current_location(&update.user_id, point))
                .map(|loc| loc.id)
        });

        debug!(
            user_id = %update.user_id,
            available_minutes,
            location = ?current_location_id,
            "resolved context"
        );

        Context {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: update.user_id,
            timestamp,
            position: update.position,
            current_location_id,
            available_minutes,
            social_context: update.social_context,
            energy: update.energy,
            weather: update.weather,
            traffic: update.traffic,
            metadata: update.metadata,
        }
    }

    /// Nearest of the user's locations whose radius contains `point`.
    pub fn current_location(&self, user_id: &str, point: Coordinates) -> Option<Location> {
        // A containing location's center is at most the largest legal radius away.
        let candidates = match self.locations.locations_within(point, MAX_RADIUS_METERS) {
            Ok(found) => found,
            Err(e) => {
                warn!(user_id, error = %e, "location proximity search failed");
                return None;
            }
        };

        candidates
            .into_iter()
            .filter(|loc| loc.user_id == user_id && geo::within_radius(&point, loc))
            .min_by(|a, b| a.distance_from(&point).total_cmp(&b.distance_from(&point)))
    }
}
