//! Named places used for location-aware filtering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::Coordinates;

/// Largest radius a location may declare.
pub const MAX_RADIUS_METERS: f64 = 10_000.0;

/// A named place owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub center: Coordinates,
    /// Containment radius, 0 < radius <= 10000.
    pub radius_meters: f64,
    pub created_at: DateTime<Utc>,
}

impl Location {
    /// Create a location with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        center: Coordinates,
        radius_meters: f64,
    ) -> Result<Self, ValidationError> {
        validate_radius(radius_meters)?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".to_string(),
                message: "location name must not be empty".to_string(),
            });
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name,
            center,
            radius_meters,
            created_at: Utc::now(),
        })
    }

    /// Distance from the location's center to `point`, in meters.
    pub fn distance_from(&self, point: &Coordinates) -> f64 {
        self.center.distance_to(point)
    }
}

/// Check that a radius lies in (0, 10000].
pub fn validate_radius(radius_meters: f64) -> Result<(), ValidationError> {
    if radius_meters > 0.0 && radius_meters <= MAX_RADIUS_METERS {
        Ok(())
    } else {
        Err(ValidationError::RadiusOutOfRange(radius_meters))
    }
}
