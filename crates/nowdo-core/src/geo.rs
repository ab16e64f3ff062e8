//! Great-circle geometry for location proximity tests.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::location::Location;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude on the sphere above.
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// A latitude/longitude pair in decimal degrees.
///
/// Contexts carry `Option<Coordinates>`, so a latitude can never be present
/// without its longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Create coordinates without range checks.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create coordinates, rejecting values outside [-90, 90] x [-180, 180].
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self::new(latitude, longitude))
    }

    /// Distance in meters to another point.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Haversine great-circle distance in meters.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Whether `point` lies inside the location's radius (boundary inclusive).
pub fn within_radius(point: &Coordinates, location: &Location) -> bool {
    point.distance_to(&location.center) <= location.radius_meters
}

/// Latitude/longitude deltas of a box enclosing a circle of `meters` around `center`.
///
/// Used as a cheap SQL prefilter before the exact haversine check.
pub fn bounding_deltas(center: &Coordinates, meters: f64) -> (f64, f64) {
    let d_lat = meters / METERS_PER_DEGREE;
    let cos_lat = center.latitude.to_radians().cos().abs().max(1e-6);
    let d_lon = (d_lat / cos_lat).min(180.0);
    (d_lat, d_lon)
}
