//! Point-in-time snapshots of a user's situation.
//!
//! A [`Context`] is never mutated after it has been handed to the filter
//! engine; a location change or periodic refresh produces a new one through
//! [`ContextResolver`]. Superseded snapshots are kept as history.

pub mod resolver;

pub use resolver::{ContextResolver, ContextUpdate};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::geo::Coordinates;

/// Social setting the user is currently in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SocialContext {
    #[default]
    Alone,
    WithFamily,
    AtWork,
    InPublic,
    Driving,
}

impl SocialContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialContext::Alone => "alone",
            SocialContext::WithFamily => "with_family",
            SocialContext::AtWork => "at_work",
            SocialContext::InPublic => "in_public",
            SocialContext::Driving => "driving",
        }
    }
}

impl fmt::Display for SocialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocialContext {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "alone" => Ok(SocialContext::Alone),
            "with_family" => Ok(SocialContext::WithFamily),
            "at_work" => Ok(SocialContext::AtWork),
            "in_public" => Ok(SocialContext::InPublic),
            "driving" => Ok(SocialContext::Driving),
            other => Err(ValidationError::InvalidValue {
                field: "social_context".to_string(),
                message: format!("unknown social context '{other}'"),
            }),
        }
    }
}

/// Energy level on a 1-5 scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct EnergyLevel(u8);

impl EnergyLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::EnergyOutOfRange(value as i64))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for EnergyLevel {
    fn default() -> Self {
        EnergyLevel(3)
    }
}

impl TryFrom<u8> for EnergyLevel {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        EnergyLevel::new(value)
    }
}

impl From<EnergyLevel> for u8 {
    fn from(level: EnergyLevel) -> Self {
        level.0
    }
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current weather.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Storm,
    Fog,
}

impl WeatherCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Storm => "storm",
            WeatherCondition::Fog => "fog",
        }
    }
}

impl FromStr for WeatherCondition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(WeatherCondition::Clear),
            "cloudy" => Ok(WeatherCondition::Cloudy),
            "rain" => Ok(WeatherCondition::Rain),
            "snow" => Ok(WeatherCondition::Snow),
            "storm" => Ok(WeatherCondition::Storm),
            "fog" => Ok(WeatherCondition::Fog),
            other => Err(ValidationError::InvalidValue {
                field: "weather".to_string(),
                message: format!("unknown weather condition '{other}'"),
            }),
        }
    }
}

/// Current traffic level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLevel {
    Light,
    Moderate,
    Heavy,
}

impl TrafficLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficLevel::Light => "light",
            TrafficLevel::Moderate => "moderate",
            TrafficLevel::Heavy => "heavy",
        }
    }
}

impl FromStr for TrafficLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(TrafficLevel::Light),
            "moderate" => Ok(TrafficLevel::Moderate),
            "heavy" => Ok(TrafficLevel::Heavy),
            other => Err(ValidationError::InvalidValue {
                field: "traffic".to_string(),
                message: format!("unknown traffic level '{other}'"),
            }),
        }
    }
}

/// Snapshot of a user's situation at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    /// Raw position; latitude and longitude are present together or not at all
    pub position: Option<Coordinates>,
    /// Named location the user is currently at
    pub current_location_id: Option<String>,
    /// Contiguous free minutes from `timestamp`
    pub available_minutes: u32,
    pub social_context: SocialContext,
    pub energy: EnergyLevel,
    pub weather: Option<WeatherCondition>,
    pub traffic: Option<TrafficLevel>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Context {
    /// Create a context with no position, zero free minutes, alone, energy 3.
    pub fn new(user_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            timestamp,
            position: None,
            current_location_id: None,
            available_minutes: 0,
            social_context: SocialContext::Alone,
            energy: EnergyLevel::default(),
            weather: None,
            traffic: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_position(mut self, position: Coordinates) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.current_location_id = Some(location_id.into());
        self
    }

    pub fn with_available_minutes(mut self, minutes: u32) -> Self {
        self.available_minutes = minutes;
        self
    }

    pub fn with_social_context(mut self, social: SocialContext) -> Self {
        self.social_context = social;
        self
    }

    pub fn with_energy(mut self, energy: EnergyLevel) -> Self {
        self.energy = energy;
        self
    }
}
