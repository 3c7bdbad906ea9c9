//! Request-side data shapes for the generate endpoints.
//!
//! Mirrors the Open-Meteo daily forecast payload, extended with the fields the
//! map service needs (`capital`, `name`, `display_name`, `priority`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::services::variant::MapVariant;

/// Units for the daily arrays. Accepted for compatibility, never rendered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DailyUnits {
    pub time: Option<String>,
    pub weather_code: Option<String>,
    pub temperature_2m_max: Option<String>,
    pub temperature_2m_min: Option<String>,
    pub precipitation_sum: Option<String>,
    pub wind_speed_10m_max: Option<String>,
    pub cloud_cover_min: Option<String>,
    pub cloud_cover_max: Option<String>,
}

/// Daily forecast arrays, one entry per calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyData {
    /// ISO dates (e.g. "2026-10-18")
    pub time: Vec<String>,
    /// WMO weather interpretation codes
    pub weather_code: Vec<i32>,
    /// Maximum temperature in °C
    pub temperature_2m_max: Vec<f64>,
    /// Minimum temperature in °C
    pub temperature_2m_min: Vec<f64>,
    /// Precipitation total in mm
    pub precipitation_sum: Vec<f64>,
    /// Maximum wind speed at 10 m in km/h
    pub wind_speed_10m_max: Vec<f64>,
    /// Minimum cloud cover in %
    pub cloud_cover_min: Option<Vec<i32>>,
    /// Maximum cloud cover in %
    pub cloud_cover_max: Option<Vec<i32>>,
}

/// Weather data for one named location.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeteoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub generationtime_ms: Option<f64>,
    pub utc_offset_seconds: Option<i32>,
    pub timezone: Option<String>,
    pub timezone_abbreviation: Option<String>,
    pub elevation: Option<f64>,
    pub daily_units: Option<DailyUnits>,
    pub daily: DailyData,
    pub id: Option<String>,
    /// Country code of the map to draw on (e.g. "dz" for Algeria)
    pub capital: Option<String>,
    pub name: String,
    /// Longer label text; wins over `name` when present
    pub display_name: Option<String>,
    /// 1 = most important. Controls label size, offset and draw order.
    #[serde(default = "default_priority")]
    pub priority: Option<i32>,
}

fn default_priority() -> Option<i32> {
    Some(1)
}

impl MeteoLocation {
    /// The non-empty country code carried by this location, if any.
    pub fn country_code(&self) -> Option<&str> {
        self.capital
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// Request body for `POST /generate`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub meteo_data: Vec<MeteoLocation>,
    /// Overrides the derived variant-and-date title
    pub title: Option<String>,
    /// Which forecast day to display (0 = first day)
    pub day_index: Option<usize>,
    /// Map variant: general, maxtemp, mintemp, wind or sun. Unknown names draw the general map.
    pub variant: Option<MapVariant>,
}

/// Validation failures while normalising a locations body.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Data must be a list of weather locations")]
    NotAList,
    #[error("No meteo data provided")]
    Empty,
    #[error("Invalid weather location: {0}")]
    InvalidLocation(serde_json::Error),
}

/// The three body shapes accepted by `/generate/raw` and `/generate/all`.
#[derive(Debug)]
pub enum LocationsPayload {
    /// The body itself is the locations array.
    Raw(Value),
    /// `{"json": "<array encoded as a string>"}`
    WrappedString(String),
    /// `{"json": <array>}`
    WrappedValue(Value),
}

impl LocationsPayload {
    pub fn from_body(body: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(body)?;
        Ok(match value {
            Value::Object(mut map) => match map.remove("json") {
                Some(Value::String(encoded)) => Self::WrappedString(encoded),
                Some(inner) => Self::WrappedValue(inner),
                None => Self::Raw(Value::Object(map)),
            },
            other => Self::Raw(other),
        })
    }

    /// Resolve to a non-empty list of typed locations.
    pub fn into_locations(self) -> Result<Vec<MeteoLocation>, PayloadError> {
        let value = match self {
            Self::Raw(value) | Self::WrappedValue(value) => value,
            Self::WrappedString(encoded) => serde_json::from_str(&encoded)?,
        };

        let items = match value {
            Value::Array(items) => items,
            _ => return Err(PayloadError::NotAList),
        };
        if items.is_empty() {
            return Err(PayloadError::Empty);
        }

        items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(PayloadError::InvalidLocation))
            .collect()
    }
}
