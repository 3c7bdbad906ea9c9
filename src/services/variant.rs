//! Map variants and their per-variant styling.
//!
//! Each variant owns one [`VariantStyle`] entry: how a marker is colored, how
//! a label reads, which title prefix the map gets, and the persisted file
//! name. Nothing outside this module matches on variant names.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::helpers::format_reading;
use crate::services::canvas::Color;
use crate::services::icons::{weather_icon, UNKNOWN_ICON};
use crate::services::location::DayValues;

const HOT: Color = Color::hex(0xff5722);
const ORANGE: Color = Color::hex(0xff9800);
const BLUE: Color = Color::hex(0x2196f3);
const LIGHT_BLUE: Color = Color::hex(0x03a9f4);
const RED: Color = Color::hex(0xd32f2f);
const GREEN: Color = Color::hex(0x4caf50);
const SUNNY: Color = Color::hex(0xfdd835);
const AMBER: Color = Color::hex(0xffb300);
const OVERCAST: Color = Color::hex(0x90a4ae);

/// The kind of map to draw.
///
/// Deserializes from any string; unknown names become [`MapVariant::General`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum MapVariant {
    /// All readings on one map
    #[default]
    General,
    /// Maximum temperature
    MaxTemp,
    /// Minimum temperature
    MinTemp,
    /// Maximum wind speed
    Wind,
    /// Sunshine derived from cloud cover
    Sun,
}

impl From<String> for MapVariant {
    fn from(name: String) -> Self {
        MapVariant::parse(&name)
    }
}

/// Marker color, label text, title prefix and file name for one variant.
pub struct VariantStyle {
    pub title_prefix: &'static str,
    /// Fixed artifact stem; `None` means a timestamped name.
    pub file_stem: Option<&'static str>,
    pub marker_color: fn(&DayValues) -> Color,
    pub label_lines: fn(&DayValues) -> Vec<String>,
}

static GENERAL: VariantStyle = VariantStyle {
    title_prefix: "Weather Forecast",
    file_stem: None,
    marker_color: alert_color,
    label_lines: general_lines,
};

static MAX_TEMP: VariantStyle = VariantStyle {
    title_prefix: "Maximum Temperature",
    file_stem: Some("maxtemp"),
    marker_color: max_temp_color,
    label_lines: max_temp_lines,
};

static MIN_TEMP: VariantStyle = VariantStyle {
    title_prefix: "Minimum Temperature",
    file_stem: Some("mintemp"),
    marker_color: min_temp_color,
    label_lines: min_temp_lines,
};

static WIND: VariantStyle = VariantStyle {
    title_prefix: "Wind Speed",
    file_stem: Some("wind"),
    marker_color: wind_color,
    label_lines: wind_lines,
};

static SUN: VariantStyle = VariantStyle {
    title_prefix: "Sunshine",
    file_stem: Some("sun"),
    marker_color: sun_color,
    label_lines: sun_lines,
};

impl MapVariant {
    /// The four specialised variants, in batch order.
    pub const NAMED: [MapVariant; 4] = [
        MapVariant::MaxTemp,
        MapVariant::MinTemp,
        MapVariant::Wind,
        MapVariant::Sun,
    ];

    /// Parse a variant name. Unknown names render as the general map.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "maxtemp" => MapVariant::MaxTemp,
            "mintemp" => MapVariant::MinTemp,
            "wind" => MapVariant::Wind,
            "sun" => MapVariant::Sun,
            _ => MapVariant::General,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MapVariant::General => "general",
            MapVariant::MaxTemp => "maxtemp",
            MapVariant::MinTemp => "mintemp",
            MapVariant::Wind => "wind",
            MapVariant::Sun => "sun",
        }
    }

    pub fn style(self) -> &'static VariantStyle {
        match self {
            MapVariant::General => &GENERAL,
            MapVariant::MaxTemp => &MAX_TEMP,
            MapVariant::MinTemp => &MIN_TEMP,
            MapVariant::Wind => &WIND,
            MapVariant::Sun => &SUN,
        }
    }

    pub fn marker_color(self, day: &DayValues) -> Color {
        (self.style().marker_color)(day)
    }

    /// Full label: the location name followed by the variant's reading lines.
    pub fn label(self, name: &str, day: &DayValues) -> String {
        let mut lines = vec![name.to_string()];
        lines.extend((self.style().label_lines)(day));
        lines.join("\n")
    }

    pub fn title_prefix(self) -> &'static str {
        self.style().title_prefix
    }

    /// File name for a map persisted at `now`.
    pub fn file_name(self, now: DateTime<Local>) -> String {
        match self.style().file_stem {
            Some(stem) => format!("{}.png", stem),
            None => format!("weather_map_{}.png", now.format("%H%M%S")),
        }
    }
}

fn alert_color(_: &DayValues) -> Color {
    RED
}

fn max_temp_color(day: &DayValues) -> Color {
    if day.temperature_max > 25.0 {
        HOT
    } else if day.temperature_max > 15.0 {
        ORANGE
    } else {
        BLUE
    }
}

fn min_temp_color(day: &DayValues) -> Color {
    if day.temperature_min < 5.0 {
        BLUE
    } else if day.temperature_min < 15.0 {
        LIGHT_BLUE
    } else {
        ORANGE
    }
}

fn wind_color(day: &DayValues) -> Color {
    if day.wind_speed_max > 30.0 {
        RED
    } else if day.wind_speed_max > 20.0 {
        ORANGE
    } else {
        GREEN
    }
}

fn sun_color(day: &DayValues) -> Color {
    match day.sunshine() {
        Some(s) if s > 70 => SUNNY,
        Some(s) if s > 40 => AMBER,
        _ => OVERCAST,
    }
}

fn general_lines(day: &DayValues) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}° / {}°",
        weather_icon(day.weather_code),
        format_reading(day.temperature_max),
        format_reading(day.temperature_min)
    )];
    if day.precipitation > 0.0 {
        lines.push(format!("🌧 {} mm", format_reading(day.precipitation)));
    }
    if day.wind_speed_max > 15.0 {
        lines.push(format!("💨 {} km/h", format_reading(day.wind_speed_max)));
    }
    if let Some(cloud) = day.cloud_cover_max.filter(|&c| c > 50) {
        lines.push(format!("☁ {}%", cloud));
    }
    lines
}

fn max_temp_lines(day: &DayValues) -> Vec<String> {
    vec![format!("🌡 {}°C", format_reading(day.temperature_max))]
}

fn min_temp_lines(day: &DayValues) -> Vec<String> {
    vec![format!("🌡 {}°C", format_reading(day.temperature_min))]
}

fn wind_lines(day: &DayValues) -> Vec<String> {
    vec![format!("💨 {} km/h", format_reading(day.wind_speed_max))]
}

fn sun_lines(day: &DayValues) -> Vec<String> {
    match day.sunshine() {
        Some(s) => {
            let emoji = if s > 70 {
                "☀️"
            } else if s > 40 {
                "⛅"
            } else {
                "☁️"
            };
            vec![format!("{} {}%", emoji, s)]
        }
        None => vec![UNKNOWN_ICON.to_string()],
    }
}
