//! Renderer-side view of a location and its forecast series.

use crate::models::MeteoLocation;

/// Draw-order key for locations without a usable priority.
const UNRANKED_PRIORITY: i32 = 99;

/// Parallel per-day forecast sequences for one location.
#[derive(Debug, Clone, Default)]
pub struct ForecastSeries {
    pub dates: Vec<String>,
    pub weather_codes: Vec<i32>,
    pub temperature_max: Vec<f64>,
    pub temperature_min: Vec<f64>,
    pub precipitation: Vec<f64>,
    pub wind_speed_max: Vec<f64>,
    pub cloud_cover_max: Option<Vec<i32>>,
}

/// Forecast values for a single day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayValues {
    pub weather_code: i32,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub precipitation: f64,
    pub wind_speed_max: f64,
    pub cloud_cover_max: Option<i32>,
}

impl DayValues {
    /// Sunshine percentage, derived as `100 - max cloud cover`.
    pub fn sunshine(&self) -> Option<i32> {
        self.cloud_cover_max.map(|cloud| 100 - cloud)
    }
}

impl ForecastSeries {
    /// Number of days for which every required sequence has a value.
    pub fn usable_days(&self) -> usize {
        [
            self.weather_codes.len(),
            self.temperature_max.len(),
            self.temperature_min.len(),
            self.precipitation.len(),
            self.wind_speed_max.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0)
    }

    /// Values for `day_index`, clamped to the last usable day.
    ///
    /// Returns `None` only when the series holds no complete day at all.
    /// Cloud cover is optional and may be shorter than the other sequences.
    pub fn day(&self, day_index: usize) -> Option<DayValues> {
        let last = self.usable_days().checked_sub(1)?;
        let idx = day_index.min(last);
        Some(DayValues {
            weather_code: self.weather_codes[idx],
            temperature_max: self.temperature_max[idx],
            temperature_min: self.temperature_min[idx],
            precipitation: self.precipitation[idx],
            wind_speed_max: self.wind_speed_max[idx],
            cloud_cover_max: self
                .cloud_cover_max
                .as_ref()
                .and_then(|clouds| clouds.get(idx).copied()),
        })
    }

    /// The date string at `day_index`, without clamping.
    pub fn date(&self, day_index: usize) -> Option<&str> {
        self.dates.get(day_index).map(String::as_str)
    }
}

/// A named point on the map carrying a forecast series.
#[derive(Debug, Clone)]
pub struct WeatherLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub display_name: Option<String>,
    pub priority: Option<i32>,
    pub forecast: ForecastSeries,
}

impl WeatherLocation {
    /// Label text: the display name when present, otherwise the short name.
    pub fn label_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(display) if !display.is_empty() => display,
            _ => &self.name,
        }
    }

    /// Sort key for drawing: lower numbers draw later (on top).
    pub fn draw_order_key(&self) -> i32 {
        match self.priority {
            Some(p) if p != 0 => p,
            _ => UNRANKED_PRIORITY,
        }
    }

    /// Priority tier used for label size and offset.
    pub fn placement_tier(&self) -> i32 {
        match self.priority {
            Some(p) if p != 0 => p,
            _ => 1,
        }
    }
}

impl From<MeteoLocation> for WeatherLocation {
    fn from(loc: MeteoLocation) -> Self {
        let daily = loc.daily;
        Self {
            latitude: loc.latitude,
            longitude: loc.longitude,
            name: loc.name,
            display_name: loc.display_name,
            priority: loc.priority,
            forecast: ForecastSeries {
                dates: daily.time,
                weather_codes: daily.weather_code,
                temperature_max: daily.temperature_2m_max,
                temperature_min: daily.temperature_2m_min,
                precipitation: daily.precipitation_sum,
                wind_speed_max: daily.wind_speed_10m_max,
                cloud_cover_max: daily.cloud_cover_max,
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One-day forecast with the given readings.
    pub(crate) fn single_day(tmax: f64, tmin: f64, wind: f64, cloud: Option<i32>) -> ForecastSeries {
        ForecastSeries {
            dates: vec!["2026-10-18".to_string()],
            weather_codes: vec![2],
            temperature_max: vec![tmax],
            temperature_min: vec![tmin],
            precipitation: vec![0.0],
            wind_speed_max: vec![wind],
            cloud_cover_max: cloud.map(|c| vec![c]),
        }
    }

    pub(crate) fn location(name: &str, priority: Option<i32>, forecast: ForecastSeries) -> WeatherLocation {
        WeatherLocation {
            latitude: 32.0,
            longitude: 4.0,
            name: name.to_string(),
            display_name: None,
            priority,
            forecast,
        }
    }

    fn three_days() -> ForecastSeries {
        ForecastSeries {
            dates: vec!["d0".into(), "d1".into(), "d2".into()],
            weather_codes: vec![0, 1, 2],
            temperature_max: vec![10.0, 11.0, 12.0],
            temperature_min: vec![1.0, 2.0, 3.0],
            precipitation: vec![0.0, 0.5, 1.0],
            wind_speed_max: vec![5.0, 6.0, 7.0],
            cloud_cover_max: Some(vec![20, 40]),
        }
    }

    #[test]
    fn test_day_in_range() {
        let day = three_days().day(1).unwrap();
        assert_eq!(day.weather_code, 1);
        assert_eq!(day.temperature_max, 11.0);
        assert_eq!(day.cloud_cover_max, Some(40));
        assert_eq!(day.sunshine(), Some(60));
    }

    #[test]
    fn test_day_index_clamped_to_last_day() {
        let day = three_days().day(10).unwrap();
        assert_eq!(day.temperature_max, 12.0);
        // cloud cover is shorter than the other sequences
        assert_eq!(day.cloud_cover_max, None);
        assert_eq!(day.sunshine(), None);
    }

    #[test]
    fn test_day_clamped_to_shortest_sequence() {
        let mut series = three_days();
        series.wind_speed_max.truncate(2);
        assert_eq!(series.usable_days(), 2);
        assert_eq!(series.day(2).unwrap().temperature_max, 11.0);
    }

    #[test]
    fn test_empty_series_has_no_day() {
        assert_eq!(ForecastSeries::default().day(0), None);
    }

    #[test]
    fn test_date_not_clamped() {
        let series = three_days();
        assert_eq!(series.date(2), Some("d2"));
        assert_eq!(series.date(3), None);
    }

    #[test]
    fn test_label_name_prefers_display_name() {
        let mut loc = location("ALG", Some(1), three_days());
        assert_eq!(loc.label_name(), "ALG");
        loc.display_name = Some("Algiers".to_string());
        assert_eq!(loc.label_name(), "Algiers");
        loc.display_name = Some(String::new());
        assert_eq!(loc.label_name(), "ALG");
    }

    #[test]
    fn test_priority_keys() {
        let ranked = location("a", Some(3), three_days());
        assert_eq!(ranked.draw_order_key(), 3);
        assert_eq!(ranked.placement_tier(), 3);

        for missing in [None, Some(0)] {
            let unranked = location("b", missing, three_days());
            assert_eq!(unranked.draw_order_key(), 99);
            assert_eq!(unranked.placement_tier(), 1);
        }
    }

    #[test]
    fn test_from_meteo_location() {
        let json = crate::models::tests::location_json("Algiers", "dz");
        let meteo: MeteoLocation = serde_json::from_value(json).unwrap();
        let loc = WeatherLocation::from(meteo);
        assert_eq!(loc.name, "Algiers");
        assert_eq!(loc.priority, Some(1));
        assert_eq!(loc.forecast.usable_days(), 2);
        assert_eq!(loc.forecast.day(0).unwrap().temperature_max, 27.3);
    }
}
