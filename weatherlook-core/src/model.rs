use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions for one place. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub name: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_deg: Option<u16>,
    pub condition: String,
    pub description: String,
    pub icon: String,
    /// Unix seconds.
    pub sunrise: i64,
    /// Unix seconds.
    pub sunset: i64,
    /// Offset from UTC in seconds.
    pub timezone: i32,
}

impl WeatherReading {
    fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone).unwrap_or_else(|| Utc.fix())
    }

    pub fn sunrise_local(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::from_timestamp(self.sunrise, 0).map(|dt| dt.with_timezone(&self.local_offset()))
    }

    pub fn sunset_local(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::from_timestamp(self.sunset, 0).map(|dt| dt.with_timezone(&self.local_offset()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// A coordinate, optionally with the city it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCoordinate {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub city: Option<String>,
}

/// Persisted under the `detectedLocation` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLocation {
    pub lat: f64,
    pub lon: f64,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    /// Full country name, or the raw code when unknown.
    pub country: String,
    pub state: Option<String>,
}

impl std::fmt::Display for CitySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            Some(state) => write!(f, "{}, {}, {}", self.name, state, self.country),
            None => write!(f, "{}, {}", self.name, self.country),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(timezone: i32) -> WeatherReading {
        WeatherReading {
            name: "London".into(),
            country: "GB".into(),
            temperature: 12.0,
            feels_like: 11.0,
            temp_min: 10.0,
            temp_max: 14.0,
            humidity: 80,
            pressure: 1012,
            wind_speed: 3.5,
            wind_deg: Some(200),
            condition: "Clouds".into(),
            description: "broken clouds".into(),
            icon: "04d".into(),
            sunrise: 1_700_000_000,
            sunset: 1_700_030_000,
            timezone,
        }
    }

    #[test]
    fn sunrise_uses_reading_offset() {
        let r = reading(3600);
        let sunrise = r.sunrise_local().expect("valid timestamp");
        assert_eq!(sunrise.offset().local_minus_utc(), 3600);
        assert_eq!(sunrise.timestamp(), 1_700_000_000);
    }

    #[test]
    fn suggestion_display_includes_state_when_present() {
        let s = CitySuggestion {
            name: "Springfield".into(),
            country: "United States".into(),
            state: Some("IL".into()),
        };
        assert_eq!(s.to_string(), "Springfield, IL, United States");

        let s = CitySuggestion { name: "Leeds".into(), country: "United Kingdom".into(), state: None };
        assert_eq!(s.to_string(), "Leeds, United Kingdom");
    }
}
