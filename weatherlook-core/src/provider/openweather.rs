use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::{collections::HashSet, sync::LazyLock, time::Duration};

use crate::{
    Config,
    config::Units,
    enrichment::{full_country_name, us_state},
    error::ResolutionError,
    model::{CitySuggestion, Coordinate, LocationCoordinate, WeatherReading},
    retry::RetryPolicy,
};

use super::WeatherGateway;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// "Paris 14", "Lyon 03": arrondissement-style sub-district results.
static SUB_DISTRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d+$").expect("sub-district pattern is valid"));

/// OpenWeatherMap current-weather and geocoding endpoints plus an
/// ip-api.com style IP geolocation endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherGateway {
    api_key: Option<String>,
    http: Client,
    units: Units,
    weather_base_url: String,
    geo_base_url: String,
    ip_url: String,
    suggestion_limit: u8,
    retry: RetryPolicy,
}

impl OpenWeatherGateway {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("weatherlook/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key: config.api_key().map(str::to_owned),
            http,
            units: config.units,
            weather_base_url: config.weather_base_url.trim_end_matches('/').to_string(),
            geo_base_url: config.geo_base_url.trim_end_matches('/').to_string(),
            ip_url: config.ip_url.clone(),
            suggestion_limit: config.suggestion_limit,
            retry: config.retry,
        })
    }

    fn api_key(&self) -> Result<&str, ResolutionError> {
        self.api_key.as_deref().ok_or_else(ResolutionError::missing_api_key)
    }

    async fn fetch_current(&self, location: &[(&str, String)]) -> Result<WeatherReading, ResolutionError> {
        let api_key = self.api_key()?;
        let url = format!("{}/weather", self.weather_base_url);
        let url = url.as_str();
        let units = self.units.as_str();
        let http = &self.http;

        self.retry
            .run("weather request", move || async move {
                let res = http
                    .get(url)
                    .query(location)
                    .query(&[("appid", api_key), ("units", units)])
                    .send()
                    .await
                    .map_err(|e| ResolutionError::transport(&e))?;

                let status = res.status();
                let body = res.text().await.map_err(|e| ResolutionError::transport(&e))?;
                parse_reading(status, &body)
            })
            .await
    }

    async fn fetch_geocoding(&self, query: &str) -> Result<Vec<OwGeoEntry>, ResolutionError> {
        let api_key = self.api_key()?;
        let url = format!("{}/direct", self.geo_base_url);
        let url = url.as_str();
        let limit = self.suggestion_limit.to_string();
        let limit = limit.as_str();
        let http = &self.http;

        self.retry
            .run("suggestion request", move || async move {
                let res = http
                    .get(url)
                    .query(&[("q", query), ("limit", limit), ("appid", api_key)])
                    .send()
                    .await
                    .map_err(|e| ResolutionError::transport(&e))?;

                let status = res.status();
                let body = res.text().await.map_err(|e| ResolutionError::transport(&e))?;
                if !status.is_success() {
                    return Err(ResolutionError::from_payload(&body, Some(status.as_u16())));
                }
                serde_json::from_str::<Vec<OwGeoEntry>>(&body)
                    .map_err(|_| ResolutionError::from_payload(&body, None))
            })
            .await
    }
}

fn parse_reading(status: StatusCode, body: &str) -> Result<WeatherReading, ResolutionError> {
    if !status.is_success() {
        return Err(ResolutionError::from_payload(body, Some(status.as_u16())));
    }

    match serde_json::from_str::<OwCurrentResponse>(body) {
        Ok(parsed) => Ok(parsed.into_reading()),
        Err(e) => {
            // Some error payloads come back with a 2xx status and a `cod`.
            tracing::debug!("weather body is not a reading: {e}");
            Err(ResolutionError::from_payload(body, None))
        }
    }
}

/// Drop sub-districts, enrich with country and state names, dedupe.
pub(crate) fn build_suggestions(entries: Vec<OwGeoEntry>) -> Vec<CitySuggestion> {
    let mut seen = HashSet::new();

    entries
        .into_iter()
        .filter(|e| !SUB_DISTRICT.is_match(e.name.trim()))
        .map(|e| {
            let state = if e.country.eq_ignore_ascii_case("US") {
                us_state(&e.name).map(str::to_owned)
            } else {
                None
            };
            CitySuggestion {
                name: e.name.trim().to_string(),
                country: full_country_name(&e.country),
                state,
            }
        })
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    deg: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
    timezone: Option<i32>,
}

impl OwCurrentResponse {
    fn into_reading(self) -> WeatherReading {
        let (condition, description, icon) = self
            .weather
            .into_iter()
            .next()
            .map(|w| (w.main, w.description, w.icon))
            .unwrap_or_else(|| ("Unknown".to_string(), "unknown".to_string(), String::new()));

        WeatherReading {
            name: self.name,
            country: self.sys.country.unwrap_or_default(),
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            temp_min: self.main.temp_min.unwrap_or(self.main.temp),
            temp_max: self.main.temp_max.unwrap_or(self.main.temp),
            humidity: self.main.humidity,
            pressure: self.main.pressure,
            wind_speed: self.wind.speed,
            wind_deg: self.wind.deg,
            condition,
            description,
            icon,
            sunrise: self.sys.sunrise.unwrap_or_default(),
            sunset: self.sys.sunset.unwrap_or_default(),
            timezone: self.timezone.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OwGeoEntry {
    name: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
}

#[async_trait]
impl WeatherGateway for OpenWeatherGateway {
    async fn fetch_by_city_name(&self, name: &str) -> Result<WeatherReading, ResolutionError> {
        tracing::debug!("fetching weather for city '{name}'");
        self.fetch_current(&[("q", name.to_string())]).await
    }

    async fn fetch_by_coordinates(&self, lat: f64, lon: f64) -> Result<WeatherReading, ResolutionError> {
        tracing::debug!("fetching weather for ({lat}, {lon})");
        self.fetch_current(&[("lat", lat.to_string()), ("lon", lon.to_string())]).await
    }

    async fn fetch_ip_location(&self) -> Result<LocationCoordinate, ResolutionError> {
        let url = self.ip_url.as_str();
        let http = &self.http;

        self.retry
            .run("IP location request", move || async move {
                let res = http.get(url).send().await.map_err(|e| ResolutionError::transport(&e))?;
                let status = res.status();
                let body = res.text().await.map_err(|e| ResolutionError::transport(&e))?;
                if !status.is_success() {
                    return Err(ResolutionError::from_payload(&body, Some(status.as_u16())));
                }

                let parsed: IpApiResponse = serde_json::from_str(&body)
                    .map_err(|_| ResolutionError::from_payload(&body, None))?;

                match (parsed.status.as_deref(), parsed.lat, parsed.lon) {
                    (Some("fail"), ..) | (_, None, _) | (_, _, None) => Err(ResolutionError::new(
                        parsed.message.unwrap_or_else(|| "IP location unavailable".to_string()),
                        "404",
                    )),
                    (_, Some(lat), Some(lon)) => Ok(LocationCoordinate {
                        coordinate: Coordinate { lat, lon },
                        city: parsed.city.filter(|c| !c.is_empty()),
                    }),
                }
            })
            .await
    }

    async fn fetch_city_suggestions(&self, query: &str) -> Vec<CitySuggestion> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match self.fetch_geocoding(query).await {
            Ok(entries) => build_suggestions(entries),
            Err(err) => {
                tracing::warn!("city suggestions for '{query}' unavailable: {err}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, country: &str) -> OwGeoEntry {
        OwGeoEntry { name: name.into(), country: country.into() }
    }

    #[test]
    fn sub_districts_are_dropped() {
        let out = build_suggestions(vec![entry("Paris", "FR"), entry("Paris 14", "FR"), entry("Lyon 03", "FR")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Paris");
        assert_eq!(out[0].country, "France");
    }

    #[test]
    fn us_results_get_state_when_known() {
        let out = build_suggestions(vec![entry("Springfield", "US"), entry("Smallville", "US")]);
        assert_eq!(out[0].state.as_deref(), Some("IL"));
        assert_eq!(out[1].name, "Smallville");
        assert_eq!(out[1].country, "United States");
        assert!(out[1].state.is_none());
    }

    #[test]
    fn non_us_namesake_has_no_state() {
        let out = build_suggestions(vec![entry("Paris", "FR"), entry("Paris", "US")]);
        assert_eq!(out.len(), 2);
        assert!(out[0].state.is_none());
        assert_eq!(out[1].state.as_deref(), Some("TX"));
    }

    #[test]
    fn duplicates_collapse_and_unknown_country_kept_raw() {
        let out = build_suggestions(vec![entry("London", "GB"), entry("London", "GB"), entry("Atlantis", "ZZ")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].country, "ZZ");
    }

    #[test]
    fn ok_body_with_error_code_is_an_error() {
        let err = parse_reading(StatusCode::OK, r#"{"cod":"401","message":"Invalid API key"}"#).unwrap_err();
        assert_eq!(err.code, "401");
    }

    #[test]
    fn ok_body_missing_fields_is_a_generic_error() {
        let body = r#"{"cod":200,"name":"London","main":{"temp":11.2}}"#;
        let err = parse_reading(StatusCode::OK, body).unwrap_err();
        assert_eq!(err, ResolutionError::generic());
    }

    #[test]
    fn reading_fields_are_mapped() {
        let body = r#"{
            "name": "London",
            "main": {"temp": 11.2, "feels_like": 10.1, "temp_min": 9.0, "temp_max": 12.5, "humidity": 81, "pressure": 1009},
            "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
            "wind": {"speed": 4.1, "deg": 230},
            "sys": {"country": "GB", "sunrise": 1700000000, "sunset": 1700030000},
            "timezone": 0,
            "cod": 200
        }"#;
        let r = parse_reading(StatusCode::OK, body).expect("reading");
        assert_eq!(r.name, "London");
        assert_eq!(r.country, "GB");
        assert_eq!(r.condition, "Clouds");
        assert_eq!(r.icon, "04d");
        assert_eq!(r.pressure, 1009);
        assert_eq!(r.wind_deg, Some(230));
    }
}
