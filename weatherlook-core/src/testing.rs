//! Scripted gateway shared by the unit tests.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;

use crate::{
    error::ResolutionError,
    model::{CitySuggestion, LocationCoordinate, WeatherReading},
    provider::WeatherGateway,
};

type Script<T> = Mutex<VecDeque<Result<T, ResolutionError>>>;

/// Each fetch pops the next scripted result; an empty script answers with the
/// generic error.
#[derive(Debug, Default)]
pub struct MockGateway {
    by_name: Script<WeatherReading>,
    by_coordinates: Script<WeatherReading>,
    ip: Script<LocationCoordinate>,
    suggestions: Mutex<Vec<CitySuggestion>>,
    name_requests: Mutex<Vec<String>>,
    coordinate_requests: Mutex<Vec<(f64, f64)>>,
    ip_requests: Mutex<u32>,
}

fn pop<T>(script: &Script<T>) -> Result<T, ResolutionError> {
    script
        .lock()
        .expect("lock")
        .pop_front()
        .unwrap_or_else(|| Err(ResolutionError::generic()))
}

impl MockGateway {
    pub fn push_by_name(&self, result: Result<WeatherReading, ResolutionError>) {
        self.by_name.lock().expect("lock").push_back(result);
    }

    pub fn push_by_coordinates(&self, result: Result<WeatherReading, ResolutionError>) {
        self.by_coordinates.lock().expect("lock").push_back(result);
    }

    pub fn push_ip(&self, result: Result<LocationCoordinate, ResolutionError>) {
        self.ip.lock().expect("lock").push_back(result);
    }

    pub fn set_suggestions(&self, suggestions: Vec<CitySuggestion>) {
        *self.suggestions.lock().expect("lock") = suggestions;
    }

    pub fn name_requests(&self) -> Vec<String> {
        self.name_requests.lock().expect("lock").clone()
    }

    pub fn coordinate_requests(&self) -> Vec<(f64, f64)> {
        self.coordinate_requests.lock().expect("lock").clone()
    }

    pub fn ip_calls(&self) -> u32 {
        *self.ip_requests.lock().expect("lock")
    }
}

#[async_trait]
impl WeatherGateway for MockGateway {
    async fn fetch_by_city_name(&self, name: &str) -> Result<WeatherReading, ResolutionError> {
        self.name_requests.lock().expect("lock").push(name.to_string());
        pop(&self.by_name)
    }

    async fn fetch_by_coordinates(&self, lat: f64, lon: f64) -> Result<WeatherReading, ResolutionError> {
        self.coordinate_requests.lock().expect("lock").push((lat, lon));
        pop(&self.by_coordinates)
    }

    async fn fetch_ip_location(&self) -> Result<LocationCoordinate, ResolutionError> {
        *self.ip_requests.lock().expect("lock") += 1;
        pop(&self.ip)
    }

    async fn fetch_city_suggestions(&self, _query: &str) -> Vec<CitySuggestion> {
        self.suggestions.lock().expect("lock").clone()
    }
}

pub fn reading(name: &str, country: &str) -> WeatherReading {
    WeatherReading {
        name: name.to_string(),
        country: country.to_string(),
        temperature: 14.0,
        feels_like: 13.2,
        temp_min: 12.0,
        temp_max: 15.5,
        humidity: 72,
        pressure: 1015,
        wind_speed: 3.6,
        wind_deg: Some(240),
        condition: "Clouds".to_string(),
        description: "scattered clouds".to_string(),
        icon: "03d".to_string(),
        sunrise: 1_700_000_000,
        sunset: 1_700_032_000,
        timezone: 0,
    }
}
