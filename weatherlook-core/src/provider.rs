use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config,
    error::ResolutionError,
    model::{CitySuggestion, LocationCoordinate, WeatherReading},
};

pub mod openweather;

pub use openweather::OpenWeatherGateway;

/// Remote calls needed to show current weather.
///
/// Every method except [`WeatherGateway::fetch_city_suggestions`] propagates
/// a normalized [`ResolutionError`]; suggestions are advisory and degrade to an
/// empty list.
#[async_trait]
pub trait WeatherGateway: Send + Sync + Debug {
    async fn fetch_by_city_name(&self, name: &str) -> Result<WeatherReading, ResolutionError>;

    async fn fetch_by_coordinates(&self, lat: f64, lon: f64)
    -> Result<WeatherReading, ResolutionError>;

    async fn fetch_ip_location(&self) -> Result<LocationCoordinate, ResolutionError>;

    async fn fetch_city_suggestions(&self, query: &str) -> Vec<CitySuggestion>;
}

/// Construct the gateway described by `config`.
pub fn gateway_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherGateway>> {
    if config.api_key().is_none() {
        tracing::warn!(
            "No API key configured; weather requests will fail with code 401. \
             Hint: run `weatherlook configure` or set {}.",
            crate::config::API_KEY_ENV
        );
    }
    let boxed: Box<dyn WeatherGateway> = Box::new(OpenWeatherGateway::from_config(config)?);
    Ok(boxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_from_default_config_builds() {
        let cfg = Config::default();
        assert!(gateway_from_config(&cfg).is_ok());
    }
}
