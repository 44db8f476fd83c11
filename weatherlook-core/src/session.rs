//! Weather session: the state a front end renders, and the two refresh flows
//! that mutate it.
//!
//! State lives in a [`tokio::sync::watch`] channel so a renderer can follow
//! `loading` transitions while a refresh is in flight.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    Config,
    error::ResolutionError,
    location::{DeviceGeolocation, LocationResolver},
    model::{CitySuggestion, DetectedLocation, WeatherReading},
    provider::{WeatherGateway, gateway_from_config},
    storage::{DETECTED_LOCATION_KEY, Storage},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub reading: Option<WeatherReading>,
    pub loading: bool,
    /// Set only when a refresh ends in failure; message is display-ready.
    pub error: Option<ResolutionError>,
    pub search_query: String,
}

/// Marks the session as loading for its lifetime and clears any previous
/// error. Dropping it always resets `loading`, including when the refresh
/// future itself is dropped.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.loading = false);
    }
}

#[derive(Debug)]
pub struct WeatherSession {
    gateway: Arc<dyn WeatherGateway>,
    resolver: LocationResolver,
    storage: Storage,
    default_city: String,
    state: watch::Sender<SessionState>,
}

impl WeatherSession {
    pub fn new(
        gateway: Arc<dyn WeatherGateway>,
        resolver: LocationResolver,
        storage: Storage,
        default_city: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            resolver,
            storage,
            default_city: default_city.into(),
            state: watch::Sender::new(SessionState::default()),
        }
    }

    pub fn from_config(
        config: &Config,
        device: Arc<dyn DeviceGeolocation>,
        storage: Storage,
    ) -> anyhow::Result<Self> {
        let gateway: Arc<dyn WeatherGateway> = Arc::from(gateway_from_config(config)?);
        let resolver =
            LocationResolver::new(device, gateway.clone(), storage.clone(), config.default_city.clone())
                .with_timeout(config.location_timeout());
        Ok(Self::new(gateway, resolver, storage, config.default_city.clone()))
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Weather for a city typed by the user. Bypasses location resolution.
    pub async fn search_city(&mut self, name: &str) {
        let _loading = LoadingGuard::start(&self.state);
        Self::fetch_city(self.gateway.as_ref(), &self.state, name).await;
    }

    /// Weather for where the user is. Uses the stored location unless
    /// `force_refresh`, otherwise runs the resolver. Any failure on the way
    /// falls back to the default city.
    pub async fn refresh_by_location(&mut self, force_refresh: bool) {
        let _loading = LoadingGuard::start(&self.state);
        let gateway = self.gateway.as_ref();

        let Some(location) = Self::locate(&mut self.resolver, &self.storage, force_refresh).await
        else {
            Self::fetch_city(gateway, &self.state, &self.default_city).await;
            return;
        };

        match gateway.fetch_by_coordinates(location.lat, location.lon).await {
            Ok(reading) => {
                Self::remember_city(&self.storage, location, &reading);
                self.state.send_modify(|s| {
                    s.search_query = reading.name.clone();
                    s.reading = Some(reading);
                });
            }
            Err(err) => {
                tracing::warn!("weather by location failed, using default city: {err}");
                self.state.send_modify(|s| s.reading = None);
                Self::fetch_city(gateway, &self.state, &self.default_city).await;
            }
        }
    }

    /// Advisory; never fails.
    pub async fn suggest(&self, query: &str) -> Vec<CitySuggestion> {
        self.gateway.fetch_city_suggestions(query).await
    }

    async fn fetch_city(gateway: &dyn WeatherGateway, state: &watch::Sender<SessionState>, name: &str) {
        match gateway.fetch_by_city_name(name).await {
            Ok(reading) => state.send_modify(|s| {
                s.reading = Some(reading);
                s.search_query = name.to_string();
            }),
            Err(err) => {
                tracing::warn!("weather for '{name}' failed: {err}");
                state.send_modify(|s| {
                    s.reading = None;
                    s.error = Some(err.for_display());
                });
            }
        }
    }

    async fn locate(
        resolver: &mut LocationResolver,
        storage: &Storage,
        force_refresh: bool,
    ) -> Option<DetectedLocation> {
        if !force_refresh {
            match storage.get::<DetectedLocation>(DETECTED_LOCATION_KEY) {
                Ok(Some(saved)) => {
                    tracing::debug!("using saved location {}", saved.city);
                    return Some(saved);
                }
                Ok(None) => {}
                Err(err) => tracing::warn!("ignoring unreadable saved location: {err}"),
            }
        }
        resolver.resolve().await
    }

    /// Keep the stored city name in step with what the provider calls it.
    fn remember_city(storage: &Storage, mut location: DetectedLocation, reading: &WeatherReading) {
        if location.city == reading.name {
            return;
        }
        location.city = reading.name.clone();
        if let Err(err) = storage.set(DETECTED_LOCATION_KEY, &location) {
            tracing::warn!("could not update saved location: {err}");
        }
    }
}
