//! Layered location resolution: device position watch, then IP geolocation,
//! then the default city.
//!
//! A resolution attempt races three producers: the device watch reporting a
//! position, the device error counter reaching its limit, and an overall
//! deadline. Whichever fires first settles the attempt and cancels the watch;
//! anything arriving after that is ignored.

use std::{fmt::Debug, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    model::{Coordinate, DetectedLocation, LocationCoordinate},
    provider::WeatherGateway,
    storage::{DETECTED_LOCATION_KEY, Storage},
};

pub const DEFAULT_MAX_DEVICE_ERRORS: u32 = 2;
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({code:?})")]
pub struct PositionError {
    pub code: PositionErrorCode,
    pub message: String,
}

impl PositionError {
    pub fn new(code: PositionErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

pub type PositionEvent = Result<Coordinate, PositionError>;

/// Receiving end of an active position watch.
#[derive(Debug)]
pub struct PositionWatch {
    events: mpsc::Receiver<PositionEvent>,
    cancel: CancellationToken,
}

/// Handed to whatever produces device positions.
#[derive(Debug, Clone)]
pub struct PositionReporter {
    events: mpsc::Sender<PositionEvent>,
    cancel: CancellationToken,
}

impl PositionWatch {
    pub fn channel(buffer: usize) -> (PositionReporter, PositionWatch) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();
        (
            PositionReporter { events: tx, cancel: cancel.clone() },
            PositionWatch { events: rx, cancel },
        )
    }

    async fn next(&mut self) -> Option<PositionEvent> {
        self.events.recv().await
    }

    /// Stop the watch. Further reports are refused.
    fn clear(mut self) {
        self.cancel.cancel();
        self.events.close();
    }
}

impl PositionReporter {
    /// Returns `false` once the watch has been cleared.
    pub async fn report(&self, event: PositionEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.events.send(event).await.is_ok()
    }

    pub fn try_report(&self, event: PositionEvent) -> bool {
        !self.cancel.is_cancelled() && self.events.try_send(event).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes when the consumer clears the watch.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// A device position source.
pub trait DeviceGeolocation: Send + Sync + Debug {
    /// Start watching; `None` when the device has no position support.
    fn watch_position(&self) -> Option<PositionWatch>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoDeviceGeolocation;

impl DeviceGeolocation for NoDeviceGeolocation {
    fn watch_position(&self) -> Option<PositionWatch> {
        None
    }
}

/// Reports one fixed position, e.g. one given on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinate);

impl DeviceGeolocation for FixedPosition {
    fn watch_position(&self) -> Option<PositionWatch> {
        let (reporter, watch) = PositionWatch::channel(1);
        reporter.try_report(Ok(self.0));
        Some(watch)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionState {
    Pending,
    ResolvedByDevice(Coordinate),
    ResolvedByIp(LocationCoordinate),
    /// Neither source produced a coordinate; the caller uses the default city.
    ResolvedByDefault,
}

impl ResolutionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Why device geolocation was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abandoned {
    Unsupported,
    PermissionDenied,
    TooManyErrors,
    WatchClosed,
    TimedOut,
}

#[derive(Debug)]
pub struct LocationResolver {
    device: Arc<dyn DeviceGeolocation>,
    gateway: Arc<dyn WeatherGateway>,
    storage: Storage,
    default_city: String,
    timeout: Duration,
    max_device_errors: u32,
    state: ResolutionState,
}

impl LocationResolver {
    pub fn new(
        device: Arc<dyn DeviceGeolocation>,
        gateway: Arc<dyn WeatherGateway>,
        storage: Storage,
        default_city: impl Into<String>,
    ) -> Self {
        Self {
            device,
            gateway,
            storage,
            default_city: default_city.into(),
            timeout: DEFAULT_LOCATION_TIMEOUT,
            max_device_errors: DEFAULT_MAX_DEVICE_ERRORS,
            state: ResolutionState::Pending,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Outcome of the last [`Self::resolve`] call.
    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    /// Move out of `Pending`. Only the first call per attempt has any effect.
    fn settle(&mut self, outcome: ResolutionState) -> bool {
        if !self.state.is_pending() {
            tracing::debug!("ignoring late resolution outcome {outcome:?}");
            return false;
        }
        self.state = outcome;
        true
    }

    /// Resolve a coordinate and persist it. `None` means the caller should fall
    /// back to the default city. Never fails.
    pub async fn resolve(&mut self) -> Option<DetectedLocation> {
        self.state = ResolutionState::Pending;

        match self.watch_device().await {
            Ok(coordinate) => {
                tracing::info!("location resolved by device: ({}, {})", coordinate.lat, coordinate.lon);
                self.settle(ResolutionState::ResolvedByDevice(coordinate));
            }
            Err(reason) => {
                tracing::info!("device geolocation abandoned ({reason:?}), trying IP-based location");
                let outcome = match self.gateway.fetch_ip_location().await {
                    Ok(location) => ResolutionState::ResolvedByIp(location),
                    Err(err) => {
                        tracing::warn!("IP location fallback failed, using default city: {err}");
                        ResolutionState::ResolvedByDefault
                    }
                };
                self.settle(outcome);
            }
        }

        let detected = match &self.state {
            ResolutionState::ResolvedByDevice(c) => Some(DetectedLocation {
                lat: c.lat,
                lon: c.lon,
                city: self.default_city.clone(),
            }),
            ResolutionState::ResolvedByIp(loc) => Some(DetectedLocation {
                lat: loc.coordinate.lat,
                lon: loc.coordinate.lon,
                city: loc.city.clone().unwrap_or_else(|| self.default_city.clone()),
            }),
            ResolutionState::ResolvedByDefault | ResolutionState::Pending => None,
        };

        if let Some(location) = &detected {
            if let Err(err) = self.storage.set(DETECTED_LOCATION_KEY, location) {
                tracing::warn!("could not persist detected location: {err}");
            }
        }
        detected
    }

    /// Race the position watch against the error limit and the deadline.
    async fn watch_device(&self) -> Result<Coordinate, Abandoned> {
        let Some(mut watch) = self.device.watch_position() else {
            return Err(Abandoned::Unsupported);
        };

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut errors = 0;

        let outcome = loop {
            tokio::select! {
                event = watch.next() => match event {
                    Some(Ok(coordinate)) => break Ok(coordinate),
                    Some(Err(err)) => {
                        errors += 1;
                        tracing::debug!("geolocation attempt {errors} failed: {err}");
                        if err.code == PositionErrorCode::PermissionDenied {
                            break Err(Abandoned::PermissionDenied);
                        }
                        if errors >= self.max_device_errors {
                            break Err(Abandoned::TooManyErrors);
                        }
                    }
                    None => break Err(Abandoned::WatchClosed),
                },
                () = &mut deadline => {
                    tracing::debug!("location timeout reached after {:?}", self.timeout);
                    break Err(Abandoned::TimedOut);
                }
            }
        };

        watch.clear();
        outcome
    }
}
