//! Core library for the `weatherlook` CLI.
//!
//! This crate defines:
//! - Configuration handling and durable key/value storage
//! - The remote weather gateway with retry and error normalization
//! - Layered location resolution (device, IP, default city)
//! - The weather session a front end renders
//!
//! It is used by `weatherlook-cli`, but can also be reused by other front ends.

pub mod config;
pub mod enrichment;
pub mod error;
pub mod location;
pub mod model;
pub mod profile;
pub mod provider;
pub mod retry;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::{Config, Units};
pub use error::{ErrorKind, ResolutionError};
pub use location::{DeviceGeolocation, FixedPosition, LocationResolver, NoDeviceGeolocation};
pub use model::{CitySuggestion, Coordinate, DetectedLocation, LocationCoordinate, WeatherReading};
pub use provider::{OpenWeatherGateway, WeatherGateway};
pub use session::{SessionState, WeatherSession};
pub use storage::Storage;
