use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use weatherlook_core::{
    Config, Coordinate, DeviceGeolocation, FixedPosition, LocationResolver, NoDeviceGeolocation,
    Storage, Units, WeatherGateway, WeatherSession,
    location::ResolutionState,
    profile::{self, Profile},
    provider::gateway_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherlook", version, about = "Current weather for a city or your location")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, clap::Args)]
pub struct PositionArgs {
    /// Device latitude, if known.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Device longitude, if known.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
}

impl PositionArgs {
    fn device(&self) -> Arc<dyn DeviceGeolocation> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Arc::new(FixedPosition(Coordinate { lat, lon })),
            _ => Arc::new(NoDeviceGeolocation),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key and preferred units.
    Configure,

    /// Show current weather for a city, or for your location when no city is given.
    Show {
        /// City name, e.g. "London" or "Paris,FR".
        city: Option<String>,

        /// Ignore the saved location and detect it again.
        #[arg(long)]
        refresh_location: bool,

        #[command(flatten)]
        position: PositionArgs,
    },

    /// Detect and save your location without fetching weather.
    Locate {
        #[command(flatten)]
        position: PositionArgs,
    },

    /// List city suggestions for a partial name.
    Suggest {
        query: String,
    },

    /// Show or update the stored user profile.
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    Show,
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            // A broken config file must not block the command that rewrites it.
            Command::Configure => configure(Config::load_or_default()?)?,
            Command::Show { city, refresh_location, position } => {
                let config = Config::load()?;
                let storage = Storage::open_default()?;
                let mut session = WeatherSession::from_config(&config, position.device(), storage)?;
                match city {
                    Some(city) => session.search_city(&city).await,
                    None => session.refresh_by_location(refresh_location).await,
                }
                render::print_state(&session.state(), config.units)?;
            }
            Command::Locate { position } => {
                let config = Config::load()?;
                let storage = Storage::open_default()?;
                let gateway: Arc<dyn WeatherGateway> = Arc::from(gateway_from_config(&config)?);
                let mut resolver =
                    LocationResolver::new(position.device(), gateway, storage, config.default_city.clone())
                        .with_timeout(config.location_timeout());
                match resolver.resolve().await {
                    Some(location) => {
                        let source = match resolver.state() {
                            ResolutionState::ResolvedByDevice(_) => "device",
                            _ => "IP address",
                        };
                        println!(
                            "Location saved from {source}: {:.4}, {:.4} ({})",
                            location.lat, location.lon, location.city
                        );
                    }
                    None => println!(
                        "Could not detect your location; weather will default to {}.",
                        config.default_city
                    ),
                }
            }
            Command::Suggest { query } => {
                let config = Config::load()?;
                let storage = Storage::open_default()?;
                let session = WeatherSession::from_config(&config, Arc::new(NoDeviceGeolocation), storage)?;
                render::print_suggestions(&session.suggest(&query).await);
            }
            Command::Profile { action } => {
                let storage = Storage::open_default()?;
                match action.unwrap_or(ProfileAction::Show) {
                    ProfileAction::Show => render::print_profile(&profile::load_profile(&storage)?),
                    ProfileAction::Set { name, email, phone } => {
                        let current = profile::load_profile(&storage)?;
                        let updated = Profile {
                            name: name.unwrap_or(current.name),
                            email: email.unwrap_or(current.email),
                            phone: phone.unwrap_or(current.phone),
                        };
                        profile::update_profile(&storage, &updated)?;
                        render::print_profile(&updated);
                    }
                }
            }
        }

        Ok(())
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeatherMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("API key prompt was cancelled")?;

    let units = Select::new("Units:", vec![Units::Metric, Units::Imperial, Units::Standard])
        .prompt()
        .context("Units prompt was cancelled")?;

    config.set_api_key(api_key);
    config.units = units;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
