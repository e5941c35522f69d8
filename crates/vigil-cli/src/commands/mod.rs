//! Subcommand implementations

pub mod config;
pub mod message;
pub mod share;
pub mod sos;

use clap::Args;
use vigil_core::Coordinate;

/// Where the simulated device is
#[derive(Args, Debug, Clone, Copy)]
pub struct LocationArgs {
    /// Latitude in degrees
    #[arg(long, default_value_t = 12.9716, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, default_value_t = 77.5946, allow_hyphen_values = true)]
    pub lng: f64,
}

impl LocationArgs {
    /// Validated coordinate
    pub fn coordinate(&self) -> anyhow::Result<Coordinate> {
        Ok(Coordinate::try_new(self.lat, self.lng)?)
    }
}
