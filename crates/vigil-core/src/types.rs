//! Value types exchanged with device collaborators

use crate::{Result, VigilError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic coordinate in floating point degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, -90..=90
    pub latitude: f64,
    /// Longitude in degrees, -180..=180
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate without validation
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a coordinate, rejecting non-finite or out-of-range values
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let coordinate = Self::new(latitude, longitude);
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check that both components are finite and within range
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(VigilError::invalid(format!(
                "latitude out of range: {}",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(VigilError::invalid(format!(
                "longitude out of range: {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Outcome of a runtime permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    /// The user granted the permission
    Granted,
    /// The user refused, or the platform blocks the prompt
    Denied,
}

impl PermissionStatus {
    /// Whether the permission was granted
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Cadence requested from a periodic position provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatchOptions {
    /// Preferred interval between callbacks
    pub interval_ms: u64,
    /// Movement in metres that should trigger a callback before the interval
    pub distance_filter_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            distance_filter_m: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_validation_rejects_out_of_range() {
        assert!(Coordinate::try_new(12.9, 77.6).is_ok());
        assert!(Coordinate::try_new(91.0, 0.0).is_err());
        assert!(Coordinate::try_new(0.0, -180.5).is_err());
        assert!(Coordinate::try_new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn coordinate_display_is_comma_joined() {
        assert_eq!(Coordinate::new(12.9, 77.6).to_string(), "12.9,77.6");
    }
}
