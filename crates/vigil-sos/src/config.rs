//! SOS flow configuration
//!
//! Defaults reproduce the behaviour users already know: a ten second
//! countdown, one hour of live sharing, position callbacks every five seconds
//! or one metre, and a two second cap on the battery query.

use serde::{Deserialize, Serialize};
use vigil_core::config::{parse_value, ConfigLoad};
use vigil_core::{Result, VigilError, WatchOptions};

/// A fallback SMS recipient used when the user has no close friends with a
/// phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultContact {
    /// Display name
    pub name: String,
    /// Phone number
    pub phone: String,
}

impl DefaultContact {
    /// Create a default contact
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }
}

/// Cadence of the live-location watch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationWatchConfig {
    /// Write at least this often while the device is stationary
    pub interval_ms: u64,
    /// Write sooner once the device moved this far
    pub distance_filter_m: f64,
}

impl Default for LocationWatchConfig {
    fn default() -> Self {
        let options = WatchOptions::default();
        Self {
            interval_ms: options.interval_ms,
            distance_filter_m: options.distance_filter_m,
        }
    }
}

impl From<LocationWatchConfig> for WatchOptions {
    fn from(config: LocationWatchConfig) -> Self {
        WatchOptions {
            interval_ms: config.interval_ms,
            distance_filter_m: config.distance_filter_m,
        }
    }
}

/// Alert message composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// First line of every alert
    pub header: String,
    /// Map link prefix; `lat,lng` is appended
    pub map_base_url: String,
    /// Static street-level imagery endpoint
    pub street_view_base_url: String,
    /// Image size requested from the imagery endpoint
    pub street_view_size: String,
    /// API key appended to imagery links when set
    pub street_view_api_key: Option<String>,
    /// Live-share link prefix; the session id is appended
    pub live_share_base_url: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            header: "EMERGENCY SOS! I need help. This is my current situation:".to_string(),
            map_base_url: "https://www.google.com/maps/search/?api=1&query=".to_string(),
            street_view_base_url: "https://maps.googleapis.com/maps/api/streetview".to_string(),
            street_view_size: "600x400".to_string(),
            street_view_api_key: None,
            live_share_base_url: "https://vigil-live.web.app/track?session=".to_string(),
        }
    }
}

/// Shake-to-activate detection thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeConfig {
    /// Acceleration magnitude (in g) that counts as a peak
    pub threshold_g: f64,
    /// Peaks needed inside one window
    pub min_peaks: usize,
    /// Window length
    pub window_ms: u64,
    /// Quiet period after a detected shake
    pub cooldown_ms: u64,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            threshold_g: 2.7,
            min_peaks: 3,
            window_ms: 1_000,
            cooldown_ms: 3_000,
        }
    }
}

/// Configuration for the whole SOS flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SosConfig {
    /// Seconds between trigger and automatic dispatch
    pub countdown_seconds: u32,
    /// Length of one countdown tick
    pub tick_interval_ms: u64,
    /// Length of the vibration fired on each tick
    pub haptic_pulse_ms: u64,
    /// Longest wait for the battery level before assuming full
    pub battery_timeout_ms: u64,
    /// Lifetime of a live-location session
    pub live_share_duration_secs: u64,
    /// Live-location watch cadence
    pub location_watch: LocationWatchConfig,
    /// Alert message composition
    pub message: MessageConfig,
    /// SMS recipients used when no close friend has a phone number
    pub default_contacts: Vec<DefaultContact>,
    /// Shake-to-activate detection
    pub shake: ShakeConfig,
}

impl Default for SosConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 10,
            tick_interval_ms: 1_000,
            haptic_pulse_ms: 500,
            battery_timeout_ms: 2_000,
            live_share_duration_secs: 3_600,
            location_watch: LocationWatchConfig::default(),
            message: MessageConfig::default(),
            default_contacts: vec![
                DefaultContact::new("Emergency Services", "112"),
                DefaultContact::new("Women Helpline", "1091"),
            ],
            shake: ShakeConfig::default(),
        }
    }
}

/// Parse `name:phone,name:phone`
fn parse_contacts(value: &str) -> Result<Vec<DefaultContact>> {
    value
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let (name, phone) = entry.split_once(':').ok_or_else(|| {
                VigilError::invalid(format!("default contact must be name:phone, got {entry}"))
            })?;
            Ok(DefaultContact::new(name.trim(), phone.trim()))
        })
        .collect()
}

impl ConfigLoad for SosConfig {
    const ENV_PREFIX: &'static str = "VIGIL_";

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "countdown_seconds" => self.countdown_seconds = parse_value(key, value)?,
            "tick_interval_ms" => self.tick_interval_ms = parse_value(key, value)?,
            "haptic_pulse_ms" => self.haptic_pulse_ms = parse_value(key, value)?,
            "battery_timeout_ms" => self.battery_timeout_ms = parse_value(key, value)?,
            "live_share_duration_secs" => {
                self.live_share_duration_secs = parse_value(key, value)?;
            }
            "location_watch.interval_ms" => {
                self.location_watch.interval_ms = parse_value(key, value)?;
            }
            "location_watch.distance_filter_m" => {
                self.location_watch.distance_filter_m = parse_value(key, value)?;
            }
            "message.header" => self.message.header = value.to_string(),
            "message.map_base_url" => self.message.map_base_url = value.to_string(),
            "message.street_view_base_url" => {
                self.message.street_view_base_url = value.to_string();
            }
            "message.street_view_size" => self.message.street_view_size = value.to_string(),
            "message.street_view_api_key" => {
                self.message.street_view_api_key =
                    Some(value.trim()).filter(|v| !v.is_empty()).map(str::to_string);
            }
            "message.live_share_base_url" => {
                self.message.live_share_base_url = value.to_string();
            }
            "default_contacts" => self.default_contacts = parse_contacts(value)?,
            "shake.threshold_g" => self.shake.threshold_g = parse_value(key, value)?,
            "shake.min_peaks" => self.shake.min_peaks = parse_value(key, value)?,
            "shake.window_ms" => self.shake.window_ms = parse_value(key, value)?,
            "shake.cooldown_ms" => self.shake.cooldown_ms = parse_value(key, value)?,
            other => {
                return Err(VigilError::invalid(format!(
                    "Unknown configuration key: {other}"
                )))
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.countdown_seconds == 0 {
            return Err(VigilError::invalid("countdown_seconds must be at least 1"));
        }
        if self.tick_interval_ms == 0 {
            return Err(VigilError::invalid("tick_interval_ms must be positive"));
        }
        if self.live_share_duration_secs == 0 {
            return Err(VigilError::invalid(
                "live_share_duration_secs must be positive",
            ));
        }
        if self.location_watch.interval_ms == 0 {
            return Err(VigilError::invalid(
                "location_watch.interval_ms must be positive",
            ));
        }
        if !self.location_watch.distance_filter_m.is_finite()
            || self.location_watch.distance_filter_m < 0.0
        {
            return Err(VigilError::invalid(
                "location_watch.distance_filter_m must be a non-negative number",
            ));
        }
        if self.default_contacts.is_empty() {
            return Err(VigilError::invalid("default_contacts must not be empty"));
        }
        if let Some(contact) = self
            .default_contacts
            .iter()
            .find(|c| c.phone.trim().is_empty())
        {
            return Err(VigilError::invalid(format!(
                "default contact {} has no phone number",
                contact.name
            )));
        }
        if self.message.map_base_url.is_empty()
            || self.message.street_view_base_url.is_empty()
            || self.message.live_share_base_url.is_empty()
        {
            return Err(VigilError::invalid("message link prefixes must be set"));
        }
        if self.shake.min_peaks == 0
            || self.shake.threshold_g.is_nan()
            || self.shake.threshold_g <= 0.0
        {
            return Err(VigilError::invalid("shake thresholds must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = SosConfig::default();
        config.validate().unwrap();
        assert_eq!(config.countdown_seconds, 10);
        assert_eq!(config.live_share_duration_secs, 3_600);
        assert!(!config.default_contacts.is_empty());
    }

    #[test]
    fn empty_default_contacts_are_rejected() {
        let config = SosConfig {
            default_contacts: Vec::new(),
            ..SosConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_countdown_is_rejected() {
        let config = SosConfig {
            countdown_seconds: 0,
            ..SosConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_style_overrides_reach_nested_fields() {
        let mut config = SosConfig::default();
        config
            .merge_with_vars(vec![
                ("VIGIL_COUNTDOWN_SECONDS".to_string(), "5".to_string()),
                (
                    "VIGIL_LOCATION_WATCH__INTERVAL_MS".to_string(),
                    "2500".to_string(),
                ),
                (
                    "VIGIL_DEFAULT_CONTACTS".to_string(),
                    "Mum:+15550100, Police:100".to_string(),
                ),
            ])
            .unwrap();
        assert_eq!(config.countdown_seconds, 5);
        assert_eq!(config.location_watch.interval_ms, 2_500);
        assert_eq!(
            config.default_contacts,
            vec![
                DefaultContact::new("Mum", "+15550100"),
                DefaultContact::new("Police", "100"),
            ]
        );
    }

    #[test]
    fn unknown_key_is_an_error() {
        let mut config = SosConfig::default();
        assert!(config.set_from_string("countdown", "3").is_err());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "countdown_seconds = 3\n\n[message]\nstreet_view_api_key = \"abc\""
        )
        .unwrap();
        let config = SosConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.countdown_seconds, 3);
        assert_eq!(config.message.street_view_api_key.as_deref(), Some("abc"));
        assert_eq!(config.live_share_duration_secs, 3_600);
    }
}
