//! Alert message composition

use crate::config::MessageConfig;
use crate::geo::{map_link, street_view_links};
use vigil_core::Coordinate;

/// A composed alert and the links embedded in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedAlert {
    /// Full message body sent on every channel
    pub text: String,
    /// Map link for the coordinate
    pub map_link: String,
    /// Street-level image links at headings 0, 120 and 240
    pub street_view_links: Vec<String>,
    /// Live-share link, when a session exists
    pub live_share_link: Option<String>,
}

/// Clamp a battery fraction into a whole percentage. `None` counts as full.
pub fn battery_percent(level: Option<f32>) -> u8 {
    let fraction = match level {
        Some(level) if level.is_finite() => level.clamp(0.0, 1.0),
        _ => 1.0,
    };
    (fraction * 100.0).round() as u8
}

/// Compose the single message sent over SMS and chat
pub fn compose_alert_message(
    config: &MessageConfig,
    coordinate: Coordinate,
    battery_percent: u8,
    live_share_link: Option<&str>,
) -> ComposedAlert {
    let map = map_link(config, coordinate);
    let street_views = street_view_links(config, coordinate);
    let live_share_link = live_share_link
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(str::to_string);

    let mut lines = Vec::with_capacity(8);
    lines.push(config.header.clone());
    lines.push(format!("Battery: {battery_percent}%"));
    lines.push(format!("Location: {map}"));
    lines.push("Street view:".to_string());
    for (index, link) in street_views.iter().enumerate() {
        lines.push(format!("{}. {link}", index + 1));
    }
    if let Some(link) = &live_share_link {
        lines.push(format!("Live location: {link}"));
    }

    ComposedAlert {
        text: lines.join("\n"),
        map_link: map,
        street_view_links: street_views,
        live_share_link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn battery_defaults_to_full() {
        assert_eq!(battery_percent(None), 100);
        assert_eq!(battery_percent(Some(f32::NAN)), 100);
        assert_eq!(battery_percent(Some(0.456)), 46);
        assert_eq!(battery_percent(Some(1.7)), 100);
        assert_eq!(battery_percent(Some(-0.2)), 0);
    }

    #[test]
    fn live_link_line_only_when_present() {
        let config = MessageConfig::default();
        let p = Coordinate::new(12.9, 77.6);
        let without = compose_alert_message(&config, p, 80, None);
        assert!(!without.text.contains("Live location"));
        let blank = compose_alert_message(&config, p, 80, Some(""));
        assert!(blank.live_share_link.is_none());
        let with = compose_alert_message(&config, p, 80, Some("https://live/abc"));
        assert!(with.text.contains("Live location: https://live/abc"));
    }

    #[test]
    fn message_carries_header_and_battery() {
        let config = MessageConfig::default();
        let alert = compose_alert_message(&config, Coordinate::new(1.0, 2.0), 42, None);
        assert!(alert.text.starts_with(&config.header));
        assert!(alert.text.contains("Battery: 42%"));
    }

    proptest! {
        #[test]
        fn message_contains_exact_map_link_and_three_headings(
            lat in -90.0f64..90.0, lng in -180.0f64..180.0, battery in 0u8..=100,
        ) {
            let config = MessageConfig::default();
            let alert = compose_alert_message(&config, Coordinate::new(lat, lng), battery, None);
            let expected_map = format!("{}{},{}", config.map_base_url, lat, lng);
            prop_assert_eq!(&alert.map_link, &expected_map);
            prop_assert!(alert.text.contains(&expected_map));

            prop_assert_eq!(alert.street_view_links.len(), 3);
            for heading in ["heading=0&", "heading=120&", "heading=240&"] {
                prop_assert_eq!(
                    alert.street_view_links.iter().filter(|l| l.contains(heading)).count(),
                    1
                );
            }
            for link in &alert.street_view_links {
                prop_assert!(alert.text.contains(link.as_str()));
            }
        }
    }
}
