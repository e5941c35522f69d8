//! Geographic helpers: distances and links built from a coordinate

use crate::config::MessageConfig;
use vigil_core::Coordinate;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Camera headings of the street-level snapshots attached to an alert
pub const STREET_VIEW_HEADINGS: [u16; 3] = [0, 120, 240];

/// Great-circle distance between two coordinates in metres
pub fn haversine_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Map link pointing at `coordinate`
pub fn map_link(config: &MessageConfig, coordinate: Coordinate) -> String {
    format!(
        "{}{},{}",
        config.map_base_url, coordinate.latitude, coordinate.longitude
    )
}

/// Static street-level image of `coordinate` looking towards `heading`
pub fn street_view_link(config: &MessageConfig, coordinate: Coordinate, heading: u16) -> String {
    let mut link = format!(
        "{}?size={}&location={},{}&heading={}&pitch=0",
        config.street_view_base_url,
        config.street_view_size,
        coordinate.latitude,
        coordinate.longitude,
        heading
    );
    if let Some(key) = &config.street_view_api_key {
        link.push_str("&key=");
        link.push_str(key);
    }
    link
}

/// One street-level link per heading in [`STREET_VIEW_HEADINGS`]
pub fn street_view_links(config: &MessageConfig, coordinate: Coordinate) -> Vec<String> {
    STREET_VIEW_HEADINGS
        .iter()
        .map(|heading| street_view_link(config, coordinate, *heading))
        .collect()
}
