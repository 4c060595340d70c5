//! Map view: marker grouping, rendering through a map widget, and the
//! `show-location` side-channel.

pub mod events;
pub mod grouper;
pub mod renderer;
pub mod widget;

use std::time::Duration;

use crate::models::GeoPoint;

pub use events::{LocationBus, ShowLocation, SHOW_LOCATION};
pub use grouper::{group_by_location, grouping_key, GroupMember, MarkerClick, MarkerGroup, SelectionEntry};
pub use renderer::{InitialView, MapError, MapRenderer, MapSignal, MapView};
pub use widget::{Geolocator, MapWidget, MarkerId, MarkerSpec, MarkerStyle};

/// Shinjuku station.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint::new(35.6896, 139.7006);
/// Overview zoom.
pub const DEFAULT_ZOOM: u8 = 16;
/// Close-in zoom used when focusing a specific point.
pub const FOCUS_ZOOM: u8 = 18;
/// Lifetime of the marker dropped by a recenter request.
pub const TEMPORARY_MARKER_TTL: Duration = Duration::from_secs(3);

/// Map address focusing a point, e.g. `/?lat=35.1&lng=139.2`.
pub fn map_address(point: GeoPoint) -> String {
    format!("/?lat={}&lng={}", point.latitude, point.longitude)
}

/// Detail view address for a person.
pub fn person_address(id: &str) -> String {
    format!("/person/{}", id)
}
