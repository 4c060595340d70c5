//! The seam between the renderer and whatever actually draws the map.

use crate::models::{Category, GeoPoint};

pub type MarkerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStyle {
    /// Colored pin for a group of people.
    Pin(Category),
    /// Blue dot marking a requested focus point.
    Focus,
    /// "You are here".
    CurrentPosition,
}

impl MarkerStyle {
    pub fn color(&self) -> &'static str {
        match self {
            Self::Pin(category) => category.color(),
            Self::Focus => "#0000ff",
            Self::CurrentPosition => "#4285f4",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: GeoPoint,
    pub title: Option<String>,
    pub style: MarkerStyle,
}

/// A mapping widget instance.
pub trait MapWidget {
    fn set_view(&mut self, center: GeoPoint, zoom: u8);

    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerId;

    /// Removing an unknown id is a no-op.
    fn remove_marker(&mut self, id: MarkerId);
}

/// One-shot device position lookup.
pub trait Geolocator {
    fn current_position(&mut self) -> Result<GeoPoint, String>;
}
