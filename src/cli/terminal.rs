//! Text rendition of the map for the terminal.

use std::collections::BTreeMap;

use crate::map::{MapWidget, MarkerId, MarkerSpec, MarkerStyle};
use crate::models::GeoPoint;

#[derive(Debug, Default)]
pub struct TerminalMap {
    view: Option<(GeoPoint, u8)>,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    next_id: MarkerId,
}

impl TerminalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Option<(GeoPoint, u8)> {
        self.view
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Group markers, in the order they were added.
    pub fn pins(&self) -> Vec<(MarkerId, &MarkerSpec)> {
        self.markers
            .iter()
            .filter(|(_, m)| matches!(m.style, MarkerStyle::Pin(_)))
            .map(|(&id, m)| (id, m))
            .collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some((center, zoom)) = self.view {
            out.push_str(&format!(
                "center {:.6}, {:.6}  zoom {}\n",
                center.latitude, center.longitude, zoom
            ));
        }
        for marker in self.markers.values() {
            let tag = match marker.style {
                MarkerStyle::Pin(category) => category.as_str(),
                MarkerStyle::Focus => "focus",
                MarkerStyle::CurrentPosition => "you",
            };
            out.push_str(&format!(
                "  [{:<10}] {:.6}, {:.6}  {}\n",
                tag,
                marker.position.latitude,
                marker.position.longitude,
                marker.title.as_deref().unwrap_or("")
            ));
        }
        out
    }
}

impl MapWidget for TerminalMap {
    fn set_view(&mut self, center: GeoPoint, zoom: u8) {
        self.view = Some((center, zoom));
    }

    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerId {
        self.next_id += 1;
        self.markers.insert(self.next_id, marker);
        self.next_id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }
}
