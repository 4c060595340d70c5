//! In-process `show-location` broadcast.
//!
//! A detail view opened over the map publishes a point here; the map view
//! drains the channel and recenters.

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::GeoPoint;

/// Event name.
pub const SHOW_LOCATION: &str = "show-location";

const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShowLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl ShowLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

impl From<GeoPoint> for ShowLocation {
    fn from(p: GeoPoint) -> Self {
        Self {
            latitude: p.latitude,
            longitude: p.longitude,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocationBus {
    sender: broadcast::Sender<ShowLocation>,
}

impl Default for LocationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LocationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a point. Returns how many listeners will see it.
    pub fn publish(&self, point: GeoPoint) -> usize {
        let delivered = self.sender.send(point.into()).unwrap_or(0);
        debug!(event = SHOW_LOCATION, delivered, "published");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShowLocation> {
        self.sender.subscribe()
    }
}
