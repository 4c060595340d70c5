use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label shown when a location has no description.
pub const UNNAMED_LOCATION: &str = "location";

/// A bare coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Parse a coordinate from two query-string values. Both must be finite numbers.
    pub fn parse_pair(lat: Option<&str>, lng: Option<&str>) -> Option<Self> {
        let lat: f64 = lat?.trim().parse().ok()?;
        let lng: f64 = lng?.trim().parse().ok()?;
        if lat.is_finite() && lng.is_finite() {
            Some(Self::new(lat, lng))
        } else {
            None
        }
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

/// One recorded sighting of a person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "now")]
    pub timestamp: DateTime<Utc>,
}

impl Location {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            description: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Description, or the generic label when empty.
    pub fn label(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.is_empty() => d,
            _ => UNNAMED_LOCATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        let p = GeoPoint::parse_pair(Some("35.1"), Some(" 139.2")).unwrap();
        assert_eq!(p, GeoPoint::new(35.1, 139.2));
        assert!(GeoPoint::parse_pair(Some("35.1"), None).is_none());
        assert!(GeoPoint::parse_pair(Some("abc"), Some("139.2")).is_none());
        assert!(GeoPoint::parse_pair(Some("NaN"), Some("139.2")).is_none());
    }

    #[test]
    fn test_label_falls_back() {
        let loc = Location::new(GeoPoint::new(1.0, 2.0));
        assert_eq!(loc.label(), "location");
        let loc = loc.with_description("night spot");
        assert_eq!(loc.label(), "night spot");
        let loc = Location::new(GeoPoint::new(1.0, 2.0)).with_description("");
        assert!(loc.description.is_none());
        let mut loc = Location::new(GeoPoint::new(1.0, 2.0));
        loc.description = Some(String::new());
        assert_eq!(loc.label(), "location");
        loc.description = Some(" ".to_string());
        assert_eq!(loc.label(), " ");
    }

    #[test]
    fn test_missing_timestamp_defaults() {
        let loc: Location =
            serde_json::from_str(r#"{"latitude": 1.5, "longitude": 2.5}"#).unwrap();
        assert_eq!(loc.point(), GeoPoint::new(1.5, 2.5));
        assert!(loc.description.is_none());
    }
}
