use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::location::{GeoPoint, Location};

/// Description given to the location recovered from a legacy single-point record.
pub const LEGACY_LOCATION_DESCRIPTION: &str = "original location";

/// Age group stored when the form leaves it blank.
pub const UNKNOWN_AGE_GROUP: &str = "unknown";

/// Format used for `last_seen` display strings.
pub const LAST_SEEN_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Render an instant as a `last_seen` string in local time.
pub fn format_last_seen<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Local).format(LAST_SEEN_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Store-assigned; never written into the document body.
    #[serde(skip)]
    pub id: String,
    pub nickname: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
    #[serde(default)]
    pub features: String,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub last_seen: String,
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Legacy single-point field. Read for normalization, never written back.
    #[serde(default, skip_serializing)]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// How often outreach workers meet this person. Drives marker color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Category {
    #[default]
    New,
    Occasional,
    Regular,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Occasional => "occasional",
            Self::Regular => "regular",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "occasional" => Self::Occasional,
            "regular" => Self::Regular,
            _ => Self::New,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "new (green)",
            Self::Occasional => "occasional (yellow)",
            Self::Regular => "regular (red)",
        }
    }

    /// Marker fill color.
    pub fn color(&self) -> &'static str {
        match self {
            Self::New => "#22c55e",
            Self::Occasional => "#eab308",
            Self::Regular => "#ef4444",
        }
    }

    pub fn all() -> [Category; 3] {
        [Self::New, Self::Occasional, Self::Regular]
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Person {
    pub fn new(nickname: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            nickname: nickname.into(),
            category: Category::default(),
            age_group: None,
            features: String::new(),
            photo_url: None,
            last_seen: format_last_seen(&now),
            locations: Vec::new(),
            location: None,
            created_at: Some(now),
        }
    }

    /// Fold a legacy `location` field into `locations`.
    ///
    /// Records that already carry locations are left as they are.
    pub fn normalize(&mut self) {
        if !self.locations.is_empty() {
            return;
        }
        if let Some(point) = self.location {
            self.locations.push(Location {
                latitude: point.latitude,
                longitude: point.longitude,
                description: Some(LEGACY_LOCATION_DESCRIPTION.to_string()),
                timestamp: Utc::now(),
            });
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    pub fn touch_last_seen(&mut self, at: &DateTime<Utc>) {
        self.last_seen = format_last_seen(at);
    }

    /// Most recently recorded location (last in storage order).
    pub fn latest_location(&self) -> Option<&Location> {
        self.locations.last()
    }

    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn age_group(&self) -> &str {
        match self.age_group.as_deref() {
            Some(a) if !a.is_empty() => a,
            _ => UNKNOWN_AGE_GROUP,
        }
    }
}
