//! Application settings
//!
//! Settings live in the `app_settings` table. Environment variables override
//! stored values so a shared device can be pointed at a different worker or map
//! center without touching the database.

use std::env;

use crate::db::Database;
use crate::error::StoreError;
use crate::map::DEFAULT_CENTER;
use crate::models::GeoPoint;
use crate::session::Session;

// Settings keys for database storage
pub const SETTING_USER: &str = "user";
pub const SETTING_DEFAULT_LAT: &str = "map_default_lat";
pub const SETTING_DEFAULT_LNG: &str = "map_default_lng";

// Environment variable names
const ENV_USER: &str = "OUTREACH_USER";
const ENV_DEFAULT_LAT: &str = "OUTREACH_DEFAULT_LAT";
const ENV_DEFAULT_LNG: &str = "OUTREACH_DEFAULT_LNG";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Signed-in outreach worker.
    pub user: Option<String>,
    /// Map center used when no focus point is requested.
    pub default_center: GeoPoint,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user: None,
            default_center: DEFAULT_CENTER,
        }
    }
}

impl Settings {
    /// Load from the database, then apply environment overrides.
    pub fn load(db: &Database) -> Result<Self, StoreError> {
        let stored = Self::from_database(db)?;
        Ok(stored.with_overrides(|key| env::var(key).ok()))
    }

    fn from_database(db: &Database) -> Result<Self, StoreError> {
        let user = db.get_setting(SETTING_USER)?.filter(|u| !u.trim().is_empty());
        let lat = db.get_setting(SETTING_DEFAULT_LAT)?;
        let lng = db.get_setting(SETTING_DEFAULT_LNG)?;
        let default_center =
            GeoPoint::parse_pair(lat.as_deref(), lng.as_deref()).unwrap_or(DEFAULT_CENTER);

        Ok(Self {
            user,
            default_center,
        })
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(user) = lookup(ENV_USER).filter(|u| !u.trim().is_empty()) {
            self.user = Some(user);
        }
        let lat = lookup(ENV_DEFAULT_LAT);
        let lng = lookup(ENV_DEFAULT_LNG);
        if let Some(center) = GeoPoint::parse_pair(lat.as_deref(), lng.as_deref()) {
            self.default_center = center;
        }
        self
    }

    pub fn session(&self) -> Session {
        match &self.user {
            Some(user) => Session::signed_in(user.clone()),
            None => Session::anonymous(),
        }
    }

    pub fn save_user(db: &Database, user: Option<&str>) -> Result<(), StoreError> {
        match user {
            Some(u) if !u.trim().is_empty() => db.set_setting(SETTING_USER, u.trim()),
            _ => db.delete_setting(SETTING_USER).map(|_| ()),
        }
    }

    pub fn save_default_center(db: &Database, center: GeoPoint) -> Result<(), StoreError> {
        db.set_setting(SETTING_DEFAULT_LAT, &center.latitude.to_string())?;
        db.set_setting(SETTING_DEFAULT_LNG, &center.longitude.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let db = Database::open_memory().unwrap();
        let settings = Settings::from_database(&db).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!settings.session().is_authenticated());
    }

    #[test]
    fn test_stored_values() {
        let db = Database::open_memory().unwrap();
        Settings::save_user(&db, Some("aki")).unwrap();
        Settings::save_default_center(&db, GeoPoint::new(34.7, 135.5)).unwrap();

        let settings = Settings::from_database(&db).unwrap();
        assert_eq!(settings.user.as_deref(), Some("aki"));
        assert_eq!(settings.default_center, GeoPoint::new(34.7, 135.5));
        assert_eq!(settings.session().user(), Some("aki"));

        Settings::save_user(&db, None).unwrap();
        assert!(Settings::from_database(&db).unwrap().user.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_USER, "mio"),
            (ENV_DEFAULT_LAT, "35.0"),
            (ENV_DEFAULT_LNG, "136.0"),
        ]
        .into_iter()
        .collect();

        let settings =
            Settings::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.user.as_deref(), Some("mio"));
        assert_eq!(settings.default_center, GeoPoint::new(35.0, 136.0));
    }

    #[test]
    fn test_partial_center_override_ignored() {
        let settings = Settings::default().with_overrides(|k| {
            (k == ENV_DEFAULT_LAT).then(|| "10.0".to_string())
        });
        assert_eq!(settings.default_center, DEFAULT_CENTER);
    }
}
