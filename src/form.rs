//! Recording a sighting at a clicked map point: either a new person or one
//! more location for someone already known.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::db::Database;
use crate::directory::matches_search;
use crate::error::{Error, Result};
use crate::models::{format_last_seen, Category, GeoPoint, Location, Person, UNKNOWN_AGE_GROUP};
use crate::photo::{upload_photo, ImageUpload, ObjectStore};
use crate::session::Session;

/// Input for registering someone new.
#[derive(Debug, Clone, Default)]
pub struct NewPerson {
    pub nickname: String,
    pub age_group: String,
    pub category: Category,
    pub features: String,
    pub image: Option<ImageUpload>,
}

impl NewPerson {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            ..Default::default()
        }
    }

    /// Document as first written. The id is assigned by the store.
    fn into_person(self, point: GeoPoint, photo_url: String, now: DateTime<Utc>) -> Person {
        let age_group = match self.age_group.trim() {
            "" => UNKNOWN_AGE_GROUP.to_string(),
            a => a.to_string(),
        };
        Person {
            id: String::new(),
            nickname: self.nickname.trim().to_string(),
            category: self.category,
            age_group: Some(age_group),
            features: self.features,
            photo_url: Some(photo_url),
            last_seen: format_last_seen(&now),
            locations: vec![Location {
                latitude: point.latitude,
                longitude: point.longitude,
                description: Some(String::new()),
                timestamp: now,
            }],
            location: None,
            created_at: Some(now),
        }
    }
}

/// Register a new person seen at `point`. Returns the new id.
///
/// Nothing is uploaded or written unless the nickname is present and the
/// worker is signed in.
pub fn register_person<S: ObjectStore + ?Sized>(
    db: &Database,
    photos: &mut S,
    session: &Session,
    draft: NewPerson,
    point: GeoPoint,
    now: DateTime<Utc>,
) -> Result<String> {
    if draft.nickname.trim().is_empty() {
        return Err(Error::validation("nickname is required"));
    }
    session.require()?;

    let photo_url = match &draft.image {
        Some(image) => upload_photo(photos, session, image).map_err(|e| {
            warn!(error = %e, "profile image upload failed");
            e
        })?,
        None => String::new(),
    };

    let person = draft.into_person(point, photo_url, now);
    let id = db.insert_person(&person)?;
    info!(person = %id, lat = point.latitude, lng = point.longitude, "new person recorded");
    Ok(id)
}

/// People whose nickname or features contain `term`, in storage order.
pub fn search_people(db: &Database, term: &str) -> Result<Vec<Person>> {
    Ok(db
        .all_persons()?
        .into_iter()
        .filter(|p| matches_search(p, term))
        .collect())
}

/// Add a sighting at `point` to the selected person.
pub fn add_location_to_existing(
    db: &Database,
    session: &Session,
    selected: Option<&str>,
    point: GeoPoint,
    description: &str,
    now: DateTime<Utc>,
) -> Result<Person> {
    let Some(person_id) = selected.filter(|id| !id.is_empty()) else {
        return Err(Error::validation("select a person first"));
    };
    session.require()?;

    let location = Location {
        latitude: point.latitude,
        longitude: point.longitude,
        description: Some(description.to_string()),
        timestamp: now,
    };
    Ok(db.append_location(person_id, location, &now)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PEOPLE;
    use crate::photo::tests::{CountingStore, PNG_HEADER};
    use serde_json::json;

    fn signed_in() -> Session {
        Session::signed_in("aki")
    }

    #[test]
    fn test_register_with_defaults() {
        let db = Database::open_memory().unwrap();
        let mut photos = CountingStore::default();
        let point = GeoPoint::new(35.0, 139.0);

        let id = register_person(&db, &mut photos, &signed_in(), NewPerson::new(" Taro "), point, Utc::now())
            .unwrap();

        let doc = db.get_document(PEOPLE, &id).unwrap().unwrap();
        assert_eq!(doc.fields["nickname"], "Taro");
        assert_eq!(doc.fields["ageGroup"], UNKNOWN_AGE_GROUP);
        assert_eq!(doc.fields["category"], "new");
        assert_eq!(doc.fields["photoURL"], "");
        assert_eq!(doc.fields["locations"][0]["description"], "");
        assert_eq!(doc.fields["locations"][0]["latitude"], 35.0);
        assert!(doc.fields.contains_key("createdAt"));
        assert!(photos.puts.is_empty());
    }

    #[test]
    fn test_blank_nickname_rejected_before_upload() {
        let db = Database::open_memory().unwrap();
        let mut photos = CountingStore::default();
        let mut draft = NewPerson::new("   ");
        draft.image = Some(ImageUpload::new("a.png", PNG_HEADER.to_vec()).unwrap());

        let err = register_person(&db, &mut photos, &signed_in(), draft, GeoPoint::new(0.0, 0.0), Utc::now())
            .unwrap_err();
        assert!(err.is_validation());
        assert!(photos.puts.is_empty());
        assert_eq!(db.count_persons().unwrap(), 0);
    }

    #[test]
    fn test_register_with_photo() {
        let db = Database::open_memory().unwrap();
        let mut photos = CountingStore::default();
        let mut draft = NewPerson::new("Hana");
        draft.category = Category::Occasional;
        draft.age_group = "40s".to_string();
        draft.image = Some(ImageUpload::new("hana.png", PNG_HEADER.to_vec()).unwrap());

        let id = register_person(&db, &mut photos, &signed_in(), draft, GeoPoint::new(1.0, 2.0), Utc::now())
            .unwrap();

        let person = db.get_person(&id).unwrap().unwrap();
        assert_eq!(photos.puts.len(), 1);
        assert_eq!(person.photo_url(), Some(format!("memory://{}", photos.puts[0]).as_str()));
        assert_eq!(person.age_group(), "40s");
        assert_eq!(person.category, Category::Occasional);
    }

    #[test]
    fn test_register_requires_session() {
        let db = Database::open_memory().unwrap();
        let mut photos = CountingStore::default();
        let err = register_person(
            &db,
            &mut photos,
            &Session::anonymous(),
            NewPerson::new("Taro"),
            GeoPoint::new(0.0, 0.0),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
        assert_eq!(db.count_persons().unwrap(), 0);
    }

    #[test]
    fn test_search_people() {
        let db = Database::open_memory().unwrap();
        let mut p = Person::new("Ken");
        p.features = "Green Scarf".to_string();
        db.insert_person(&p).unwrap();
        db.insert_person(&Person::new("Mio")).unwrap();

        assert_eq!(search_people(&db, "scarf").unwrap().len(), 1);
        assert_eq!(search_people(&db, "").unwrap().len(), 2);
        assert!(search_people(&db, "nobody").unwrap().is_empty());
    }

    #[test]
    fn test_add_location_requires_selection() {
        let db = Database::open_memory().unwrap();
        let err = add_location_to_existing(&db, &signed_in(), None, GeoPoint::new(0.0, 0.0), "", Utc::now())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_add_location_to_legacy_person() {
        let db = Database::open_memory().unwrap();
        let id = db
            .add_document(
                PEOPLE,
                &json!({"nickname": "Old", "location": {"latitude": 1.0, "longitude": 1.0}}),
            )
            .unwrap();

        let person = add_location_to_existing(
            &db,
            &signed_in(),
            Some(&id),
            GeoPoint::new(2.0, 2.0),
            "station exit",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(person.locations.len(), 2);
        assert_eq!(person.locations[1].label(), "station exit");
        assert_eq!(db.get_person(&id).unwrap().unwrap().locations.len(), 2);
    }
}
