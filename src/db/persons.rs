use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::documents::{to_fields, Direction, Document, Query, Snapshot, Subscription};
use super::{Database, PEOPLE};
use crate::error::StoreError;
use crate::models::{format_last_seen, Location, Person};

/// Project a stored document into a normalized `Person`.
fn person_from_document(doc: &Document) -> Result<Person, StoreError> {
    let mut person: Person = doc.decode(PEOPLE)?;
    person.id = doc.id.clone();
    person.normalize();
    Ok(person)
}

/// Decode every document, skipping (and logging) any that do not parse.
fn persons_from_snapshot(snapshot: Snapshot) -> Result<Vec<Person>, StoreError> {
    Ok(snapshot?
        .iter()
        .filter_map(|doc| {
            person_from_document(doc)
                .map_err(|e| warn!(error = %e, "skipping unreadable person"))
                .ok()
        })
        .collect())
}

impl Database {
    // ==================== PERSON CREATE ====================

    /// Store a new person. Returns the store-assigned id.
    pub fn insert_person(&self, person: &Person) -> Result<String, StoreError> {
        let id = self.add_document(PEOPLE, person)?;
        info!(person = %id, "registered person");
        Ok(id)
    }

    // ==================== PERSON READ ====================

    pub fn get_person(&self, id: &str) -> Result<Option<Person>, StoreError> {
        self.get_document(PEOPLE, id)?
            .as_ref()
            .map(person_from_document)
            .transpose()
    }

    /// Every person in storage order, as the map iterates them.
    pub fn all_persons(&self) -> Result<Vec<Person>, StoreError> {
        persons_from_snapshot(self.query(&Query::collection(PEOPLE)))
    }

    /// Every person sorted by nickname.
    pub fn list_persons(&self) -> Result<Vec<Person>, StoreError> {
        let query = Query::collection(PEOPLE).order_by("nickname", Direction::Ascending);
        persons_from_snapshot(self.query(&query))
    }

    pub fn count_persons(&self) -> Result<usize, StoreError> {
        Ok(self.query(&Query::collection(PEOPLE))?.len())
    }

    /// Watch every person. The callback fires now and after each change.
    pub fn subscribe_persons<F>(&self, mut callback: F) -> Result<Subscription, StoreError>
    where
        F: FnMut(Result<Vec<Person>, StoreError>) + 'static,
    {
        self.subscribe(Query::collection(PEOPLE), move |snapshot| {
            callback(persons_from_snapshot(snapshot))
        })
    }

    // ==================== PERSON UPDATE ====================

    /// Write the whole person back as one update.
    ///
    /// The id and any legacy `location` field are not part of the written body.
    pub fn update_person(&self, person: &Person) -> Result<(), StoreError> {
        self.update_document(PEOPLE, &person.id, to_fields(person)?)?;
        info!(person = %person.id, "updated person");
        Ok(())
    }

    /// Set `lastSeen` without touching other fields.
    pub fn touch_person(&self, id: &str, at: &DateTime<Utc>) -> Result<(), StoreError> {
        let mut fields = Map::new();
        fields.insert("lastSeen".to_string(), Value::String(format_last_seen(at)));
        self.update_document(PEOPLE, id, fields)
    }

    /// Append a sighting to an existing person and refresh `lastSeen`.
    ///
    /// Legacy single-point records are normalized first, so the old point is kept.
    pub fn append_location(
        &self,
        id: &str,
        location: Location,
        at: &DateTime<Utc>,
    ) -> Result<Person, StoreError> {
        let Some(mut person) = self.get_person(id)? else {
            return Err(StoreError::not_found(PEOPLE, id));
        };
        person.locations.push(location);
        person.touch_last_seen(at);

        let mut fields = Map::new();
        fields.insert("locations".to_string(), serde_json::to_value(&person.locations)?);
        fields.insert("lastSeen".to_string(), json!(person.last_seen));
        self.update_document(PEOPLE, id, fields)?;

        info!(person = %id, count = person.locations.len(), "appended location");
        Ok(person)
    }

    // ==================== PERSON DELETE ====================

    /// Delete a person. Their conversations are left in place.
    pub fn delete_person(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self.delete_document(PEOPLE, id)?;
        if deleted {
            info!(person = %id, "deleted person");
        }
        Ok(deleted)
    }
}
