use serde_json::{Map, Value};
use tracing::{info, warn};

use super::documents::{Direction, Document, Query, Snapshot, Subscription, WriteBatch};
use super::{Database, CONVERSATIONS, PEOPLE};
use crate::error::StoreError;
use crate::models::Conversation;

/// Conversations for one person, newest first.
pub fn conversations_query(person_id: &str) -> Query {
    Query::collection(CONVERSATIONS)
        .where_eq("personId", person_id)
        .order_by("timestamp", Direction::Descending)
}

fn conversation_from_document(doc: &Document) -> Result<Conversation, StoreError> {
    let mut conversation: Conversation = doc.decode(CONVERSATIONS)?;
    conversation.id = doc.id.clone();
    Ok(conversation)
}

fn conversations_from_snapshot(snapshot: Snapshot) -> Result<Vec<Conversation>, StoreError> {
    Ok(snapshot?
        .iter()
        .filter_map(|doc| {
            conversation_from_document(doc)
                .map_err(|e| warn!(error = %e, "skipping unreadable conversation"))
                .ok()
        })
        .collect())
}

impl Database {
    pub fn insert_conversation(&self, conversation: &Conversation) -> Result<String, StoreError> {
        self.add_document(CONVERSATIONS, conversation)
    }

    /// Store a conversation and refresh the person's `lastSeen` in one transaction.
    ///
    /// If the person no longer exists nothing is written.
    pub fn record_conversation(
        &self,
        conversation: &Conversation,
        last_seen: &str,
    ) -> Result<String, StoreError> {
        let mut batch = WriteBatch::new();
        let id = batch.add(CONVERSATIONS, conversation)?;

        let mut fields = Map::new();
        fields.insert("lastSeen".to_string(), Value::String(last_seen.to_string()));
        batch.update(PEOPLE, &conversation.person_id, fields);

        self.commit_batch(batch)?;
        info!(conversation = %id, person = %conversation.person_id, "recorded conversation");
        Ok(id)
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        self.get_document(CONVERSATIONS, id)?
            .as_ref()
            .map(conversation_from_document)
            .transpose()
    }

    /// Replace transcript and summary. Date, timestamp and owner are untouched.
    pub fn update_conversation_text(
        &self,
        id: &str,
        transcript: &str,
        summary: &str,
    ) -> Result<(), StoreError> {
        let mut fields = Map::new();
        fields.insert("transcript".to_string(), Value::String(transcript.to_string()));
        fields.insert("summary".to_string(), Value::String(summary.to_string()));
        self.update_document(CONVERSATIONS, id, fields)
    }

    pub fn conversations_for_person(&self, person_id: &str) -> Result<Vec<Conversation>, StoreError> {
        conversations_from_snapshot(self.query(&conversations_query(person_id)))
    }

    /// Watch one person's conversations, newest first.
    pub fn subscribe_conversations<F>(
        &self,
        person_id: &str,
        mut callback: F,
    ) -> Result<Subscription, StoreError>
    where
        F: FnMut(Result<Vec<Conversation>, StoreError>) + 'static,
    {
        self.subscribe(conversations_query(person_id), move |snapshot| {
            callback(conversations_from_snapshot(snapshot))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, Location, Person};
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (Database, String) {
        let db = Database::open_memory().unwrap();
        let mut p = Person::new("Sora");
        p.locations.push(Location::new(GeoPoint::new(1.0, 1.0)));
        p.last_seen = "2000/01/01 00:00".to_string();
        let id = db.insert_person(&p).unwrap();
        (db, id)
    }

    #[test]
    fn test_conversations_newest_first() {
        let (db, pid) = setup();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            let c = Conversation::new(pid.clone(), *text, *text, base + Duration::days(i as i64));
            db.insert_conversation(&c).unwrap();
        }
        db.insert_conversation(&Conversation::new("someone-else", "x", "x", base))
            .unwrap();

        let list = db.conversations_for_person(&pid).unwrap();
        let texts: Vec<&str> = list.iter().map(|c| c.transcript.as_str()).collect();
        assert_eq!(texts, vec!["third", "second", "first"]);
        assert!(list.iter().all(|c| !c.id.is_empty()));
    }

    #[test]
    fn test_record_conversation_updates_last_seen() {
        let (db, pid) = setup();
        let c = Conversation::new(pid.clone(), "hi", "1. hi", Utc::now());

        let cid = db.record_conversation(&c, "2024/06/01 12:30").unwrap();
        assert!(db.get_conversation(&cid).unwrap().is_some());
        assert_eq!(db.get_person(&pid).unwrap().unwrap().last_seen, "2024/06/01 12:30");
    }

    #[test]
    fn test_record_conversation_for_missing_person_writes_nothing() {
        let (db, _) = setup();
        let c = Conversation::new("ghost", "hi", "1. hi", Utc::now());

        assert!(db.record_conversation(&c, "2024/06/01 12:30").is_err());
        assert!(db.conversations_for_person("ghost").unwrap().is_empty());
    }

    #[test]
    fn test_update_conversation_text() {
        let (db, pid) = setup();
        let c = Conversation::new(pid, "old", "old summary", Utc::now());
        let cid = db.insert_conversation(&c).unwrap();

        db.update_conversation_text(&cid, "new", "new summary").unwrap();
        let stored = db.get_conversation(&cid).unwrap().unwrap();
        assert_eq!(stored.transcript, "new");
        assert_eq!(stored.summary, "new summary");
        assert_eq!(stored.timestamp, c.timestamp);
    }

    #[test]
    fn test_unreadable_conversation_skipped() {
        let (db, pid) = setup();
        db.insert_conversation(&Conversation::new(pid.clone(), "ok", "ok", Utc::now()))
            .unwrap();
        db.add_document(
            CONVERSATIONS,
            &serde_json::json!({"personId": pid, "transcript": null, "timestamp": 1}),
        )
        .unwrap();

        let list = db.conversations_for_person(&pid).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].transcript, "ok");
    }

    #[test]
    fn test_conversations_survive_person_delete() {
        let (db, pid) = setup();
        db.insert_conversation(&Conversation::new(pid.clone(), "a", "a", Utc::now()))
            .unwrap();
        db.delete_person(&pid).unwrap();
        assert_eq!(db.conversations_for_person(&pid).unwrap().len(), 1);
    }
}
