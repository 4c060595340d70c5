//! Person detail view: details, conversations, recorder and edit tabs over
//! one person.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::capture::{ConversationEditor, ConversationRecorder};
use crate::db::{Database, Subscription, PEOPLE};
use crate::error::{Error, Result, StoreError};
use crate::map::{map_address, LocationBus};
use crate::models::{format_last_seen, Category, Conversation, GeoPoint, Location, Person};
use crate::session::Session;

/// Used for a location added from the edit tab before the worker moves it.
pub const NEW_LOCATION_FALLBACK: GeoPoint = GeoPoint::new(35.6895, 139.6917);

/// How long the "saved" indicator stays up.
pub const SAVE_INDICATOR_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Details,
    Conversations,
    Recorder,
    Edit,
}

impl Tab {
    pub fn all() -> [Tab; 4] {
        [Self::Details, Self::Conversations, Self::Recorder, Self::Edit]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Details => "Details",
            Self::Conversations => "Conversations",
            Self::Recorder => "Record conversation",
            Self::Edit => "Edit",
        }
    }
}

/// Full page, or a modal over the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewContext {
    Page,
    Modal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    CloseModal,
    Navigate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonField {
    Nickname,
    AgeGroup,
    Category,
    Features,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationField {
    Latitude,
    Longitude,
    Description,
}

#[derive(Debug, Default)]
struct ConversationFeed {
    conversations: Vec<Conversation>,
    error: Option<String>,
}

/// Unparseable coordinate input reads as zero.
fn parse_coordinate(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub struct DetailPresenter {
    person: Person,
    working: Person,
    context: ViewContext,
    tab: Tab,
    feed: Rc<RefCell<ConversationFeed>>,
    subscription: Option<Subscription>,
    saved_until: Option<Instant>,
    recorder: ConversationRecorder,
}

impl DetailPresenter {
    /// Load the person and start following their conversations.
    ///
    /// A missing or unreadable person fails the whole view. A conversation
    /// feed failure only leaves a banner and an empty list.
    pub fn open(db: &Database, person_id: &str, context: ViewContext) -> Result<Self> {
        let person = db
            .get_person(person_id)?
            .ok_or_else(|| StoreError::not_found(PEOPLE, person_id))?;

        let feed = Rc::new(RefCell::new(ConversationFeed::default()));
        let sink = Rc::clone(&feed);
        let subscription = db
            .subscribe_conversations(person_id, move |result| {
                let mut feed = sink.borrow_mut();
                match result {
                    Ok(conversations) => {
                        feed.conversations = conversations;
                        feed.error = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "conversation feed failed");
                        feed.conversations.clear();
                        feed.error = Some(format!("could not load conversations: {}", e));
                    }
                }
            })
            .map_err(|e| {
                warn!(error = %e, "could not subscribe to conversations");
                feed.borrow_mut().error = Some(format!("could not load conversations: {}", e));
            })
            .ok();

        Ok(Self {
            working: person.clone(),
            recorder: ConversationRecorder::new(person_id),
            person,
            context,
            tab: Tab::default(),
            feed,
            subscription,
            saved_until: None,
        })
    }

    /// Last fetched or saved state.
    pub fn person(&self) -> &Person {
        &self.person
    }

    /// Edit tab's working copy.
    pub fn working(&self) -> &Person {
        &self.working
    }

    pub fn context(&self) -> ViewContext {
        self.context
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.feed.borrow().conversations.clone()
    }

    /// Non-fatal error to show above the conversation list.
    pub fn banner(&self) -> Option<String> {
        self.feed.borrow().error.clone()
    }

    pub fn is_live(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    pub fn is_dirty(&self) -> bool {
        self.working != self.person
    }

    // ==================== EDIT ====================

    pub fn set_field(&mut self, field: PersonField, value: &str) {
        match field {
            PersonField::Nickname => self.working.nickname = value.to_string(),
            PersonField::AgeGroup => self.working.age_group = Some(value.to_string()),
            PersonField::Category => self.working.category = Category::parse(value),
            PersonField::Features => self.working.features = value.to_string(),
        }
    }

    pub fn add_location(&mut self, now: DateTime<Utc>) {
        let mut location = Location::new(NEW_LOCATION_FALLBACK);
        location.description = Some(String::new());
        location.timestamp = now;
        self.working.locations.push(location);
    }

    pub fn set_location_field(&mut self, index: usize, field: LocationField, value: &str) -> Result<()> {
        let location = self
            .working
            .locations
            .get_mut(index)
            .ok_or_else(|| Error::validation(format!("no location #{}", index + 1)))?;
        match field {
            LocationField::Latitude => location.latitude = parse_coordinate(value),
            LocationField::Longitude => location.longitude = parse_coordinate(value),
            LocationField::Description => location.description = Some(value.to_string()),
        }
        Ok(())
    }

    /// Refuses to remove the last location; the working copy is left alone.
    pub fn remove_location(&mut self, index: usize) -> Result<Location> {
        if self.working.locations.len() <= 1 {
            return Err(Error::validation("at least one location is required"));
        }
        if index >= self.working.locations.len() {
            return Err(Error::validation(format!("no location #{}", index + 1)));
        }
        Ok(self.working.locations.remove(index))
    }

    /// Throw away unsaved edits.
    pub fn reset(&mut self) {
        self.working = self.person.clone();
    }

    /// Write the working copy back as one update.
    pub fn save(&mut self, db: &Database, session: &Session, now: Instant) -> Result<()> {
        if self.working.nickname.trim().is_empty() {
            return Err(Error::validation("nickname is required"));
        }
        session.require()?;

        db.update_person(&self.working)?;
        self.person = self.working.clone();
        self.saved_until = Some(now + SAVE_INDICATOR_TTL);
        Ok(())
    }

    pub fn save_indicator(&self) -> bool {
        self.saved_until.is_some()
    }

    pub fn tick(&mut self, now: Instant) {
        if self.saved_until.is_some_and(|until| now >= until) {
            self.saved_until = None;
        }
    }

    // ==================== DELETE ====================

    /// Delete after the worker confirms. Conversations are left in place.
    ///
    /// Returns false when the worker backs out.
    pub fn delete<F>(&self, db: &Database, session: &Session, confirm: F) -> Result<bool>
    where
        F: FnOnce(&str) -> bool,
    {
        let prompt = format!("Delete {}?", self.person.nickname);
        if !confirm(&prompt) {
            return Ok(false);
        }
        session.require()?;

        let deleted = db.delete_person(&self.person.id)?;
        if deleted {
            info!(person = %self.person.id, "deleted from detail view");
        }
        Ok(deleted)
    }

    // ==================== MAP ====================

    /// Show one of the person's locations on the map.
    pub fn show_on_map(&self, index: usize, bus: &LocationBus) -> Option<Navigation> {
        let point = self.person.locations.get(index)?.point();
        match self.context {
            ViewContext::Modal => {
                bus.publish(point);
                Some(Navigation::CloseModal)
            }
            ViewContext::Page => Some(Navigation::Navigate(map_address(point))),
        }
    }

    // ==================== CONVERSATIONS ====================

    pub fn recorder(&self) -> &ConversationRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut ConversationRecorder {
        &mut self.recorder
    }

    /// Save the recorder's conversation and reflect the new `lastSeen` here.
    pub fn save_recording(&mut self, db: &Database, session: &Session, now: DateTime<Utc>) -> Result<String> {
        let id = self.recorder.save(db, session, now)?;
        let last_seen = format_last_seen(&now);
        self.person.last_seen = last_seen.clone();
        self.working.last_seen = last_seen;
        Ok(id)
    }

    pub fn edit_conversation(&self, index: usize) -> Option<ConversationEditor> {
        self.feed
            .borrow()
            .conversations
            .get(index)
            .map(ConversationEditor::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CONVERSATIONS;
    use serde_json::json;

    fn setup() -> (Database, String) {
        let db = Database::open_memory().unwrap();
        let mut person = Person::new("Taro");
        person.locations.push(Location::new(GeoPoint::new(35.0, 139.0)).with_description("park"));
        let id = db.insert_person(&person).unwrap();
        (db, id)
    }

    fn signed_in() -> Session {
        Session::signed_in("aki")
    }

    #[test]
    fn test_open_missing_person_is_fatal() {
        let db = Database::open_memory().unwrap();
        let err = DetailPresenter::open(&db, "nobody", ViewContext::Page).err().unwrap();
        assert!(matches!(err, Error::Store(ref e) if e.is_not_found()));
    }

    #[test]
    fn test_conversations_follow_store() {
        let (db, id) = setup();
        let older = Conversation::new(&id, "a.", "1. a", Utc::now() - chrono::Duration::hours(1));
        db.insert_conversation(&older).unwrap();

        let view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        assert!(view.is_live());
        assert_eq!(view.conversations().len(), 1);

        db.insert_conversation(&Conversation::new(&id, "b.", "1. b", Utc::now())).unwrap();
        db.insert_conversation(&Conversation::new("someone-else", "c.", "1. c", Utc::now())).unwrap();
        let list = view.conversations();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].transcript, "b.");
        assert!(view.banner().is_none());
    }

    #[test]
    fn test_bad_conversation_sets_banner() {
        let (db, id) = setup();
        db.add_document(CONVERSATIONS, &json!({"personId": id, "timestamp": 1, "transcript": 5}))
            .unwrap();

        let view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        assert!(view.conversations().is_empty());
        assert!(view.banner().unwrap().contains("could not load conversations"));
        assert_eq!(view.person().nickname, "Taro");
    }

    #[test]
    fn test_remove_last_location_rejected() {
        let (db, id) = setup();
        let mut view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        let before = view.working().clone();

        assert!(view.remove_location(0).unwrap_err().is_validation());
        assert_eq!(view.working(), &before);

        view.add_location(Utc::now());
        assert_eq!(view.working().locations[1].point(), NEW_LOCATION_FALLBACK);
        assert_eq!(view.remove_location(0).unwrap().label(), "park");
        assert_eq!(view.working().locations.len(), 1);
    }

    #[test]
    fn test_bad_coordinate_reads_as_zero() {
        let (db, id) = setup();
        let mut view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        view.set_location_field(0, LocationField::Latitude, "north").unwrap();
        view.set_location_field(0, LocationField::Longitude, " 140.5 ").unwrap();

        assert_eq!(view.working().locations[0].point(), GeoPoint::new(0.0, 140.5));
        assert!(view.set_location_field(3, LocationField::Description, "x").is_err());
    }

    #[test]
    fn test_save_empty_nickname_writes_nothing() {
        let (db, id) = setup();
        let mut view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        view.set_field(PersonField::Nickname, "");
        view.set_field(PersonField::Features, "changed");

        let err = view.save(&db, &signed_in(), Instant::now()).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(db.get_person(&id).unwrap().unwrap().features, "");
        assert!(view.is_dirty());
    }

    #[test]
    fn test_save_promotes_working_copy() {
        let (db, id) = setup();
        let mut view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        view.set_field(PersonField::Category, "regular");
        view.set_field(PersonField::Features, "grey coat");
        view.add_location(Utc::now());

        let start = Instant::now();
        view.save(&db, &signed_in(), start).unwrap();
        assert!(!view.is_dirty());
        assert!(view.save_indicator());

        let stored = db.get_person(&id).unwrap().unwrap();
        assert_eq!(stored.category, Category::Regular);
        assert_eq!(stored.features, "grey coat");
        assert_eq!(stored.locations.len(), 2);

        view.tick(start + Duration::from_secs(1));
        assert!(view.save_indicator());
        view.tick(start + SAVE_INDICATOR_TTL);
        assert!(!view.save_indicator());
    }

    #[test]
    fn test_save_requires_session() {
        let (db, id) = setup();
        let mut view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        view.set_field(PersonField::Features, "x");
        let err = view.save(&db, &Session::anonymous(), Instant::now()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let (db, id) = setup();
        db.insert_conversation(&Conversation::new(&id, "a.", "1. a", Utc::now())).unwrap();
        let view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();

        assert!(!view.delete(&db, &signed_in(), |_| false).unwrap());
        assert!(db.get_person(&id).unwrap().is_some());

        let mut asked = String::new();
        assert!(view
            .delete(&db, &signed_in(), |prompt| {
                asked = prompt.to_string();
                true
            })
            .unwrap());
        assert_eq!(asked, "Delete Taro?");
        assert!(db.get_person(&id).unwrap().is_none());
        assert_eq!(db.conversations_for_person(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_show_on_map_by_context() {
        let (db, id) = setup();
        let bus = LocationBus::default();
        let mut rx = bus.subscribe();

        let page = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        assert_eq!(
            page.show_on_map(0, &bus),
            Some(Navigation::Navigate("/?lat=35&lng=139".to_string()))
        );
        assert!(rx.try_recv().is_err());

        let modal = DetailPresenter::open(&db, &id, ViewContext::Modal).unwrap();
        assert_eq!(modal.show_on_map(0, &bus), Some(Navigation::CloseModal));
        assert_eq!(rx.try_recv().unwrap().point(), GeoPoint::new(35.0, 139.0));
        assert_eq!(modal.show_on_map(5, &bus), None);
    }

    #[test]
    fn test_recording_updates_last_seen() {
        let (db, id) = setup();
        let mut view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        view.recorder_mut().set_transcript("cold night.");
        view.recorder_mut().set_summary("1. cold night");

        let now = Utc::now();
        view.save_recording(&db, &signed_in(), now).unwrap();
        assert_eq!(view.person().last_seen, format_last_seen(&now));
        assert_eq!(view.conversations().len(), 1);
        assert!(view.edit_conversation(0).is_some());
    }

    #[test]
    fn test_drop_releases_subscription() {
        let (db, id) = setup();
        let view = DetailPresenter::open(&db, &id, ViewContext::Page).unwrap();
        assert_eq!(db.subscriber_count(), 1);
        drop(view);
        assert_eq!(db.subscriber_count(), 0);
    }
}
