//! Collapse people seen at the same spot into one marker.
//!
//! Coordinates are keyed at 6 decimal places (about 0.11 m), so sightings
//! recorded from the same map click land in one group.

use std::collections::HashMap;

use crate::models::{Category, GeoPoint, Location, Person};

/// Grouping key: both coordinates rounded to 6 decimals, `"lat,lng"`.
pub fn grouping_key(point: GeoPoint) -> String {
    format!("{},{}", rounded(point.latitude), rounded(point.longitude))
}

/// Six-decimal text. Values that round to zero from below lose their sign.
fn rounded(value: f64) -> String {
    let text = format!("{:.6}", value);
    match text.strip_prefix('-') {
        Some(unsigned) if unsigned.bytes().all(|b| b == b'0' || b == b'.') => unsigned.to_string(),
        _ => text,
    }
}

fn key_position(key: &str, fallback: GeoPoint) -> GeoPoint {
    key.split_once(',')
        .and_then(|(lat, lng)| GeoPoint::parse_pair(Some(lat), Some(lng)))
        .unwrap_or(fallback)
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupMember {
    pub person: Person,
    pub location: Location,
}

/// One entry of the chooser shown for a multi-person marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub person_id: String,
    pub nickname: String,
    /// `"<location label> - <last seen>"`
    pub detail: String,
}

/// What clicking a marker does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerClick {
    OpenDetail { person_id: String },
    ChooseAmong(Vec<SelectionEntry>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup {
    pub key: String,
    pub position: GeoPoint,
    /// Input order: people as iterated, then locations as stored.
    pub members: Vec<GroupMember>,
}

impl MarkerGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Color comes from the first member, whatever the others are.
    pub fn category(&self) -> Category {
        self.members
            .first()
            .map(|m| m.person.category)
            .unwrap_or_default()
    }

    pub fn title(&self) -> String {
        match self.members.as_slice() {
            [only] => format!("{} - {}", only.person.nickname, only.location.label()),
            members => format!("{} people at this location", members.len()),
        }
    }

    pub fn click(&self) -> MarkerClick {
        match self.members.as_slice() {
            [only] => MarkerClick::OpenDetail {
                person_id: only.person.id.clone(),
            },
            members => MarkerClick::ChooseAmong(
                members
                    .iter()
                    .map(|m| SelectionEntry {
                        person_id: m.person.id.clone(),
                        nickname: m.person.nickname.clone(),
                        detail: format!("{} - {}", m.location.label(), m.person.last_seen),
                    })
                    .collect(),
            ),
        }
    }

    /// Person chosen from the selection list.
    pub fn select(&self, index: usize) -> Option<&Person> {
        self.members.get(index).map(|m| &m.person)
    }
}

/// Group every (person, location) pair by rounded coordinate.
///
/// Groups come out in the order their key was first seen. People without
/// locations contribute nothing.
pub fn group_by_location(people: &[Person]) -> Vec<MarkerGroup> {
    let mut groups: Vec<MarkerGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for person in people {
        for location in &person.locations {
            let key = grouping_key(location.point());
            let member = GroupMember {
                person: person.clone(),
                location: location.clone(),
            };

            match index.get(&key) {
                Some(&i) => groups[i].members.push(member),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(MarkerGroup {
                        position: key_position(&key, location.point()),
                        key,
                        members: vec![member],
                    });
                }
            }
        }
    }

    groups
}
