mod conversation;
mod location;
mod person;

pub use conversation::Conversation;
pub use location::{GeoPoint, Location, UNNAMED_LOCATION};
pub use person::{
    format_last_seen, Category, Person, LAST_SEEN_FORMAT, LEGACY_LOCATION_DESCRIPTION,
    UNKNOWN_AGE_GROUP,
};
