use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// A transcribed conversation with one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(skip)]
    pub id: String,
    pub person_id: String,
    pub transcript: String,
    pub summary: String,
    /// Display date, `YYYY/MM/DD`.
    pub date: String,
    /// Epoch milliseconds; conversations list newest first by this value.
    pub timestamp: i64,
}

impl Conversation {
    pub fn new(
        person_id: impl Into<String>,
        transcript: impl Into<String>,
        summary: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            person_id: person_id.into(),
            transcript: transcript.into(),
            summary: summary.into(),
            date: at.with_timezone(&Local).format("%Y/%m/%d").to_string(),
            timestamp: at.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_conversation() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let c = Conversation::new("p1", "hello", "1. hello", at);
        assert_eq!(c.person_id, "p1");
        assert_eq!(c.timestamp, at.timestamp_millis());
        assert_eq!(c.date.len(), 10);
    }

    #[test]
    fn test_serialized_field_names() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let c = Conversation::new("p1", "t", "s", at);
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["personId"], "p1");
        assert!(v.get("id").is_none());
    }
}
