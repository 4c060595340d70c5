use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::Conversation;
use crate::session::Session;

/// Edits the text of a saved conversation.
#[derive(Debug, Clone)]
pub struct ConversationEditor {
    conversation_id: String,
    pub transcript: String,
    pub summary: String,
}

impl ConversationEditor {
    pub fn new(conversation: &Conversation) -> Self {
        Self {
            conversation_id: conversation.id.clone(),
            transcript: conversation.transcript.clone(),
            summary: conversation.summary.clone(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Both fields are required. Only transcript and summary are written.
    pub fn save(&self, db: &Database, session: &Session) -> Result<()> {
        if self.transcript.trim().is_empty() || self.summary.trim().is_empty() {
            return Err(Error::validation("transcript and summary are both required"));
        }
        session.require()?;

        db.update_conversation_text(&self.conversation_id, &self.transcript, &self.summary)?;
        info!(conversation = %self.conversation_id, "conversation edited");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_edit_updates_text_only() {
        let db = Database::open_memory().unwrap();
        let original = Conversation::new("p1", "hello.", "1. hello", Utc::now());
        let id = db.insert_conversation(&original).unwrap();
        let stored = db.get_conversation(&id).unwrap().unwrap();

        let mut editor = ConversationEditor::new(&stored);
        editor.summary = "greeted".to_string();
        editor.save(&db, &Session::signed_in("aki")).unwrap();

        let after = db.get_conversation(&id).unwrap().unwrap();
        assert_eq!(after.summary, "greeted");
        assert_eq!(after.transcript, "hello.");
        assert_eq!(after.timestamp, original.timestamp);
        assert_eq!(after.date, original.date);
    }

    #[test]
    fn test_blank_fields_rejected() {
        let db = Database::open_memory().unwrap();
        let id = db
            .insert_conversation(&Conversation::new("p1", "hello.", "1. hello", Utc::now()))
            .unwrap();
        let stored = db.get_conversation(&id).unwrap().unwrap();

        let mut editor = ConversationEditor::new(&stored);
        editor.transcript = "   ".to_string();
        assert!(editor.save(&db, &Session::signed_in("aki")).unwrap_err().is_validation());
        assert_eq!(db.get_conversation(&id).unwrap().unwrap().transcript, "hello.");
    }
}
