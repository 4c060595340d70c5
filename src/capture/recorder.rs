use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::summary::summarize;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{format_last_seen, Conversation};
use crate::session::Session;

/// One recognition result from a speech engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResult {
    pub text: String,
    pub is_final: bool,
}

impl SpeechResult {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// A continuous speech-to-text engine.
pub trait SpeechEngine {
    fn is_available(&self) -> bool;

    fn start(&mut self) -> std::result::Result<(), String>;

    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
}

/// Captures one conversation for a person: transcript, summary, save.
#[derive(Debug, Clone)]
pub struct ConversationRecorder {
    person_id: String,
    state: RecorderState,
    transcript: String,
    summary: String,
}

impl ConversationRecorder {
    pub fn new(person_id: impl Into<String>) -> Self {
        Self {
            person_id: person_id.into(),
            state: RecorderState::Idle,
            transcript: String::new(),
            summary: String::new(),
        }
    }

    pub fn person_id(&self) -> &str {
        &self.person_id
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Clear previous text and start listening.
    ///
    /// Without a usable engine the transcript can still be typed in by hand.
    pub fn start<E: SpeechEngine + ?Sized>(&mut self, engine: &mut E) -> Result<()> {
        if !engine.is_available() {
            return Err(Error::device("speech recognition is not available on this device"));
        }
        self.transcript.clear();
        self.summary.clear();

        engine.start().map_err(|e| {
            warn!(error = %e, "speech recognition failed to start");
            Error::device(format!("could not start speech recognition: {}", e))
        })?;
        self.state = RecorderState::Recording;
        debug!(person = %self.person_id, "recording started");
        Ok(())
    }

    /// Append final results. Interim results are ignored.
    pub fn on_results(&mut self, results: &[SpeechResult]) {
        if !self.is_recording() {
            return;
        }
        for result in results.iter().filter(|r| r.is_final) {
            self.transcript.push_str(&result.text);
        }
    }

    /// Engine failure ends the session; the transcript so far is kept.
    pub fn on_error(&mut self, message: &str) -> Error {
        self.state = RecorderState::Idle;
        warn!(error = message, "speech recognition error");
        Error::device(format!("speech recognition error: {}", message))
    }

    /// Stop listening and summarize what was captured.
    pub fn stop<E: SpeechEngine + ?Sized>(&mut self, engine: &mut E) {
        if self.is_recording() {
            engine.stop();
        }
        self.state = RecorderState::Idle;
        if let Some(summary) = summarize(&self.transcript) {
            self.summary = summary;
        }
    }

    pub fn set_transcript(&mut self, text: impl Into<String>) {
        self.transcript = text.into();
    }

    pub fn set_summary(&mut self, text: impl Into<String>) {
        self.summary = text.into();
    }

    /// Store the conversation and refresh the person's `lastSeen` together.
    ///
    /// On success the recorder is cleared for the next conversation.
    pub fn save(&mut self, db: &Database, session: &Session, now: DateTime<Utc>) -> Result<String> {
        if self.transcript.is_empty() || self.summary.is_empty() {
            return Err(Error::validation("record a conversation and generate a summary first"));
        }
        session.require()?;

        let conversation = Conversation::new(&self.person_id, &self.transcript, &self.summary, now);
        let id = db.record_conversation(&conversation, &format_last_seen(&now))?;
        info!(conversation = %id, person = %self.person_id, "conversation saved");

        self.transcript.clear();
        self.summary.clear();
        Ok(id)
    }
}
