//! Conversation capture: speech transcript, extractive summary, save and edit.

pub mod editor;
pub mod recorder;
pub mod summary;

pub use editor::ConversationEditor;
pub use recorder::{ConversationRecorder, RecorderState, SpeechEngine, SpeechResult};
pub use summary::{summarize, MAX_KEY_POINTS, NO_SENTENCES_MESSAGE};
