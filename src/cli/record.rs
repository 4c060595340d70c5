use std::io::IsTerminal;

use anyhow::{anyhow, Result};
use chrono::Utc;

use crate::capture::{ConversationEditor, SpeechEngine, SpeechResult};
use crate::config::Settings;
use crate::db::Database;
use crate::detail::{DetailPresenter, ViewContext};
use crate::session::Session;

use super::ui::{confirm, error, find_person, status, text_input, warning};

/// Line-by-line dictation at the terminal. Each entered line is a final result.
struct TypedDictation {
    listening: bool,
}

impl SpeechEngine for TypedDictation {
    fn is_available(&self) -> bool {
        std::io::stdin().is_terminal()
    }

    fn start(&mut self) -> Result<(), String> {
        self.listening = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.listening = false;
    }
}

impl TypedDictation {
    fn next_line(&mut self) -> Result<Option<String>> {
        if !self.listening {
            return Ok(None);
        }
        Ok(text_input(">", None)?.filter(|l| !l.trim().is_empty()))
    }
}

/// Execute the record command
pub fn run_record(db: &Database, settings: &Settings, identifier: &str, transcript: Option<String>) -> Result<()> {
    let Some(person) = find_person(db, identifier)? else {
        return Err(anyhow!("No person found matching '{}'.", identifier.trim()));
    };
    let mut view = DetailPresenter::open(db, &person.id, ViewContext::Page)?;
    record_for(db, &settings.session(), &mut view, transcript)
}

/// Capture, summarize, review and save one conversation.
pub fn record_for(
    db: &Database,
    session: &Session,
    view: &mut DetailPresenter,
    transcript: Option<String>,
) -> Result<()> {
    let mut engine = TypedDictation { listening: false };

    match transcript {
        Some(text) => view.recorder_mut().set_transcript(text),
        None => match view.recorder_mut().start(&mut engine) {
            Ok(()) => {
                status("Recording. Enter one line at a time, empty line to stop.");
                while let Some(line) = engine.next_line()? {
                    view.recorder_mut().on_results(&[SpeechResult::final_text(format!("{} ", line))]);
                }
            }
            Err(e) => {
                warning(&e.to_string());
                if let Some(text) = text_input("transcript:", None)? {
                    view.recorder_mut().set_transcript(text);
                }
            }
        },
    }
    view.recorder_mut().stop(&mut engine);

    if view.recorder().transcript().is_empty() {
        status("Nothing recorded.");
        return Ok(());
    }

    println!("summary:\n{}\n", view.recorder().summary());
    let current = view.recorder().summary().to_string();
    if let Some(summary) = text_input("summary:", Some(&current))? {
        view.recorder_mut().set_summary(summary);
    }

    if !confirm("Save conversation?")? {
        return Ok(());
    }
    match view.save_recording(db, session, Utc::now()) {
        Ok(_) => status("Saved."),
        Err(e) => error(&e.to_string()),
    }
    Ok(())
}

/// Execute the edit-conversation command
pub fn run_edit_conversation(
    db: &Database,
    settings: &Settings,
    id: &str,
    transcript: Option<String>,
    summary: Option<String>,
) -> Result<()> {
    let Some(conversation) = db.get_conversation(id.trim())? else {
        return Err(anyhow!("No conversation with id '{}'.", id.trim()));
    };
    edit_conversation(
        db,
        &settings.session(),
        ConversationEditor::new(&conversation),
        transcript,
        summary,
    )
}

/// Values given up front skip their prompt.
pub fn edit_conversation(
    db: &Database,
    session: &Session,
    mut editor: ConversationEditor,
    transcript: Option<String>,
    summary: Option<String>,
) -> Result<()> {
    let prompt_needed = transcript.is_none() && summary.is_none();

    match transcript {
        Some(t) => editor.transcript = t,
        None if prompt_needed => {
            if let Some(t) = text_input("transcript:", Some(&editor.transcript))? {
                editor.transcript = t;
            }
        }
        None => {}
    }
    match summary {
        Some(s) => editor.summary = s,
        None if prompt_needed => {
            if let Some(s) = text_input("summary:", Some(&editor.summary))? {
                editor.summary = s;
            }
        }
        None => {}
    }

    editor.save(db, session)?;
    status("Saved.");
    Ok(())
}
