//! Shared UI primitives for outreachmap
//!
//! Conventions:
//! - Prompts: lowercase with colon and space: `nickname: `
//! - Feedback: single word when possible: `Saved.`

use anyhow::Result;
use inquire::{ui::RenderConfig, Confirm, Select, Text};

use crate::db::Database;
use crate::form::search_people;
use crate::models::Person;

// ============================================================================
// Message Functions
// ============================================================================

/// Print a status message to stdout
#[inline]
pub fn status(msg: &str) {
    println!("{}", msg);
}

/// Print an error message to stderr
#[inline]
pub fn error(msg: &str) {
    eprintln!("Error: {}", msg);
}

/// Print a warning message to stderr
#[inline]
pub fn warning(msg: &str) {
    eprintln!("Warning: {}", msg);
}

/// Cut to at most `max_chars` characters, ending in an ellipsis when cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    if max_chars == 0 {
        kept
    } else {
        format!("{}…", kept)
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// Get terminal dimensions, defaulting to 80x24 if unavailable
pub fn term_size() -> (usize, usize) {
    crossterm::terminal::size()
        .map(|(w, h)| (w as usize, h as usize))
        .unwrap_or((80, 24))
}

/// Rows available for a selection list.
pub fn visible_lines() -> usize {
    let (_, height) = term_size();
    height.saturating_sub(4).max(5)
}

/// Get a minimal render config for inquire prompts
pub fn minimal_render_config() -> RenderConfig<'static> {
    RenderConfig::default_colored()
        .with_prompt_prefix(inquire::ui::Styled::new(""))
        .with_answered_prompt_prefix(inquire::ui::Styled::new(""))
}

/// Display a selection menu and return the chosen index
pub fn select<T: ToString>(prompt: &str, options: &[T]) -> Result<Option<usize>> {
    if options.is_empty() {
        return Ok(None);
    }

    let items: Vec<String> = options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("{}. {}", i + 1, o.to_string()))
        .collect();

    let result = Select::new(prompt, items.clone())
        .with_render_config(minimal_render_config())
        .with_page_size(visible_lines())
        .with_vim_mode(true)
        .prompt_skippable()?;

    Ok(result.and_then(|selected| items.iter().position(|o| *o == selected)))
}

/// Prompt for text input with optional default value
pub fn text_input(prompt: &str, default: Option<&str>) -> Result<Option<String>> {
    let mut builder = Text::new(prompt).with_render_config(minimal_render_config());

    if let Some(d) = default {
        if !d.is_empty() {
            builder = builder.with_default(d);
        }
    }

    Ok(builder.prompt_skippable()?)
}

/// Prompt for yes/no confirmation (default: no)
pub fn confirm(prompt: &str) -> Result<bool> {
    let result = Confirm::new(prompt)
        .with_render_config(minimal_render_config())
        .with_default(false)
        .prompt()?;
    Ok(result)
}

// ============================================================================
// Person Lookup
// ============================================================================

/// One-line label for choosing a person.
pub fn person_choice(person: &Person) -> String {
    let place = person
        .latest_location()
        .map(|l| l.label().to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{} ({}, {}) {}", person.nickname, person.category, place, person.last_seen)
}

/// Resolve an id or a nickname/features search to one person.
///
/// Several matches are offered as a selection list.
pub fn find_person(db: &Database, identifier: &str) -> Result<Option<Person>> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Ok(None);
    }

    if let Some(person) = db.get_person(identifier)? {
        return Ok(Some(person));
    }

    let mut results = search_people(db, identifier)?;
    match results.len() {
        0 => Ok(None),
        1 => Ok(results.pop()),
        _ => {
            let labels: Vec<String> = results.iter().map(person_choice).collect();
            Ok(select("Select:", &labels)?.map(|i| results.swap_remove(i)))
        }
    }
}
