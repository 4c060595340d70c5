use anyhow::{anyhow, Result};

use crate::config::Settings;
use crate::db::Database;
use crate::detail::{DetailPresenter, ViewContext};

use super::show::print_person;
use super::ui::{confirm, find_person, status};

/// Execute the delete command
pub fn run_delete(db: &Database, settings: &Settings, identifier: &str, force: bool) -> Result<()> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(anyhow!("Identifier cannot be empty."));
    }

    let Some(person) = find_person(db, identifier)? else {
        println!("No matches.");
        return Ok(());
    };

    let view = DetailPresenter::open(db, &person.id, ViewContext::Page)?;
    print_person(view.person());
    println!();

    let deleted = view.delete(db, &settings.session(), |prompt| {
        force || confirm(prompt).unwrap_or(false)
    })?;
    if deleted {
        status("Deleted.");
    }
    Ok(())
}
