use anyhow::{anyhow, Result};

use crate::config::Settings;
use crate::db::Database;
use crate::detail::{DetailPresenter, Navigation, Tab, ViewContext};
use crate::map::LocationBus;
use crate::models::{Conversation, Person};

use super::edit::edit_person;
use super::record::{edit_conversation, record_for};
use super::ui::{confirm, find_person, select, status};

/// Execute the show command
pub fn run_show(db: &Database, settings: &Settings, identifier: &str) -> Result<()> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(anyhow!("Identifier cannot be empty."));
    }

    let Some(person) = find_person(db, identifier)? else {
        println!("No matches.");
        return Ok(());
    };

    let mut view = DetailPresenter::open(db, &person.id, ViewContext::Page)?;
    let bus = LocationBus::default();
    if let Some(Navigation::Navigate(address)) = run_detail(db, settings, &mut view, &bus)? {
        status(&format!("Open the map at {}", address));
    }
    Ok(())
}

pub fn print_person(person: &Person) {
    println!("{}", person.nickname);
    println!("  category:  {}", person.category.label());
    println!("  age group: {}", person.age_group());
    if !person.features.is_empty() {
        println!("  features:  {}", person.features);
    }
    if let Some(url) = person.photo_url() {
        println!("  photo:     {}", url);
    }
    println!("  last seen: {}", person.last_seen);
    println!("  locations:");
    for (i, loc) in person.locations.iter().enumerate() {
        println!(
            "    {}. {} ({:.6}, {:.6}) {}",
            i + 1,
            loc.label(),
            loc.latitude,
            loc.longitude,
            loc.timestamp.format("%Y/%m/%d")
        );
    }
}

pub fn print_conversations(conversations: &[Conversation], banner: Option<&str>) {
    if let Some(msg) = banner {
        eprintln!("Warning: {}", msg);
    }
    if conversations.is_empty() {
        println!("No conversations yet.");
        return;
    }
    for c in conversations {
        println!("{}", c.date);
        for line in c.summary.lines() {
            println!("  {}", line);
        }
        println!();
    }
}

fn detail_actions(view: &DetailPresenter) -> Vec<String> {
    let mut actions: Vec<String> = Tab::all()
        .iter()
        .filter(|t| **t != Tab::Details)
        .map(|t| t.label().to_string())
        .collect();
    actions.extend(view.person().locations.iter().map(|l| format!("Show '{}' on map", l.label())));
    actions.push("Delete".to_string());
    actions.push("Back".to_string());
    actions
}

/// Interactive detail view. Returns how the caller should navigate away.
pub fn run_detail(
    db: &Database,
    settings: &Settings,
    view: &mut DetailPresenter,
    bus: &LocationBus,
) -> Result<Option<Navigation>> {
    let session = settings.session();

    loop {
        print_person(view.person());
        println!();

        let actions = detail_actions(view);
        let Some(choice) = select("Action:", &actions)? else {
            return Ok(None);
        };
        let location_count = view.person().locations.len();

        match choice {
            0 => {
                view.select_tab(Tab::Conversations);
                let conversations = view.conversations();
                print_conversations(&conversations, view.banner().as_deref());
                if !conversations.is_empty() {
                    let labels: Vec<String> = conversations
                        .iter()
                        .map(|c| format!("{} {}", c.date, c.summary.lines().next().unwrap_or("")))
                        .collect();
                    if let Some(i) = select("Edit conversation:", &labels)? {
                        if let Some(editor) = view.edit_conversation(i) {
                            edit_conversation(db, &session, editor, None, None)?;
                        }
                    }
                }
            }
            1 => {
                view.select_tab(Tab::Recorder);
                record_for(db, &session, view, None)?;
            }
            2 => {
                view.select_tab(Tab::Edit);
                edit_person(db, &session, view)?;
            }
            i if (3..3 + location_count).contains(&i) => {
                return Ok(view.show_on_map(i - 3, bus));
            }
            i if i == 3 + location_count => {
                let deleted = view.delete(db, &session, |prompt| confirm(prompt).unwrap_or(false))?;
                if deleted {
                    status("Deleted.");
                    return Ok(None);
                }
            }
            _ => return Ok(None),
        }
        view.select_tab(Tab::Details);
    }
}
