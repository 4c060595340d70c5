use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::Utc;

use crate::config::Settings;
use crate::db::Database;
use crate::detail::{DetailPresenter, LocationField, PersonField, ViewContext};
use crate::error::Error;
use crate::models::Category;
use crate::session::Session;

use super::show::print_person;
use super::ui::{error, find_person, select, status, text_input, warning};

/// Execute the edit command
pub fn run_edit(db: &Database, settings: &Settings, identifier: &str) -> Result<()> {
    let Some(person) = find_person(db, identifier)? else {
        return Err(anyhow!("No person found matching '{}'.", identifier.trim()));
    };
    let mut view = DetailPresenter::open(db, &person.id, ViewContext::Page)?;
    edit_person(db, &settings.session(), &mut view)
}

fn edit_location(view: &mut DetailPresenter, index: usize) -> Result<()> {
    let Some(loc) = view.working().locations.get(index).cloned() else {
        return Ok(());
    };
    let description = loc.description.clone().unwrap_or_default();

    if let Some(v) = text_input("latitude:", Some(&loc.latitude.to_string()))? {
        view.set_location_field(index, LocationField::Latitude, &v)?;
    }
    if let Some(v) = text_input("longitude:", Some(&loc.longitude.to_string()))? {
        view.set_location_field(index, LocationField::Longitude, &v)?;
    }
    if let Some(v) = text_input("description:", Some(&description))? {
        view.set_location_field(index, LocationField::Description, &v)?;
    }
    Ok(())
}

/// Edit loop over the working copy. Nothing is written until Save.
pub fn edit_person(db: &Database, session: &Session, view: &mut DetailPresenter) -> Result<()> {
    loop {
        print_person(view.working());
        println!();

        let location_count = view.working().locations.len();
        let mut actions = vec![
            "Nickname".to_string(),
            "Age group".to_string(),
            "Category".to_string(),
            "Features".to_string(),
        ];
        actions.extend((1..=location_count).map(|i| format!("Location {}", i)));
        actions.extend(["Add location", "Remove location", "Save", "Cancel"].map(String::from));

        let Some(choice) = select("Edit:", &actions)? else {
            view.reset();
            return Ok(());
        };

        match choice {
            0 => {
                let current = view.working().nickname.clone();
                if let Some(v) = text_input("nickname:", Some(&current))? {
                    view.set_field(PersonField::Nickname, &v);
                }
            }
            1 => {
                let current = view.working().age_group().to_string();
                if let Some(v) = text_input("age group:", Some(&current))? {
                    view.set_field(PersonField::AgeGroup, &v);
                }
            }
            2 => {
                let labels: Vec<&str> = Category::all().iter().map(|c| c.label()).collect();
                if let Some(i) = select("category:", &labels)? {
                    view.set_field(PersonField::Category, Category::all()[i].as_str());
                }
            }
            3 => {
                let current = view.working().features.clone();
                if let Some(v) = text_input("features:", Some(&current))? {
                    view.set_field(PersonField::Features, &v);
                }
            }
            i if i < 4 + location_count => edit_location(view, i - 4)?,
            i if i == 4 + location_count => {
                view.add_location(Utc::now());
                let last = view.working().locations.len() - 1;
                edit_location(view, last)?;
            }
            i if i == 5 + location_count => {
                let labels: Vec<String> = view
                    .working()
                    .locations
                    .iter()
                    .map(|l| l.label().to_string())
                    .collect();
                if let Some(index) = select("remove:", &labels)? {
                    if let Err(e) = view.remove_location(index) {
                        warning(&e.to_string());
                    }
                }
            }
            i if i == 6 + location_count => match view.save(db, session, Instant::now()) {
                Ok(()) => {
                    status("Saved.");
                    return Ok(());
                }
                Err(e @ (Error::Validation(_) | Error::Unauthorized)) => error(&e.to_string()),
                Err(e) => return Err(e.into()),
            },
            _ => {
                view.reset();
                return Ok(());
            }
        }
    }
}
