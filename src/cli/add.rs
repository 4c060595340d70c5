use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::Utc;

use crate::config::Settings;
use crate::db::Database;
use crate::form::{add_location_to_existing, register_person, search_people, NewPerson};
use crate::models::{Category, GeoPoint};
use crate::photo::{ImageUpload, PhotoStore};
use crate::session::Session;

use super::ui::{person_choice, select, status, text_input};

/// Execute the add command
#[allow(clippy::too_many_arguments)]
pub fn run_add(
    db: &Database,
    settings: &Settings,
    at: GeoPoint,
    nickname: Option<String>,
    age_group: Option<String>,
    category: Option<String>,
    features: Option<String>,
    photo: Option<String>,
) -> Result<()> {
    let is_interactive = nickname.is_none();

    let nickname = match nickname {
        Some(n) => n,
        None => text_input("nickname:", None)?.unwrap_or_default(),
    };
    let mut draft = NewPerson::new(nickname);

    if is_interactive {
        draft.age_group = text_input("age group:", None)?.unwrap_or_default();
        draft.features = text_input("features:", None)?.unwrap_or_default();
        let labels: Vec<&str> = Category::all().iter().map(|c| c.label()).collect();
        draft.category = select("category:", &labels)?
            .map(|i| Category::all()[i])
            .unwrap_or_default();
    } else {
        draft.age_group = age_group.unwrap_or_default();
        draft.features = features.unwrap_or_default();
        draft.category = category.as_deref().map(Category::parse).unwrap_or_default();
    }

    if let Some(path) = photo {
        let path = Path::new(&path);
        if !path.exists() {
            return Err(anyhow!("Image file not found: {}", path.display()));
        }
        draft.image = Some(ImageUpload::from_path(path)?);
    }

    add_person(db, &settings.session(), draft, at)
}

/// Register a drafted person; photos go to the local photo store.
pub fn add_person(db: &Database, session: &Session, draft: NewPerson, at: GeoPoint) -> Result<()> {
    let mut photos = PhotoStore::open_default()?;
    let id = register_person(db, &mut photos, session, draft, at, Utc::now())?;
    status(&format!("Added. ({})", id));
    Ok(())
}

/// Execute the visit command
pub fn run_visit(
    db: &Database,
    settings: &Settings,
    identifier: &str,
    at: GeoPoint,
    description: &str,
) -> Result<()> {
    let mut candidates = match db.get_person(identifier.trim())? {
        Some(p) => vec![p],
        None => search_people(db, identifier)?,
    };

    let selected = match candidates.len() {
        0 => None,
        1 => candidates.pop(),
        _ => {
            let labels: Vec<String> = candidates.iter().map(person_choice).collect();
            select("Select:", &labels)?.map(|i| candidates.swap_remove(i))
        }
    };

    let person = add_location_to_existing(
        db,
        &settings.session(),
        selected.as_ref().map(|p| p.id.as_str()),
        at,
        description,
        Utc::now(),
    )?;
    status(&format!("Recorded. {} has {} locations.", person.nickname, person.locations.len()));
    Ok(())
}
