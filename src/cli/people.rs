use anyhow::{anyhow, Result};

use crate::db::Database;
use crate::directory::{list_people, DirectoryFilter};
use crate::models::{Category, Person};

use super::ui::truncate;

/// Execute the people command
pub fn run_people(db: &Database, search: &str, category: Option<&str>) -> Result<()> {
    let category = match category {
        None => None,
        Some(c) => Some(parse_category_filter(c)?),
    };
    let filter = DirectoryFilter {
        search: search.to_string(),
        category,
    };

    let people = list_people(db, &filter)?;
    if people.is_empty() {
        println!("No matches.");
        return Ok(());
    }

    for person in &people {
        println!("{}", format_row(person));
    }
    println!("\n{} people", people.len());
    Ok(())
}

/// Unlike stored values, a typed filter must name a real category.
fn parse_category_filter(s: &str) -> Result<Category> {
    Category::all()
        .into_iter()
        .find(|c| c.as_str() == s.trim().to_lowercase())
        .ok_or_else(|| anyhow!("Unknown category '{}'. Use new, occasional or regular.", s))
}

fn format_row(person: &Person) -> String {
    format!(
        "{:<20} {:<10} {:<16} {}  {}",
        truncate(&person.nickname, 20),
        person.category.as_str(),
        person.last_seen,
        truncate(&person.features, 30),
        person.id
    )
}
