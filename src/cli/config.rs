use anyhow::Result;

use crate::config::Settings;
use crate::db::Database;
use crate::models::GeoPoint;

use super::ui::status;

/// Execute the config command: change what was asked for, then show the result.
pub fn run_config(db: &Database, user: Option<&str>, sign_out: bool, center: Option<GeoPoint>) -> Result<()> {
    if sign_out {
        Settings::save_user(db, None)?;
        status("Signed out.");
    } else if let Some(user) = user {
        Settings::save_user(db, Some(user))?;
        status("Signed in.");
    }
    if let Some(center) = center {
        Settings::save_default_center(db, center)?;
    }

    let settings = Settings::load(db)?;
    println!("user:   {}", settings.user.as_deref().unwrap_or("(not signed in)"));
    println!(
        "center: {:.6}, {:.6}",
        settings.default_center.latitude, settings.default_center.longitude
    );
    println!("data:   {}", Database::data_dir()?.display());
    Ok(())
}
