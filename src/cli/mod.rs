use clap::{Args, Parser, Subcommand};

use crate::models::GeoPoint;

pub mod add;
pub mod config;
pub mod delete;
pub mod edit;
pub mod map;
pub mod people;
pub mod record;
pub mod show;
pub mod terminal;
pub mod ui;

pub use add::{run_add, run_visit};
pub use config::run_config;
pub use delete::run_delete;
pub use edit::run_edit;
pub use map::run_map;
pub use people::run_people;
pub use record::{run_edit_conversation, run_record};
pub use show::run_show;

#[derive(Parser)]
#[command(name = "outreachmap")]
#[command(about = "Map-based case notes for street outreach")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show everyone on the map
    Map(MapArgs),
    /// List people, optionally filtered
    People(PeopleArgs),
    /// Show a person's details and conversations
    Show(ShowArgs),
    /// Register a new person at a point
    Add(AddArgs),
    /// Record another sighting of someone already known
    Visit(VisitArgs),
    /// Edit a person's details and locations
    Edit(ShowArgs),
    /// Record a conversation with a person
    Record(RecordArgs),
    /// Edit a saved conversation
    EditConversation(EditConversationArgs),
    /// Delete a person
    Delete(DeleteArgs),
    /// Show or change settings
    Config(ConfigArgs),
}

/// Parse `LAT,LNG`.
pub fn parse_point(s: &str) -> Result<GeoPoint, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got '{}'", s))?;
    GeoPoint::parse_pair(Some(lat), Some(lng)).ok_or_else(|| format!("invalid coordinate '{}'", s))
}

#[derive(Args)]
pub struct MapArgs {
    /// Latitude to focus on
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<String>,
    /// Longitude to focus on
    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<String>,
    /// Current device position, for "you are here"
    #[arg(long, value_name = "LAT,LNG", value_parser = parse_point, allow_hyphen_values = true)]
    pub here: Option<GeoPoint>,
}

#[derive(Args)]
pub struct PeopleArgs {
    /// Search nickname and features
    #[arg(default_value = "")]
    pub search: String,
    /// new, occasional or regular
    #[arg(short, long)]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Person id, nickname or features
    pub identifier: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Where the person was seen
    #[arg(value_name = "LAT,LNG", value_parser = parse_point, allow_hyphen_values = true)]
    pub at: GeoPoint,
    #[arg(short, long)]
    pub nickname: Option<String>,
    #[arg(short, long)]
    pub age_group: Option<String>,
    /// new, occasional or regular
    #[arg(short, long)]
    pub category: Option<String>,
    #[arg(short, long)]
    pub features: Option<String>,
    /// Path to a profile image (jpg, png, gif; up to 5 MB)
    #[arg(short, long)]
    pub photo: Option<String>,
}

#[derive(Args)]
pub struct VisitArgs {
    /// Person id, nickname or features
    pub identifier: String,
    /// Where the person was seen
    #[arg(value_name = "LAT,LNG", value_parser = parse_point, allow_hyphen_values = true)]
    pub at: GeoPoint,
    #[arg(short, long, default_value = "")]
    pub description: String,
}

#[derive(Args)]
pub struct RecordArgs {
    /// Person id, nickname or features
    pub identifier: String,
    /// Transcript text; prompted for when omitted
    #[arg(short, long)]
    pub transcript: Option<String>,
}

#[derive(Args)]
pub struct EditConversationArgs {
    pub id: String,
    #[arg(short, long)]
    pub transcript: Option<String>,
    #[arg(short, long)]
    pub summary: Option<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Person id, nickname or features
    pub identifier: String,
    /// Skip confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Sign in as this worker
    #[arg(long, conflicts_with = "sign_out")]
    pub user: Option<String>,
    #[arg(long)]
    pub sign_out: bool,
    /// Default map center
    #[arg(long, value_name = "LAT,LNG", value_parser = parse_point, allow_hyphen_values = true)]
    pub center: Option<GeoPoint>,
}
