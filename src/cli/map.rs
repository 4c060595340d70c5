use std::time::Instant;

use anyhow::Result;
use tracing::debug;

use crate::config::Settings;
use crate::db::Database;
use crate::detail::{DetailPresenter, Navigation, ViewContext};
use crate::form::NewPerson;
use crate::map::{
    Geolocator, InitialView, LocationBus, MapRenderer, MapSignal, MapView, MarkerClick, MarkerId,
};
use crate::models::GeoPoint;

use super::add::add_person;
use super::parse_point;
use super::show::run_detail;
use super::terminal::TerminalMap;
use super::ui::{error, select, status, text_input, warning};

/// Position handed in on the command line.
struct GivenPosition(Option<GeoPoint>);

impl Geolocator for GivenPosition {
    fn current_position(&mut self) -> Result<GeoPoint, String> {
        self.0.ok_or_else(|| "no position available; pass --here LAT,LNG".to_string())
    }
}

enum MapAction {
    Marker(MarkerId),
    NewRecord,
    LocateMe,
    Quit,
}

/// Execute the map command
pub fn run_map(
    db: &Database,
    settings: &Settings,
    lat: Option<&str>,
    lng: Option<&str>,
    here: Option<GeoPoint>,
) -> Result<()> {
    let view = InitialView::from_query(lat, lng, settings.default_center);
    let map = MapView::attach(db, MapRenderer::mount(TerminalMap::new(), view))?;
    let bus = LocationBus::default();
    map.renderer_mut().listen(bus.subscribe());

    let session = settings.session();
    let mut geolocator = GivenPosition(here);

    loop {
        let signals = map.renderer_mut().pump_events(Instant::now());
        debug!(signals = signals.len(), "map events handled");

        let (text, mut actions, mut labels) = {
            let renderer = map.renderer();
            let widget = renderer.widget();
            let mut actions = Vec::new();
            let mut labels = Vec::new();
            for (id, marker) in widget.pins() {
                actions.push(MapAction::Marker(id));
                labels.push(marker.title.clone().unwrap_or_default());
            }
            (widget.render(), actions, labels)
        };
        print!("{}", text);
        println!();

        actions.extend([MapAction::NewRecord, MapAction::LocateMe, MapAction::Quit]);
        labels.extend(["Record someone here", "Where am I?", "Quit"].map(String::from));

        let Some(choice) = select("Map:", &labels)? else {
            return Ok(());
        };

        match &actions[choice] {
            MapAction::Marker(id) => {
                let click = map.renderer().handle_marker_click(*id);
                let person_id = match click {
                    Some(MarkerClick::OpenDetail { person_id }) => Some(person_id),
                    Some(MarkerClick::ChooseAmong(entries)) => {
                        let labels: Vec<String> = entries
                            .iter()
                            .map(|e| format!("{}  {}", e.nickname, e.detail))
                            .collect();
                        select("Select:", &labels)?.map(|i| entries[i].person_id.clone())
                    }
                    None => None,
                };
                if let Some(person_id) = person_id {
                    open_modal(db, settings, &person_id, &bus)?;
                }
            }
            MapAction::NewRecord => {
                let Some(input) = text_input("point (LAT,LNG):", None)? else {
                    continue;
                };
                let point = match parse_point(&input) {
                    Ok(p) => p,
                    Err(e) => {
                        error(&e);
                        continue;
                    }
                };
                let signal = map.renderer().handle_background_click(point, &session);
                match signal {
                    Some(MapSignal::BeginNewRecord(point)) => {
                        let nickname = text_input("nickname:", None)?.unwrap_or_default();
                        let features = text_input("features:", None)?.unwrap_or_default();
                        let mut draft = NewPerson::new(nickname);
                        draft.features = features;
                        if let Err(e) = add_person(db, &session, draft, point) {
                            error(&e.to_string());
                        }
                    }
                    _ => warning("Sign in first: outreachmap config --user NAME"),
                }
            }
            MapAction::LocateMe => {
                if let Err(e) = map.renderer_mut().locate_me(&mut geolocator) {
                    error(&e.to_string());
                }
            }
            MapAction::Quit => return Ok(()),
        }
    }
}

/// Detail view over the map. Requests to show a location recenter the map.
fn open_modal(db: &Database, settings: &Settings, person_id: &str, bus: &LocationBus) -> Result<()> {
    let mut view = match DetailPresenter::open(db, person_id, ViewContext::Modal) {
        Ok(v) => v,
        Err(e) => {
            error(&e.to_string());
            return Ok(());
        }
    };
    if let Some(Navigation::CloseModal) = run_detail(db, settings, &mut view, bus)? {
        status("Showing on map.");
    }
    Ok(())
}
