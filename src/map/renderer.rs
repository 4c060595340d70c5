use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use super::events::ShowLocation;
use super::grouper::{group_by_location, MarkerClick, MarkerGroup};
use super::widget::{Geolocator, MapWidget, MarkerId, MarkerSpec, MarkerStyle};
use super::{DEFAULT_ZOOM, FOCUS_ZOOM, TEMPORARY_MARKER_TTL};
use crate::db::{Database, Subscription};
use crate::error::{Error, StoreError};
use crate::models::{GeoPoint, Person};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("could not get current position: {0}")]
    Geolocation(String),
}

impl From<MapError> for Error {
    fn from(e: MapError) -> Self {
        Error::Device(e.to_string())
    }
}

/// Something the map asks its surroundings to do.
#[derive(Debug, Clone, PartialEq)]
pub enum MapSignal {
    /// Open the new-record form at this point.
    BeginNewRecord(GeoPoint),
    /// Close the modal that requested a recenter.
    CloseModal,
}

/// Where the map starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialView {
    pub center: GeoPoint,
    pub zoom: u8,
    /// True when the center came from the address rather than the default.
    pub focused: bool,
}

impl InitialView {
    /// Resolve from the `lat`/`lng` query parameters. Both must parse, otherwise
    /// the default center at overview zoom is used.
    pub fn from_query(lat: Option<&str>, lng: Option<&str>, default_center: GeoPoint) -> Self {
        match GeoPoint::parse_pair(lat, lng) {
            Some(center) => Self {
                center,
                zoom: FOCUS_ZOOM,
                focused: true,
            },
            None => Self {
                center: default_center,
                zoom: DEFAULT_ZOOM,
                focused: false,
            },
        }
    }
}

/// Owns one map widget and keeps its markers in step with the people snapshot.
pub struct MapRenderer<W: MapWidget> {
    widget: W,
    center: GeoPoint,
    zoom: u8,
    groups: Vec<MarkerGroup>,
    /// Parallel to `groups`.
    group_markers: Vec<MarkerId>,
    focus_marker: Option<MarkerId>,
    temporary: Vec<(MarkerId, Instant)>,
    position_marker: Option<MarkerId>,
    show_location: Option<broadcast::Receiver<ShowLocation>>,
}

impl<W: MapWidget> MapRenderer<W> {
    pub fn mount(mut widget: W, view: InitialView) -> Self {
        widget.set_view(view.center, view.zoom);
        let focus_marker = view.focused.then(|| {
            widget.add_marker(MarkerSpec {
                position: view.center,
                title: None,
                style: MarkerStyle::Focus,
            })
        });
        debug!(lat = view.center.latitude, lng = view.center.longitude, zoom = view.zoom, "map mounted");

        Self {
            widget,
            center: view.center,
            zoom: view.zoom,
            groups: Vec::new(),
            group_markers: Vec::new(),
            focus_marker,
            temporary: Vec::new(),
            position_marker: None,
            show_location: None,
        }
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn groups(&self) -> &[MarkerGroup] {
        &self.groups
    }

    pub fn has_focus_marker(&self) -> bool {
        self.focus_marker.is_some()
    }

    fn set_view(&mut self, center: GeoPoint, zoom: u8) {
        self.center = center;
        self.zoom = zoom;
        self.widget.set_view(center, zoom);
    }

    /// A click on empty map. Only a signed-in worker may start a record.
    pub fn handle_background_click(&self, point: GeoPoint, session: &Session) -> Option<MapSignal> {
        if session.is_authenticated() {
            Some(MapSignal::BeginNewRecord(point))
        } else {
            None
        }
    }

    /// Replace every group marker with markers for this snapshot.
    pub fn apply_snapshot(&mut self, people: &[Person]) {
        for id in self.group_markers.drain(..) {
            self.widget.remove_marker(id);
        }

        self.groups = group_by_location(people);
        for group in &self.groups {
            let id = self.widget.add_marker(MarkerSpec {
                position: group.position,
                title: Some(group.title()),
                style: MarkerStyle::Pin(group.category()),
            });
            self.group_markers.push(id);
        }
        debug!(people = people.len(), markers = self.groups.len(), "rendered markers");
    }

    pub fn group_for_marker(&self, marker: MarkerId) -> Option<&MarkerGroup> {
        self.group_markers
            .iter()
            .position(|&id| id == marker)
            .map(|i| &self.groups[i])
    }

    /// Resolve a marker click. Unknown markers (focus, position) do nothing.
    pub fn handle_marker_click(&self, marker: MarkerId) -> Option<MarkerClick> {
        self.group_for_marker(marker).map(MarkerGroup::click)
    }

    /// Jump to a point and flash a temporary marker there.
    pub fn recenter(&mut self, point: GeoPoint, now: Instant, from_modal: bool) -> Option<MapSignal> {
        self.set_view(point, FOCUS_ZOOM);
        let id = self.widget.add_marker(MarkerSpec {
            position: point,
            title: None,
            style: MarkerStyle::Focus,
        });
        self.temporary.push((id, now + TEMPORARY_MARKER_TTL));
        debug!(lat = point.latitude, lng = point.longitude, "recentered");

        from_modal.then_some(MapSignal::CloseModal)
    }

    /// Drop temporary markers whose time is up.
    pub fn tick(&mut self, now: Instant) {
        let widget = &mut self.widget;
        self.temporary.retain(|&(id, expires)| {
            if now >= expires {
                widget.remove_marker(id);
                false
            } else {
                true
            }
        });
    }

    pub fn temporary_marker_count(&self) -> usize {
        self.temporary.len()
    }

    pub fn listen(&mut self, receiver: broadcast::Receiver<ShowLocation>) {
        self.show_location = Some(receiver);
    }

    /// Handle queued `show-location` events, then expire temporary markers.
    pub fn pump_events(&mut self, now: Instant) -> Vec<MapSignal> {
        let mut points = Vec::new();
        if let Some(rx) = self.show_location.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(event) => points.push(event.point()),
                    Err(TryRecvError::Lagged(skipped)) => {
                        warn!(skipped, "show-location events dropped");
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }

        let signals = points
            .into_iter()
            .filter_map(|p| self.recenter(p, now, true))
            .collect();
        self.tick(now);
        signals
    }

    /// Center on the device position and redraw the "you are here" marker.
    ///
    /// On failure the map is left exactly as it was.
    pub fn locate_me<G: Geolocator + ?Sized>(&mut self, geolocator: &mut G) -> Result<GeoPoint, MapError> {
        let point = geolocator.current_position().map_err(|e| {
            warn!(error = %e, "geolocation failed");
            MapError::Geolocation(e)
        })?;

        self.set_view(point, DEFAULT_ZOOM);
        if let Some(old) = self.position_marker.take() {
            self.widget.remove_marker(old);
        }
        self.position_marker = Some(self.widget.add_marker(MarkerSpec {
            position: point,
            title: Some("You are here".to_string()),
            style: MarkerStyle::CurrentPosition,
        }));
        Ok(point)
    }
}

/// A renderer wired to the live people query.
///
/// Dropping the view tears down the subscription.
pub struct MapView<W: MapWidget> {
    renderer: Rc<RefCell<MapRenderer<W>>>,
    subscription: Subscription,
}

impl<W: MapWidget + 'static> MapView<W> {
    /// Snapshot errors are logged and leave the current markers in place.
    pub fn attach(db: &Database, renderer: MapRenderer<W>) -> Result<Self, StoreError> {
        let renderer = Rc::new(RefCell::new(renderer));
        let sink = Rc::clone(&renderer);
        let subscription = db.subscribe_persons(move |people| match people {
            Ok(people) => sink.borrow_mut().apply_snapshot(&people),
            Err(e) => warn!(error = %e, "people snapshot failed"),
        })?;
        info!(subscription = subscription.id(), "map attached to people feed");

        Ok(Self {
            renderer,
            subscription,
        })
    }

    /// Borrow the renderer. Release before writing to the store.
    pub fn renderer(&self) -> Ref<'_, MapRenderer<W>> {
        self.renderer.borrow()
    }

    pub fn renderer_mut(&self) -> RefMut<'_, MapRenderer<W>> {
        self.renderer.borrow_mut()
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_active()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::map::{LocationBus, DEFAULT_CENTER};
    use crate::models::{Category, Location};
    use std::collections::BTreeMap;
    use std::time::Duration;

    /// Widget that just remembers what it was told.
    #[derive(Default)]
    pub(crate) struct RecordingWidget {
        pub view: Option<(GeoPoint, u8)>,
        pub markers: BTreeMap<MarkerId, MarkerSpec>,
        next: MarkerId,
    }

    impl MapWidget for RecordingWidget {
        fn set_view(&mut self, center: GeoPoint, zoom: u8) {
            self.view = Some((center, zoom));
        }

        fn add_marker(&mut self, marker: MarkerSpec) -> MarkerId {
            self.next += 1;
            self.markers.insert(self.next, marker);
            self.next
        }

        fn remove_marker(&mut self, id: MarkerId) {
            self.markers.remove(&id);
        }
    }

    impl RecordingWidget {
        fn count(&self, style: MarkerStyle) -> usize {
            self.markers.values().filter(|m| m.style == style).count()
        }

        fn pins(&self) -> Vec<&MarkerSpec> {
            self.markers
                .values()
                .filter(|m| matches!(m.style, MarkerStyle::Pin(_)))
                .collect()
        }
    }

    struct FixedGeolocator(Result<GeoPoint, String>);

    impl Geolocator for FixedGeolocator {
        fn current_position(&mut self) -> Result<GeoPoint, String> {
            self.0.clone()
        }
    }

    fn person(id: &str, category: Category, lat: f64, lng: f64) -> Person {
        let mut p = Person::new(id.to_uppercase());
        p.id = id.to_string();
        p.category = category;
        p.locations.push(Location::new(GeoPoint::new(lat, lng)));
        p
    }

    fn mounted() -> MapRenderer<RecordingWidget> {
        MapRenderer::mount(
            RecordingWidget::default(),
            InitialView::from_query(None, None, DEFAULT_CENTER),
        )
    }

    #[test]
    fn test_initial_view_default() {
        let view = InitialView::from_query(None, Some("139.0"), DEFAULT_CENTER);
        assert_eq!(view.center, DEFAULT_CENTER);
        assert_eq!(view.zoom, DEFAULT_ZOOM);
        assert!(!view.focused);

        let r = mounted();
        assert_eq!(r.widget().view, Some((DEFAULT_CENTER, DEFAULT_ZOOM)));
        assert!(!r.has_focus_marker());
    }

    #[test]
    fn test_initial_view_from_query() {
        let view = InitialView::from_query(Some("35.7"), Some("139.8"), DEFAULT_CENTER);
        assert_eq!(view.center, GeoPoint::new(35.7, 139.8));
        assert_eq!(view.zoom, FOCUS_ZOOM);

        let r = MapRenderer::mount(RecordingWidget::default(), view);
        assert!(r.has_focus_marker());
        assert_eq!(r.widget().count(MarkerStyle::Focus), 1);

        let bad = InitialView::from_query(Some("north"), Some("139.8"), DEFAULT_CENTER);
        assert!(!bad.focused);
    }

    #[test]
    fn test_background_click_requires_session() {
        let r = mounted();
        let p = GeoPoint::new(1.0, 2.0);
        assert_eq!(
            r.handle_background_click(p, &Session::signed_in("aki")),
            Some(MapSignal::BeginNewRecord(p))
        );
        assert_eq!(r.handle_background_click(p, &Session::anonymous()), None);
    }

    #[test]
    fn test_snapshot_replaces_markers() {
        let mut r = mounted();
        r.apply_snapshot(&[
            person("a", Category::Regular, 1.0, 1.0),
            person("b", Category::New, 1.0, 1.0),
            person("c", Category::New, 2.0, 2.0),
        ]);
        let pins = r.widget().pins();
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[0].style, MarkerStyle::Pin(Category::Regular));
        assert_eq!(pins[0].title.as_deref(), Some("2 people at this location"));

        r.apply_snapshot(&[person("c", Category::New, 2.0, 2.0)]);
        let pins = r.widget().pins();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].title.as_deref(), Some("C - location"));
        assert_eq!(r.groups().len(), 1);
    }

    #[test]
    fn test_marker_click_resolution() {
        let mut r = mounted();
        r.apply_snapshot(&[
            person("a", Category::New, 1.0, 1.0),
            person("b", Category::New, 1.0, 1.0),
            person("c", Category::New, 2.0, 2.0),
        ]);
        let ids: Vec<MarkerId> = r.widget().markers.keys().copied().collect();

        assert!(matches!(r.handle_marker_click(ids[0]), Some(MarkerClick::ChooseAmong(ref e)) if e.len() == 2));
        assert_eq!(
            r.handle_marker_click(ids[1]),
            Some(MarkerClick::OpenDetail {
                person_id: "c".to_string()
            })
        );
        assert_eq!(r.handle_marker_click(999), None);
    }

    #[test]
    fn test_recenter_temporary_marker_expires() {
        let mut r = mounted();
        let start = Instant::now();
        let p = GeoPoint::new(35.0, 139.0);

        assert_eq!(r.recenter(p, start, false), None);
        assert_eq!(r.center(), p);
        assert_eq!(r.zoom(), FOCUS_ZOOM);
        assert_eq!(r.widget().count(MarkerStyle::Focus), 1);

        r.tick(start + Duration::from_secs(2));
        assert_eq!(r.temporary_marker_count(), 1);
        r.tick(start + Duration::from_secs(3));
        assert_eq!(r.temporary_marker_count(), 0);
        assert_eq!(r.widget().count(MarkerStyle::Focus), 0);
    }

    #[test]
    fn test_show_location_event_recenters_and_closes_modal() {
        let bus = LocationBus::default();
        let mut r = mounted();
        r.listen(bus.subscribe());

        bus.publish(GeoPoint::new(10.0, 20.0));
        let signals = r.pump_events(Instant::now());
        assert_eq!(signals, vec![MapSignal::CloseModal]);
        assert_eq!(r.center(), GeoPoint::new(10.0, 20.0));
        assert_eq!(r.temporary_marker_count(), 1);

        assert!(r.pump_events(Instant::now()).is_empty());
    }

    #[test]
    fn test_locate_me_replaces_position_marker() {
        let mut r = mounted();
        let mut geo = FixedGeolocator(Ok(GeoPoint::new(5.0, 6.0)));
        r.locate_me(&mut geo).unwrap();
        geo.0 = Ok(GeoPoint::new(7.0, 8.0));
        r.locate_me(&mut geo).unwrap();

        assert_eq!(r.widget().count(MarkerStyle::CurrentPosition), 1);
        assert_eq!(r.center(), GeoPoint::new(7.0, 8.0));
        assert_eq!(r.zoom(), DEFAULT_ZOOM);
    }

    #[test]
    fn test_locate_me_failure_leaves_map() {
        let mut r = mounted();
        let mut geo = FixedGeolocator(Err("permission denied".to_string()));
        let err = r.locate_me(&mut geo).unwrap_err();

        assert!(err.to_string().contains("permission denied"));
        assert_eq!(r.center(), DEFAULT_CENTER);
        assert_eq!(r.widget().count(MarkerStyle::CurrentPosition), 0);
        assert!(matches!(Error::from(err), Error::Device(_)));
    }

    #[test]
    fn test_map_view_follows_store() {
        let db = Database::open_memory().unwrap();
        db.insert_person(&person("a", Category::New, 1.0, 1.0)).unwrap();

        let view = MapView::attach(&db, mounted()).unwrap();
        assert_eq!(view.renderer().widget().pins().len(), 1);

        db.insert_person(&person("b", Category::New, 3.0, 3.0)).unwrap();
        assert_eq!(view.renderer().widget().pins().len(), 2);

        drop(view);
        assert_eq!(db.subscriber_count(), 0);
    }
}
