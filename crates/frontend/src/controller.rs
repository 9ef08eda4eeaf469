//! Map view-controller: user state, marker view-models and the bounds-fit gate.
//!
//! All state changes go through [`Controller::apply`], which returns the side
//! effect the view layer must perform. The controller never touches the
//! network or the DOM.

use geo_recommender_shared::geo::{is_valid_latitude, is_valid_longitude};
use geo_recommender_shared::models::{Neighbor, QueryParams};

pub const DEFAULT_AGE: u32 = 20;
pub const DEFAULT_LATITUDE: f64 = 51.515366;
pub const DEFAULT_LONGITUDE: f64 = -0.1109577;
pub const DEFAULT_ZOOM: u8 = 10;
pub const MAX_AGE: u32 = 150;

/// Minimum time between two bounds fits.
pub const FIT_DEBOUNCE_MS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}

impl Default for UserPosition {
    fn default() -> Self {
        UserPosition {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// Custom marker icon. Markers without one use the default pin.
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pub size: (f64, f64),
    pub popup_anchor: (f64, f64),
}

impl Icon {
    pub fn home() -> Self {
        Icon {
            size: (37.5, 60.0),
            popup_anchor: (0.0, -15.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub lat: f64,
    pub lng: f64,
    /// Popup content, already escaped.
    pub message: String,
    /// Avatar shown in the popup. The user is 0, neighbors count from 1.
    pub avatar: usize,
    pub icon: Option<Icon>,
    pub focus: bool,
    pub draggable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AgeChanged(u32),
    LatitudeChanged(f64),
    LongitudeChanged(f64),
    MarkerDragged { lat: f64, lng: f64 },
    ResponseArrived { request_id: u64, neighbors: Vec<Neighbor> },
    RequestFailed { request_id: u64, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryRequest {
    pub request_id: u64,
    pub params: QueryParams,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    /// Start this request, abandoning any in flight.
    Fetch(QueryRequest),
    /// Fit the map to [`Controller::bounds`], subject to the [`BoundsGate`].
    FitBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse { request_id: u64 },
}

#[derive(Debug, Clone)]
pub struct Controller {
    age: u32,
    user: UserPosition,
    markers: Vec<Marker>,
    bounds: Vec<(f64, f64)>,
    phase: Phase,
    next_request_id: u64,
    last_error: Option<String>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(DEFAULT_AGE, UserPosition::default())
    }
}

impl Controller {
    pub fn new(age: u32, user: UserPosition) -> Self {
        let markers = vec![user_marker(&user, age)];
        Controller {
            age,
            user,
            markers,
            bounds: vec![(user.latitude, user.longitude)],
            phase: Phase::Idle,
            next_request_id: 0,
            last_error: None,
        }
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn user(&self) -> UserPosition {
        self.user
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Positions to fit, user first.
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The request issued when the page first loads.
    pub fn initial_request(&mut self) -> Effect {
        self.issue_request()
    }

    pub fn apply(&mut self, event: Event) -> Effect {
        match event {
            Event::AgeChanged(age) => {
                if age > MAX_AGE {
                    return Effect::None;
                }
                self.age = age;
                self.markers[0].message = user_message(age);
                self.issue_request()
            }
            Event::LatitudeChanged(lat) => {
                if !is_valid_latitude(lat) {
                    return Effect::None;
                }
                self.move_user(lat, self.user.longitude)
            }
            Event::LongitudeChanged(lng) => {
                if !is_valid_longitude(lng) {
                    return Effect::None;
                }
                self.move_user(self.user.latitude, lng)
            }
            Event::MarkerDragged { lat, lng } => {
                if !is_valid_latitude(lat) || !is_valid_longitude(lng) {
                    return Effect::None;
                }
                self.move_user(lat, lng)
            }
            Event::ResponseArrived {
                request_id,
                neighbors,
            } => {
                if !self.is_current(request_id) {
                    return Effect::None;
                }
                self.markers = build_markers(&self.user, self.age, &neighbors);
                self.bounds = build_bounds(&self.user, &neighbors);
                self.phase = Phase::Idle;
                self.last_error = None;
                Effect::FitBounds
            }
            Event::RequestFailed { request_id, error } => {
                if !self.is_current(request_id) {
                    return Effect::None;
                }
                self.last_error = Some(error);
                self.phase = Phase::Idle;
                Effect::None
            }
        }
    }

    fn move_user(&mut self, lat: f64, lng: f64) -> Effect {
        self.user.latitude = lat;
        self.user.longitude = lng;
        self.markers[0].lat = lat;
        self.markers[0].lng = lng;
        self.issue_request()
    }

    fn is_current(&self, request_id: u64) -> bool {
        self.phase == Phase::AwaitingResponse { request_id }
    }

    fn issue_request(&mut self) -> Effect {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.phase = Phase::AwaitingResponse { request_id };
        Effect::Fetch(QueryRequest {
            request_id,
            params: QueryParams {
                latitude: self.user.latitude,
                longitude: self.user.longitude,
                age: self.age,
            },
        })
    }
}

/// Drops bounds fits that come within [`FIT_DEBOUNCE_MS`] of the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundsGate {
    last_fit_ms: Option<f64>,
}

impl BoundsGate {
    /// Whether a fit at `now_ms` should run. Records the time when it does.
    pub fn try_fit(&mut self, now_ms: f64) -> bool {
        if let Some(last) = self.last_fit_ms {
            if now_ms - last < FIT_DEBOUNCE_MS {
                return false;
            }
        }
        self.last_fit_ms = Some(now_ms);
        true
    }
}

pub fn user_marker(user: &UserPosition, age: u32) -> Marker {
    Marker {
        lat: user.latitude,
        lng: user.longitude,
        message: user_message(age),
        avatar: 0,
        icon: Some(Icon::home()),
        focus: true,
        draggable: true,
    }
}

/// User marker first, then one marker per neighbor in response order.
pub fn build_markers(user: &UserPosition, age: u32, neighbors: &[Neighbor]) -> Vec<Marker> {
    let mut markers = Vec::with_capacity(neighbors.len() + 1);
    markers.push(user_marker(user, age));
    markers.extend(neighbors.iter().enumerate().map(|(i, n)| Marker {
        lat: n.latitude,
        lng: n.longitude,
        message: neighbor_message(&n.name, n.age),
        avatar: i + 1,
        icon: None,
        focus: false,
        draggable: false,
    }));
    markers
}

pub fn build_bounds(user: &UserPosition, neighbors: &[Neighbor]) -> Vec<(f64, f64)> {
    let mut bounds = vec![(user.latitude, user.longitude)];
    for n in neighbors {
        bounds.push((n.latitude, n.longitude));
    }
    bounds
}

pub fn user_message(age: u32) -> String {
    format!("I'm <strong>you</strong>, and you told me I'm <strong>{age}</strong> years old.")
}

pub fn neighbor_message(raw_name: &str, age: u32) -> String {
    format!(
        "I'm <strong>{}</strong>, and I'm <strong>{age}</strong> years old.",
        display_name(raw_name)
    )
}

/// Stored names look like `first,last`; render them as `First Last`, escaped.
pub fn display_name(raw: &str) -> String {
    escape_html(&title_case(&raw.replacen(',', " ", 1)))
}

/// Uppercase the first character of each whitespace-delimited word and
/// lowercase the rest. Whitespace is kept as is.
///
/// When the uppercase form is several characters (`ß` to `SS`) only its first
/// stays uppercase, so the result is stable under a second pass.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            word_start = true;
            out.push(c);
        } else if word_start {
            let mut upper = c.to_uppercase();
            out.extend(upper.next());
            out.extend(upper.flat_map(char::to_lowercase));
            word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
