use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;

use crate::controller::{escape_html, Marker};
use crate::coords::Viewport;
use crate::images;
use crate::tiles::{self, tile_url, visible_tiles};

pub const MAP_CONTAINER_ID: &str = "recommender-map-container";

/// Drag threshold in pixels; movement below this is treated as a click.
const DRAG_THRESHOLD: f64 = 3.0;

/// Pick radius around a marker, in container pixels.
const HIT_RADIUS: f64 = 20.0;

/// Target spacing between graticule lines, in pixels.
const GRATICULE_SPACING_PX: f64 = 80.0;
const GRATICULE_STEPS: [f64; 13] = [
    0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0,
];
const MAX_GRATICULE_LINES: usize = 200;

const PIN_RADIUS: f64 = 9.0;
/// Radius of the dot drawn at the user position under the home icon.
const USER_DOT_RADIUS: f64 = 6.0;

/// Image sources the overlay draws from.
#[derive(Debug, Clone, Copy)]
struct Sources<'a> {
    tile_template: &'a str,
    home_icon: &'a str,
}

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

fn container_rect() -> Option<web_sys::DomRect> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(MAP_CONTAINER_ID)?;
    Some(element.get_bounding_client_rect())
}

/// Live size of the map container.
pub fn container_size() -> Option<(f64, f64)> {
    let rect = container_rect()?;
    (rect.width() > 0.0 && rect.height() > 0.0).then(|| (rect.width(), rect.height()))
}

fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

// ---------------------------------------------------------------------------
// Pure rendering helpers
// ---------------------------------------------------------------------------

/// Index of the nearest position within `threshold`.
fn find_nearest(positions: &[(f64, f64)], click: (f64, f64), threshold: f64) -> Option<usize> {
    let mut best_idx = None;
    let mut best_dist = threshold;
    for (i, pos) in positions.iter().enumerate() {
        let dx = pos.0 - click.0;
        let dy = pos.1 - click.1;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < best_dist {
            best_dist = dist;
            best_idx = Some(i);
        }
    }
    best_idx
}

/// Degrees between graticule lines so they sit at least ~80 px apart.
fn graticule_step(viewport: &Viewport) -> f64 {
    let px_per_degree = crate::coords::TILE_SIZE * 2f64.powf(viewport.zoom) / 360.0;
    GRATICULE_STEPS
        .iter()
        .copied()
        .find(|step| step * px_per_degree >= GRATICULE_SPACING_PX)
        .unwrap_or(90.0)
}

fn graticule_values(from: f64, to: f64, step: f64) -> impl Iterator<Item = f64> {
    let start = (from / step).floor() as i64;
    let end = (to / step).ceil() as i64;
    (start..=end)
        .take(MAX_GRATICULE_LINES)
        .map(move |i| i as f64 * step)
}

fn build_graticule(svg: &mut String, viewport: &Viewport) {
    let step = graticule_step(viewport);
    let (north, west) = viewport.unproject(0.0, 0.0);
    let (south, east) = viewport.unproject(viewport.width, viewport.height);

    for lng in graticule_values(west, east, step).filter(|l| (-180.0..=180.0).contains(l)) {
        let (x, _) = viewport.project(0.0, lng);
        svg.push_str(&format!(
            r#"<line class="graticule" x1="{x:.1}" y1="0" x2="{x:.1}" y2="{:.1}"/>"#,
            viewport.height
        ));
    }
    for lat in graticule_values(south, north, step).filter(|l| (-90.0..=90.0).contains(l)) {
        let (_, y) = viewport.project(lat, 0.0);
        svg.push_str(&format!(
            r#"<line class="graticule" x1="0" y1="{y:.1}" x2="{:.1}" y2="{y:.1}"/>"#,
            viewport.width
        ));
    }
}

fn build_tiles(svg: &mut String, viewport: &Viewport, template: &str) {
    for tile in visible_tiles(viewport) {
        svg.push_str(&format!(
            r#"<image class="tile" href="{}" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" preserveAspectRatio="none"/>"#,
            escape_html(&tile_url(template, tile.id)),
            tile.left,
            tile.top,
            tile.size,
            tile.size
        ));
    }
}

fn build_marker(svg: &mut String, marker: &Marker, index: usize, pos: (f64, f64), sources: &Sources) {
    let (x, y) = pos;
    match &marker.icon {
        Some(icon) => {
            // The dot stays visible if the image fails to load
            let (w, h) = icon.size;
            svg.push_str(&format!(
                r#"<circle class="marker marker-user marker-user-dot" cx="{x:.1}" cy="{y:.1}" r="{USER_DOT_RADIUS}"/>"#
            ));
            // Anchored at the bottom center of the image
            svg.push_str(&format!(
                r#"<image class="marker marker-user" href="{}" x="{:.1}" y="{:.1}" width="{w}" height="{h}"/>"#,
                escape_html(sources.home_icon),
                x - w / 2.0,
                y - h
            ));
        }
        None => {
            svg.push_str(&format!(
                r#"<circle class="marker marker-neighbor" cx="{x:.1}" cy="{y:.1}" r="{PIN_RADIUS}"/><text class="marker-label" x="{x:.1}" y="{:.1}" text-anchor="middle">{index}</text>"#,
                y + 4.0
            ));
        }
    }
}

/// SVG overlay for the given view. `drag` overrides the user marker position
/// while it is being dragged.
fn build_svg(viewport: &Viewport, markers: &[Marker], drag: Option<(f64, f64)>, sources: &Sources) -> String {
    let mut svg = String::new();
    build_tiles(&mut svg, viewport, sources.tile_template);
    build_graticule(&mut svg, viewport);

    // Neighbors first so the user marker stays on top
    for (i, marker) in markers.iter().enumerate().skip(1) {
        build_marker(&mut svg, marker, i, viewport.project(marker.lat, marker.lng), sources);
    }
    if let Some(user) = markers.first() {
        let pos = drag.unwrap_or_else(|| viewport.project(user.lat, user.lng));
        build_marker(&mut svg, user, 0, pos, sources);
    }

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" style="position:absolute;top:0;left:0;pointer-events:none;">{svg}</svg>"#,
        w = viewport.width,
        h = viewport.height,
    )
}

/// Where a marker's popup opens, in container pixels.
fn popup_position(viewport: &Viewport, marker: &Marker) -> (f64, f64) {
    let (x, y) = viewport.project(marker.lat, marker.lng);
    match &marker.icon {
        Some(icon) => (x + icon.popup_anchor.0, y - icon.size.1 - icon.popup_anchor.1.abs()),
        None => (x, y - PIN_RADIUS * 2.0),
    }
}

/// Pixel positions used for hit testing. Icons are picked around their center.
fn hit_positions(viewport: &Viewport, markers: &[Marker]) -> Vec<(f64, f64)> {
    markers
        .iter()
        .map(|m| {
            let (x, y) = viewport.project(m.lat, m.lng);
            match &m.icon {
                Some(icon) => (x, y - icon.size.1 / 2.0),
                None => (x, y),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragMode {
    Idle,
    Map { start: (f64, f64), start_view: Viewport, moved: bool },
    UserMarker { grab: (f64, f64), moved: bool },
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[component]
pub fn MapView(
    markers: Vec<Marker>,
    viewport: Signal<Viewport>,
    on_marker_drag: EventHandler<(f64, f64)>,
) -> Element {
    let mut viewport = viewport;
    let mut drag = use_signal(|| DragMode::Idle);
    let mut drag_preview = use_signal(|| None::<(f64, f64)>);
    // Focused markers open with their popup shown
    let mut open_popup = use_signal(|| Some(0usize));

    let vp = *viewport.read();
    let home_icon = images::home_icon();
    let sources = Sources {
        tile_template: tiles::tile_url_template(),
        home_icon: &home_icon,
    };
    let svg_html = build_svg(&vp, &markers, *drag_preview.read(), &sources);

    let popup = (*open_popup.read())
        .and_then(|i| markers.get(i))
        .filter(|_| drag_preview.read().is_none())
        .map(|m| {
            let (x, y) = popup_position(&vp, m);
            (x, y, m.message.clone(), images::avatar(m.avatar), m.draggable)
        });

    let hits = hit_positions(&vp, &markers);
    let user_hit = hits.first().copied();
    let draggable = markers.first().map(|m| m.draggable).unwrap_or(false);
    let container_class = if matches!(*drag.read(), DragMode::Idle) {
        "map-container"
    } else {
        "map-container dragging"
    };

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "{container_class}",

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();
                let delta_y = wheel_delta_y(evt.data().delta());
                let step = if delta_y < 0.0 { 1.0 } else { -1.0 };
                let current = *viewport.peek();
                viewport.set(current.zoomed(step));
            },

            onmousedown: move |evt: Event<MouseData>| {
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let Some(rect) = container_rect() else { return };
                let client = evt.client_coordinates();
                let point = (client.x - rect.left(), client.y - rect.top());

                let on_user = draggable
                    && user_hit.is_some_and(|u| find_nearest(&[u], point, HIT_RADIUS).is_some());
                if on_user {
                    let current = *viewport.peek();
                    let (ux, uy) = user_hit.unwrap_or(point);
                    // Keep the offset between the pointer and the marker anchor
                    let anchor = markers
                        .first()
                        .map(|m| current.project(m.lat, m.lng))
                        .unwrap_or((ux, uy));
                    drag.set(DragMode::UserMarker {
                        grab: (anchor.0 - point.0, anchor.1 - point.1),
                        moved: false,
                    });
                } else {
                    drag.set(DragMode::Map {
                        start: point,
                        start_view: *viewport.peek(),
                        moved: false,
                    });
                }
            },

            onmousemove: move |evt: Event<MouseData>| {
                let mode = *drag.peek();
                if mode == DragMode::Idle {
                    return;
                }
                let Some(rect) = container_rect() else { return };
                let client = evt.client_coordinates();
                let point = (client.x - rect.left(), client.y - rect.top());

                match mode {
                    DragMode::Idle => {}
                    DragMode::Map { start, start_view, moved } => {
                        let (dx, dy) = (point.0 - start.0, point.1 - start.1);
                        let moved = moved || dx.abs() > DRAG_THRESHOLD || dy.abs() > DRAG_THRESHOLD;
                        if moved {
                            viewport.set(start_view.panned(dx, dy));
                        }
                        drag.set(DragMode::Map { start, start_view, moved });
                    }
                    DragMode::UserMarker { grab, .. } => {
                        drag_preview.set(Some((point.0 + grab.0, point.1 + grab.1)));
                        drag.set(DragMode::UserMarker { grab, moved: true });
                    }
                }
            },

            onmouseup: move |evt: Event<MouseData>| {
                let mode = *drag.peek();
                drag.set(DragMode::Idle);
                match mode {
                    DragMode::UserMarker { moved: true, .. } => {
                        if let Some((x, y)) = drag_preview.take() {
                            let (lat, lng) = viewport.peek().unproject(x, y);
                            on_marker_drag.call((lat, lng));
                        }
                    }
                    DragMode::UserMarker { moved: false, .. } => open_popup.set(Some(0)),
                    DragMode::Map { moved: false, .. } => {
                        let Some(rect) = container_rect() else { return };
                        let client = evt.client_coordinates();
                        let point = (client.x - rect.left(), client.y - rect.top());
                        open_popup.set(find_nearest(&hits, point, HIT_RADIUS));
                    }
                    _ => {}
                }
            },

            onmouseleave: move |_| {
                drag.set(DragMode::Idle);
                drag_preview.set(None);
            },

            div {
                class: "map-overlay",
                dangerous_inner_html: "{svg_html}",
            }

            if let Some((x, y, message, avatar, hint)) = popup {
                div {
                    class: "map-popup",
                    style: "left: {x}px; top: {y}px;",
                    onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                    button {
                        class: "map-popup-close",
                        onclick: move |_| open_popup.set(None),
                        "×"
                    }
                    div { class: "popup",
                        img { class: "popup-avatar", height: "50", src: "{avatar}" }
                        div { class: "popup-text",
                            span { dangerous_inner_html: "{message}" }
                            if hint {
                                br {}
                                span { class: "popup-hint",
                                    "P.S: Drag me around! "
                                    img { height: "15", src: images::wink() }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{build_markers, UserPosition};
    use geo_recommender_shared::models::Neighbor;

    fn sample_markers() -> Vec<Marker> {
        let neighbors = vec![
            Neighbor {
                name: "jane,doe".into(),
                age: 30,
                latitude: 51.5,
                longitude: -0.11,
                distance: None,
            },
            Neighbor {
                name: "john,smith".into(),
                age: 22,
                latitude: 51.52,
                longitude: -0.2,
                distance: None,
            },
        ];
        build_markers(&UserPosition::default(), 20, &neighbors)
    }

    const SOURCES: Sources<'static> = Sources {
        tile_template: tiles::DEFAULT_TILE_URL,
        home_icon: "/assets/green_home.svg",
    };

    fn view() -> Viewport {
        Viewport::centered(51.515366, -0.1109577, 10.0, 800.0, 600.0)
    }

    #[test]
    fn test_find_nearest_within_threshold() {
        let positions = vec![(100.0, 100.0), (300.0, 300.0)];
        assert_eq!(find_nearest(&positions, (105.0, 105.0), 20.0), Some(0));
    }

    #[test]
    fn test_find_nearest_outside_threshold() {
        let positions = vec![(100.0, 100.0)];
        assert_eq!(find_nearest(&positions, (200.0, 200.0), 20.0), None);
    }

    #[test]
    fn test_find_nearest_picks_closest() {
        let positions = vec![(100.0, 100.0), (110.0, 100.0)];
        assert_eq!(find_nearest(&positions, (108.0, 100.0), 20.0), Some(1));
    }

    #[test]
    fn test_svg_draws_every_marker() {
        let svg = build_svg(&view(), &sample_markers(), None, &SOURCES);
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("marker-neighbor").count(), 2);
        assert_eq!(svg.matches(r#"class="marker marker-user""#).count(), 1);
        assert!(svg.contains(r#"href="/assets/green_home.svg""#));
        assert!(svg.contains("graticule"));
    }

    #[test]
    fn test_user_marker_has_a_drawn_shape() {
        let svg = build_svg(&view(), &sample_markers(), None, &SOURCES);
        // Drawn at the user position itself, independent of the icon image
        assert!(svg.contains(r#"class="marker marker-user marker-user-dot" cx="400.0" cy="300.0""#));
        let dot = svg.find("marker-user-dot").unwrap();
        let icon = svg.find(r#"class="marker marker-user""#).unwrap();
        assert!(dot < icon);
    }

    #[test]
    fn test_tiles_sit_under_everything_else() {
        let svg = build_svg(&view(), &sample_markers(), None, &SOURCES);
        let tiles = svg.matches(r#"<image class="tile""#).count();
        assert_eq!(tiles, visible_tiles(&view()).len());
        assert!(svg.contains(r#"href="https://tile.openstreetmap.org/10/511/340.png""#));
        let last_tile = svg.rfind(r#"class="tile""#).unwrap();
        assert!(last_tile < svg.find("graticule").unwrap());
        assert!(last_tile < svg.find("marker").unwrap());
    }

    #[test]
    fn test_user_marker_is_drawn_last() {
        let svg = build_svg(&view(), &sample_markers(), None, &SOURCES);
        let user = svg.find("marker-user").unwrap();
        let last_neighbor = svg.rfind("marker-neighbor").unwrap();
        assert!(user > last_neighbor);
    }

    #[test]
    fn test_drag_preview_moves_user_icon() {
        let svg = build_svg(&view(), &sample_markers(), Some((100.25, 200.0)), &SOURCES);
        // Icon is 37.5 x 60, anchored at bottom center
        assert!(svg.contains(r#"x="81.5" y="140.0""#));
    }

    #[test]
    fn test_graticule_step_shrinks_with_zoom() {
        let world = Viewport::centered(0.0, 0.0, 0.0, 800.0, 600.0);
        let city = Viewport::centered(0.0, 0.0, 12.0, 800.0, 600.0);
        assert!(graticule_step(&world) > graticule_step(&city));
        assert_eq!(graticule_step(&city), 0.05);
    }

    #[test]
    fn test_graticule_values_cover_range() {
        let values: Vec<f64> = graticule_values(-0.25, 0.25, 0.1).collect();
        assert_eq!(values.first().copied(), Some(-0.30000000000000004));
        assert!(values.len() >= 6);
    }

    #[test]
    fn test_user_popup_opens_above_icon() {
        let vp = view();
        let markers = sample_markers();
        let (x, y) = popup_position(&vp, &markers[0]);
        assert!((x - 400.0).abs() < 1e-6);
        assert!((y - (300.0 - 60.0 - 15.0)).abs() < 1e-6);
    }

    #[test]
    fn test_hit_positions_center_on_icon() {
        let vp = view();
        let hits = hit_positions(&vp, &sample_markers());
        assert_eq!(hits.len(), 3);
        assert!((hits[0].1 - 270.0).abs() < 1e-6);
    }
}
