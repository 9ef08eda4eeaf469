use dioxus::core::Task;
use dioxus::logger::tracing::{debug, warn};
use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;

use crate::api;
use crate::components::controls::Controls;
use crate::components::map_view::{container_size, MapView};
use crate::controller::{BoundsGate, Controller, Effect, Event as ControllerEvent, QueryRequest};
use crate::coords::Viewport;

/// Container size assumed until the map element is laid out.
const FALLBACK_SIZE: (f64, f64) = (800.0, 600.0);

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Page-level state. Every field is a signal, so the struct is `Copy` and can
/// be moved into event handlers and tasks freely.
#[derive(Clone, Copy)]
struct PageState {
    controller: Signal<Controller>,
    gate: Signal<BoundsGate>,
    in_flight: Signal<Option<Task>>,
    viewport: Signal<Viewport>,
}

impl PageState {
    fn dispatch(self, event: ControllerEvent) {
        let mut controller = self.controller;
        let effect = controller.write().apply(event);
        self.run(effect);
    }

    fn run(self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::Fetch(request) => self.fetch(request),
            Effect::FitBounds => self.fit_bounds(),
        }
    }

    /// Start a request, cancelling the one in flight.
    fn fetch(self, request: QueryRequest) {
        let mut in_flight = self.in_flight;
        if let Some(task) = in_flight.take() {
            task.cancel();
        }

        let task = spawn(async move {
            debug!(request_id = request.request_id, "fetching recommendations");
            let event = match api::fetch_recommendations(&request.params).await {
                Ok(neighbors) => ControllerEvent::ResponseArrived {
                    request_id: request.request_id,
                    neighbors,
                },
                Err(error) => {
                    warn!(%error, "recommendation request failed");
                    ControllerEvent::RequestFailed {
                        request_id: request.request_id,
                        error,
                    }
                }
            };
            self.dispatch(event);
        });
        in_flight.set(Some(task));
    }

    fn fit_bounds(self) {
        let mut gate = self.gate;
        if !gate.write().try_fit(now_ms()) {
            return;
        }
        debug!("fitting bounds");

        let (bounds, zoom) = {
            let controller = self.controller.peek();
            (controller.bounds().to_vec(), f64::from(controller.user().zoom))
        };
        let mut viewport = self.viewport;
        let current = *viewport.peek();
        let (width, height) = container_size().unwrap_or((current.width, current.height));
        if let Some(fitted) = Viewport::fit(&bounds, width, height, zoom) {
            viewport.set(fitted);
        }

        // Re-read the container once layout has settled
        spawn(async move {
            TimeoutFuture::new(0).await;
            if let Some((width, height)) = container_size() {
                let current = *viewport.peek();
                viewport.set(current.resized(width, height));
            }
        });
    }
}

#[component]
pub fn Recommender() -> Element {
    let controller = use_signal(Controller::default);
    let gate = use_signal(BoundsGate::default);
    let in_flight = use_signal(|| None::<Task>);
    let viewport = use_signal(|| {
        let user = controller.peek().user();
        Viewport::centered(
            user.latitude,
            user.longitude,
            f64::from(user.zoom),
            FALLBACK_SIZE.0,
            FALLBACK_SIZE.1,
        )
    });

    let state = PageState {
        controller,
        gate,
        in_flight,
        viewport,
    };

    // First query once the page is mounted
    use_effect(move || {
        let mut controller = state.controller;
        let effect = controller.write().initial_request();
        state.run(effect);
    });

    let current = controller.read();
    let user = current.user();
    let age = current.age();
    let markers = current.markers().to_vec();
    let last_error = current.last_error().map(str::to_string);
    drop(current);

    rsx! {
        div { class: "recommender",
            div { class: "sidebar",
                Controls {
                    age: age,
                    latitude: user.latitude,
                    longitude: user.longitude,
                    last_error: last_error,
                    on_event: move |event: ControllerEvent| state.dispatch(event),
                }
            }
            MapView {
                markers: markers,
                viewport: viewport,
                on_marker_drag: move |(lat, lng): (f64, f64)| {
                    state.dispatch(ControllerEvent::MarkerDragged { lat, lng });
                },
            }
        }
    }
}
