use dioxus::prelude::*;

use crate::controller::{Event as ControllerEvent, MAX_AGE};

fn parse_age(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[component]
pub fn Controls(
    age: u32,
    latitude: f64,
    longitude: f64,
    #[props(!optional)] last_error: Option<String>,
    on_event: EventHandler<ControllerEvent>,
) -> Element {
    rsx! {
        div { class: "panel controls",
            h3 { "You" }
            div { class: "control-row",
                label { "Age" }
                input {
                    r#type: "number",
                    min: "0",
                    max: "{MAX_AGE}",
                    value: "{age}",
                    onchange: move |evt: Event<FormData>| {
                        if let Some(age) = parse_age(&evt.value()) {
                            on_event.call(ControllerEvent::AgeChanged(age));
                        }
                    },
                }
            }
            div { class: "control-row",
                label { "Latitude" }
                input {
                    r#type: "number",
                    step: "any",
                    min: "-90",
                    max: "90",
                    value: "{latitude}",
                    onchange: move |evt: Event<FormData>| {
                        if let Some(lat) = parse_coordinate(&evt.value()) {
                            on_event.call(ControllerEvent::LatitudeChanged(lat));
                        }
                    },
                }
            }
            div { class: "control-row",
                label { "Longitude" }
                input {
                    r#type: "number",
                    step: "any",
                    min: "-180",
                    max: "180",
                    value: "{longitude}",
                    onchange: move |evt: Event<FormData>| {
                        if let Some(lng) = parse_coordinate(&evt.value()) {
                            on_event.call(ControllerEvent::LongitudeChanged(lng));
                        }
                    },
                }
            }
            if let Some(error) = last_error {
                div { class: "status-error", "Could not refresh neighbors: {error}" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age(" 42 "), Some(42));
        assert_eq!(parse_age("-1"), None);
        assert_eq!(parse_age("abc"), None);
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("51.515366"), Some(51.515366));
        assert_eq!(parse_coordinate("-0.1109577"), Some(-0.1109577));
        assert_eq!(parse_coordinate("NaN"), None);
        assert_eq!(parse_coordinate("inf"), None);
        assert_eq!(parse_coordinate(""), None);
    }
}
