mod api;
mod components;
mod controller;
mod coords;
mod images;
mod pages;
mod theme;
mod tiles;

use dioxus::prelude::*;

use pages::recommender::Recommender;

#[derive(Routable, Clone, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[layout(Home)]
        #[redirect("/", || Route::Recommender {})]
        #[route("/recommender")]
        Recommender {},
    #[end_layout]
    #[route("/:..segments")]
    NotFound { segments: Vec<String> },
}

impl Route {
    fn title(&self) -> &'static str {
        match self {
            Route::Recommender {} => "Recommender",
            Route::NotFound { .. } => "",
        }
    }
}

/// Application chrome around the active page.
#[component]
fn Home() -> Element {
    let route = use_route::<Route>();
    let user_icon = theme::icon("user");

    rsx! {
        div { class: "app",
            header { class: "toolbar",
                if let Some(icon) = user_icon {
                    img {
                        class: "toolbar-icon",
                        src: "{icon.asset}",
                        width: "{icon.size}",
                        height: "{icon.size}",
                    }
                }
                h1 { "{route.title()}" }
            }
            main { class: "content",
                Outlet::<Route> {}
            }
        }
    }
}

/// Unknown paths land on the recommender.
#[component]
fn NotFound(segments: Vec<String>) -> Element {
    let nav = navigator();
    use_effect(move || {
        nav.replace(Route::Recommender {});
    });
    rsx! {}
}

const CSS: Asset = asset!("/assets/main.css");

#[allow(non_snake_case)]
fn App() -> Element {
    let theme_css = theme::css_variables();
    rsx! {
        document::Stylesheet { href: CSS }
        style { "{theme_css}" }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
