use dioxus::prelude::*;

use crate::app::Route;
use crate::util::version::{version_label, APP_NAME};

#[component]
pub fn Shell(children: Element) -> Element {
    let current_route = use_route::<Route>();
    let nav = use_navigator();

    rsx! {
        div { class: "app-shell",
            nav { class: "app-nav",
                div { class: "brand", "{APP_NAME}" }
                NavButton {
                    active: matches!(current_route, Route::Rrp {}),
                    onclick: move |_| { nav.push(Route::Rrp {}); },
                    label: "RRP workbench",
                }
                NavButton {
                    active: matches!(current_route, Route::Equipment {}),
                    onclick: move |_| { nav.push(Route::Equipment {}); },
                    label: "Equipment",
                }
                NavButton {
                    active: matches!(current_route, Route::Settings {}),
                    onclick: move |_| { nav.push(Route::Settings {}); },
                    label: "Settings",
                }
                span { class: "version", "{version_label()}" }
            }
            main { class: "app-main",
                {children}
            }
        }
    }
}

#[component]
fn NavButton(active: bool, onclick: EventHandler<()>, label: &'static str) -> Element {
    let class = if active { "active" } else { "" };

    rsx! {
        a {
            class: "{class}",
            href: "#",
            onclick: move |evt: MouseEvent| {
                evt.prevent_default();
                onclick.call(());
            },
            "{label}"
        }
    }
}
