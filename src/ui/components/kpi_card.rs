use dioxus::prelude::*;

#[component]
pub fn KpiCard(title: String, value: String, description: Option<String>) -> Element {
    rsx! {
        div { class: "kpi-card",
            div { class: "label", "{title}" }
            div { class: "value", "{value}" }
            if let Some(desc) = description {
                div { class: "hint", "{desc}" }
            }
        }
    }
}
