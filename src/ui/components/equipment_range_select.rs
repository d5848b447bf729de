use dioxus::prelude::*;

use crate::domain::{expand_equipment_numbers, filter_suggestions, SuggestionGroup};
use crate::ui::theme;

const CATALOG_MATCH_LIMIT: usize = 12;

/// Catalogue entries matching the token currently being typed.
pub fn catalog_matches(catalog: &[String], input: &str) -> Vec<String> {
    let needle = input.rsplit(',').next().unwrap_or("").trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .filter(|number| number.to_lowercase().contains(&needle))
        .take(CATALOG_MATCH_LIMIT)
        .cloned()
        .collect()
}

/// Free-form equipment entry with grouped, clickable suggestions.
#[component]
pub fn EquipmentRangeSelect(
    input: String,
    selected: Vec<String>,
    catalog: Vec<String>,
    on_input: EventHandler<String>,
    on_toggle: EventHandler<String>,
) -> Element {
    let mut filter = use_signal(String::new);

    let suggestions = expand_equipment_numbers(&input);
    let visible = filter_suggestions(&suggestions, &filter());
    let groups: Vec<(SuggestionGroup, Vec<String>)> =
        [SuggestionGroup::Number, SuggestionGroup::Literal, SuggestionGroup::Range]
            .into_iter()
            .map(|group| {
                let values = suggestions
                    .iter_grouped()
                    .filter(|(candidate, value)| {
                        *candidate == group && visible.iter().any(|v| v.as_str() == *value)
                    })
                    .map(|(_, value)| value.to_string())
                    .collect::<Vec<_>>();
                (group, values)
            })
            .filter(|(_, values)| !values.is_empty())
            .collect();
    let from_catalog = catalog_matches(&catalog, &input);

    rsx! {
        div { class: "field-grid",
            div { class: "field",
                label { "Equipment numbers (e.g. 200-204, 9N-AKA)" }
                input {
                    value: "{input}",
                    oninput: move |evt| on_input.call(evt.value()),
                }
            }
            div { class: "field",
                label { "Filter suggestions" }
                input {
                    value: "{filter}",
                    oninput: move |evt| filter.set(evt.value()),
                }
            }
        }
        if suggestions.is_empty() {
            p { "Type numbers, ranges or tags separated by commas." }
        }
        for (group, values) in groups {
            div { class: "suggestion-group",
                h3 { "{group.label()}" }
                div { class: "chips",
                    for value in values {
                        Chip { value: value.clone(), selected: selected.contains(&value), on_toggle }
                    }
                }
            }
        }
        if !from_catalog.is_empty() {
            div { class: "suggestion-group",
                h3 { "From catalogue" }
                div { class: "chips",
                    for value in from_catalog {
                        Chip { value: value.clone(), selected: selected.contains(&value), on_toggle }
                    }
                }
            }
        }
    }
}

#[component]
fn Chip(value: String, selected: bool, on_toggle: EventHandler<String>) -> Element {
    let label = value.clone();
    rsx! {
        span {
            class: theme::chip(selected),
            onclick: move |_| on_toggle.call(value.clone()),
            "{label}"
        }
    }
}
