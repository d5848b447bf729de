use dioxus::prelude::*;

use crate::{
    app::{persist_user_state, CatalogRefresh},
    domain::{compact_numbers, selection_to_numbers, AppState, CacheResource},
    infra::cache::age_string,
    ui::components::{
        equipment_range_select::EquipmentRangeSelect,
        toast::{push_toast, ToastKind, ToastMessage},
    },
};

#[component]
pub fn EquipmentPage() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let toasts = use_context::<Signal<Vec<ToastMessage>>>();
    let CatalogRefresh(mut refresh) = use_context::<CatalogRefresh>();

    let (input, selected, catalog, fetched_at) = state.with(|st| {
        (
            st.equipment_input.clone(),
            st.equipment_selection.clone(),
            st.equipment_catalog.clone(),
            st.cache.fetched_at(&CacheResource::EquipmentCatalog),
        )
    });
    let resolved = selection_to_numbers(&selected);
    let numeric: Vec<i64> = resolved.iter().filter_map(|id| id.parse().ok()).collect();
    let summary = compact_numbers(numeric);
    let resolved_label = resolved.join(", ");
    let catalog_age = fetched_at
        .and_then(|time| time.elapsed().ok())
        .map(age_string);

    let on_toggle = move |value: String| {
        state.with_mut(|st| {
            if let Some(index) = st.equipment_selection.iter().position(|chip| *chip == value) {
                st.equipment_selection.remove(index);
            } else {
                st.equipment_selection.push(value);
            }
        });
        persist_user_state(&state);
    };

    let on_clear = move |_| {
        state.with_mut(|st| st.equipment_selection.clear());
        persist_user_state(&state);
    };

    let on_refresh = move |_| {
        refresh += 1;
        push_toast(toasts, ToastKind::Info, "Refreshing equipment catalogue...");
    };

    rsx! {
        section { class: "panel",
            h2 { "Equipment selection" }
            EquipmentRangeSelect {
                input,
                selected: selected.clone(),
                catalog: catalog.clone(),
                on_input: move |value: String| {
                    state.with_mut(|st| st.equipment_input = value);
                    persist_user_state(&state);
                },
                on_toggle,
            }
        }

        section { class: "panel",
            h2 { "Selected" }
            if selected.is_empty() {
                p { "Nothing selected yet." }
            } else {
                div { class: "chips",
                    for chip in selected.iter() {
                        span { class: "chip selected", "{chip}" }
                    }
                }
                p { "Resolves to {resolved.len()} identifier(s): {resolved_label}" }
                if !summary.is_empty() {
                    p { "Numbers: {summary}" }
                }
                button { class: "danger", onclick: on_clear, "Clear selection" }
            }
        }

        section { class: "panel",
            h2 { "Catalogue" }
            p {
                "{catalog.len()} equipment numbers known"
                if let Some(age) = catalog_age {
                    ", fetched {age} ago"
                }
                "."
            }
            button { onclick: on_refresh, "Refresh catalogue" }
        }
    }
}
