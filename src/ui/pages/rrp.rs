use dioxus::prelude::*;

use crate::{
    app::persist_user_state,
    domain::{
        format_amount, validate_draft, AppState, CacheResource, PurchaseOrigin, RrpDraft,
    },
    infra::inventory_api::{CacheStatus, InventoryClient},
    ui::{
        components::{
            kpi_card::KpiCard,
            rrp_breakdown_table::{breakdown_rows, RrpBreakdownTable},
            rrp_item_table::{ItemEdit, RrpItemTable},
            toast::{push_toast, ToastKind, ToastMessage},
        },
        theme,
    },
};

fn edit_draft(mut state: Signal<AppState>, edit: impl FnOnce(&mut RrpDraft)) {
    state.with_mut(|st| edit(&mut st.draft));
    persist_user_state(&state);
}

#[component]
pub fn RrpPage() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let toasts = use_context::<Signal<Vec<ToastMessage>>>();
    let client = use_context::<Signal<Option<InventoryClient>>>();
    let mut loading = use_signal(|| false);
    let mut last_load = use_signal(|| None::<CacheStatus>);

    let draft = state.with(|st| st.draft.clone());
    let loaded_status = state.with(|st| st.loaded_status);
    let evaluation = draft.evaluate();
    let issues = validate_draft(&draft);
    let foreign = draft.origin.is_foreign();
    let aggregate = evaluation.totals.aggregate;
    let rows = breakdown_rows(&evaluation.items, &evaluation.totals);
    let currency = draft.currency.clone();
    let charges_total = aggregate.freight_charge + aggregate.custom_service_charge;

    let on_load = move |_| {
        let number = state.with(|st| st.draft.rrp_number.trim().to_string());
        if number.is_empty() {
            push_toast(toasts, ToastKind::Warning, "Enter an RRP number to load.");
            return;
        }
        let Some(client) = client() else {
            push_toast(toasts, ToastKind::Error, "Backend URL is invalid; check Settings.");
            return;
        };
        loading.set(true);
        spawn(async move {
            match client.get_rrp(&number).await {
                Ok(payload) => {
                    let status = payload.status.clone();
                    let data = payload.data;
                    state.with_mut(|st| {
                        st.draft = RrpDraft::from_record(&data.record);
                        st.loaded_status = Some(data.record.status);
                        st.cache
                            .record_fetch(CacheResource::Rrp(number.clone()), payload.fetched_at);
                    });
                    persist_user_state(&state);
                    if let Some(err) = data.items_error {
                        push_toast(
                            toasts,
                            ToastKind::Error,
                            format!("RRP {number}: {err}. Totals are shown as zero."),
                        );
                    } else if status == CacheStatus::Stale {
                        push_toast(
                            toasts,
                            ToastKind::Warning,
                            format!("Backend unreachable; RRP {number} loaded from cache."),
                        );
                    } else {
                        push_toast(toasts, ToastKind::Success, format!("Loaded RRP {number}."));
                    }
                    last_load.set(Some(status));
                }
                Err(err) => {
                    tracing::error!(rrp = %number, %err, "failed to load RRP");
                    push_toast(toasts, ToastKind::Error, format!("Failed to load RRP {number}: {err}"));
                }
            }
            loading.set(false);
        });
    };

    let on_new = move |_| {
        state.with_mut(|st| st.reset_draft());
        last_load.set(None);
        persist_user_state(&state);
    };

    rsx! {
        section { class: "panel",
            h2 {
                "RRP "
                span { class: theme::origin_badge(draft.origin), "{draft.origin.label()}" }
                if let Some(status) = loaded_status {
                    " "
                    span { class: theme::status_badge(status), "{status.label()}" }
                }
                if let Some(class) = last_load().as_ref().and_then(theme::cache_badge) {
                    " "
                    span { class: "{class}", "cached" }
                }
            }
            div { class: "field-grid",
                HeaderField {
                    label: "RRP number",
                    value: draft.rrp_number.clone(),
                    on_input: move |value: String| edit_draft(state, |d| d.rrp_number = value),
                }
                HeaderField {
                    label: "Supplier",
                    value: draft.supplier.clone(),
                    on_input: move |value: String| edit_draft(state, |d| d.supplier = value),
                }
                HeaderField {
                    label: "Invoice number",
                    value: draft.invoice_number.clone(),
                    on_input: move |value: String| edit_draft(state, |d| d.invoice_number = value),
                }
                HeaderField {
                    label: "Invoice date (YYYY-MM-DD)",
                    value: draft.invoice_date.clone(),
                    on_input: move |value: String| edit_draft(state, |d| d.invoice_date = value),
                }
                HeaderField {
                    label: "Currency",
                    value: draft.currency.clone(),
                    on_input: move |value: String| edit_draft(state, |d| d.currency = value),
                }
                HeaderField {
                    label: "Freight charge",
                    value: draft.freight_charge.clone(),
                    on_input: move |value: String| edit_draft(state, |d| d.freight_charge = value),
                }
                if foreign {
                    HeaderField {
                        label: "Custom service charge",
                        value: draft.custom_service_charge.clone(),
                        on_input: move |value: String| edit_draft(state, |d| d.custom_service_charge = value),
                    }
                }
                HeaderField {
                    label: "VAT rate %",
                    value: draft.vat_rate_percent.clone(),
                    on_input: move |value: String| edit_draft(state, |d| d.vat_rate_percent = value),
                }
            }
            div { style: "margin-top: 12px; display: flex; gap: 8px;",
                for origin in [PurchaseOrigin::Local, PurchaseOrigin::Foreign] {
                    button {
                        class: theme::toggle(draft.origin == origin),
                        onclick: move |_| edit_draft(state, |d| d.origin = origin),
                        "{origin.label()}"
                    }
                }
                button {
                    disabled: loading(),
                    onclick: on_load,
                    if loading() { "Loading..." } else { "Load from server" }
                }
                button { onclick: on_new, "New RRP" }
            }
        }

        section { class: "panel",
            h2 { "Items" }
            RrpItemTable {
                items: draft.items.clone(),
                foreign,
                on_edit: move |edit: ItemEdit| {
                    edit_draft(state, |d| {
                        if let Some(item) = d.item_mut(&edit.id) {
                            edit.field.apply(item, edit.value);
                        }
                    })
                },
                on_toggle_vat: move |id: String| {
                    edit_draft(state, |d| {
                        if let Some(item) = d.item_mut(&id) {
                            item.vat = !item.vat;
                        }
                    })
                },
                on_remove: move |id: String| edit_draft(state, |d| { d.remove_item(&id); }),
            }
            button {
                style: "margin-top: 8px;",
                onclick: move |_| edit_draft(state, |d| { d.add_item(); }),
                "Add item"
            }
        }

        div { class: "kpi-row", style: "margin-bottom: 16px;",
            KpiCard {
                title: "Item value".to_string(),
                value: format!("{currency} {}", format_amount(aggregate.item_price)),
                description: Some(format!("{} line(s)", evaluation.items.len())),
            }
            KpiCard {
                title: "Freight & charges".to_string(),
                value: format!("{currency} {}", format_amount(charges_total)),
                description: None,
            }
            KpiCard {
                title: "Customs".to_string(),
                value: format!("{currency} {}", format_amount(aggregate.customs_amount)),
                description: None,
            }
            KpiCard {
                title: "VAT".to_string(),
                value: format!("{currency} {}", format_amount(aggregate.vat_amount)),
                description: Some(format!("at {}%", evaluation.charges.vat_rate_percent)),
            }
            KpiCard {
                title: "Grand total".to_string(),
                value: format!("{currency} {}", format_amount(evaluation.totals.grand_total())),
                description: None,
            }
        }

        section { class: "panel",
            h2 { "Breakdown" }
            RrpBreakdownTable { rows, aggregate, foreign }
        }

        if !evaluation.warnings.is_empty() || !issues.is_empty() {
            section { class: "panel",
                h2 { "Checks" }
                ul { class: "issue-list warnings",
                    for warning in evaluation.warnings.iter() {
                        li { "{warning}" }
                    }
                }
                ul { class: "issue-list errors",
                    for issue in issues.iter() {
                        li { "{issue}" }
                    }
                }
            }
        }
    }
}

#[component]
fn HeaderField(label: &'static str, value: String, on_input: EventHandler<String>) -> Element {
    rsx! {
        div { class: "field",
            label { "{label}" }
            input {
                value: "{value}",
                oninput: move |evt| on_input.call(evt.value()),
            }
        }
    }
}
