use dioxus::prelude::*;
use url::Url;

use crate::{
    app::{build_client, persist_user_state, CatalogRefresh},
    domain::{amount::parse_amount, AppState, PurchaseOrigin, Settings},
    infra::{cache::age_string, inventory_api::InventoryClient},
    ui::{
        components::toast::{push_toast, ToastKind, ToastMessage},
        theme,
    },
    util::version::version_label,
};

#[component]
pub fn SettingsPage() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let toasts = use_context::<Signal<Vec<ToastMessage>>>();
    let mut client = use_context::<Signal<Option<InventoryClient>>>();
    let CatalogRefresh(mut refresh) = use_context::<CatalogRefresh>();

    let initial = state.with(|st| st.settings.clone());
    let mut url_input = use_signal(|| initial.api_base_url.clone());
    let mut vat_input = use_signal(|| initial.default_vat_rate_percent.to_string());
    let mut origin = use_signal(|| initial.default_origin);
    let mut server_status = use_signal(|| None::<String>);

    let cache_entries = state.with(|st| {
        st.cache
            .iter()
            .map(|(resource, time)| {
                let age = time
                    .elapsed()
                    .map(age_string)
                    .unwrap_or_else(|_| "just now".to_string());
                (resource.label(), age)
            })
            .collect::<Vec<_>>()
    });

    let on_apply = move |_| match parse_settings(&url_input(), &vat_input(), origin()) {
        Ok(settings) => {
            let url_changed = state.with(|st| st.settings.api_base_url != settings.api_base_url);
            if url_changed {
                client.set(build_client(&settings.api_base_url));
                refresh += 1;
            }
            state.with_mut(|st| st.settings = settings);
            persist_user_state(&state);
            push_toast(toasts, ToastKind::Success, "Settings saved.");
        }
        Err(message) => push_toast(toasts, ToastKind::Error, message),
    };

    let on_reset = move |_| {
        let defaults = Settings::default();
        url_input.set(defaults.api_base_url.clone());
        vat_input.set(defaults.default_vat_rate_percent.to_string());
        origin.set(defaults.default_origin);
        push_toast(toasts, ToastKind::Info, "Defaults restored; apply to save them.");
    };

    let on_check_server = move |_| {
        let Some(client) = client() else {
            push_toast(toasts, ToastKind::Error, "Backend URL is invalid.");
            return;
        };
        spawn(async move {
            match client.check_compatibility().await {
                Ok(version) => {
                    server_status.set(Some(format!("Connected to backend v{version}")));
                    push_toast(toasts, ToastKind::Success, format!("Backend v{version} is supported."));
                }
                Err(err) => {
                    tracing::warn!(%err, "backend compatibility check failed");
                    server_status.set(Some(err.to_string()));
                    push_toast(toasts, ToastKind::Error, format!("Backend check failed: {err}"));
                }
            }
        });
    };

    let on_clear_cache = move |_| {
        state.with_mut(|st| st.cache.clear());
        if let Some(client) = client() {
            spawn(async move { client.clear_cache().await });
        }
        push_toast(
            toasts,
            ToastKind::Info,
            "Cleared cached data. It will refresh on next fetch.",
        );
    };

    rsx! {
        section { class: "panel",
            h2 { "Backend & defaults" }
            div { class: "field-grid",
                div { class: "field",
                    label { "Inventory API base URL" }
                    input {
                        value: "{url_input}",
                        oninput: move |evt| url_input.set(evt.value()),
                    }
                }
                div { class: "field",
                    label { "Default VAT rate %" }
                    input {
                        value: "{vat_input}",
                        oninput: move |evt| vat_input.set(evt.value()),
                    }
                }
                div { class: "field",
                    label { "Default purchase origin" }
                    div { style: "display: flex; gap: 8px;",
                        for option in [PurchaseOrigin::Local, PurchaseOrigin::Foreign] {
                            button {
                                class: theme::toggle(origin() == option),
                                onclick: move |_| origin.set(option),
                                "{option.label()}"
                            }
                        }
                    }
                }
            }
            div { style: "margin-top: 12px; display: flex; gap: 8px;",
                button { class: "primary", onclick: on_apply, "Apply" }
                button { onclick: on_reset, "Reset defaults" }
            }
        }

        section { class: "panel",
            h2 { "Backend status" }
            p { "App {version_label()}" }
            if let Some(status) = server_status() {
                p { "{status}" }
            }
            button { onclick: on_check_server, "Check backend version" }
        }

        section { class: "panel",
            h2 { "Cache status" }
            if cache_entries.is_empty() {
                p { "No cached fetches yet." }
            } else {
                ul {
                    for (label, age) in cache_entries {
                        li { "{label}: {age} old" }
                    }
                }
            }
            button { class: "danger", onclick: on_clear_cache, "Clear cache" }
        }
    }
}

fn parse_settings(url: &str, vat: &str, origin: PurchaseOrigin) -> Result<Settings, String> {
    let url = url.trim();
    let parsed = Url::parse(url).map_err(|err| format!("Backend URL is invalid: {err}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err("Backend URL must use http or https".to_string());
    }

    let vat_rate = parse_amount(vat).ok_or("Default VAT rate must be a number")?;
    if !(0.0..=100.0).contains(&vat_rate) {
        return Err("Default VAT rate must be between 0 and 100".to_string());
    }

    Ok(Settings {
        api_base_url: url.to_string(),
        default_vat_rate_percent: vat_rate,
        default_origin: origin,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn valid_values_become_settings() {
        let settings =
            parse_settings(" https://stores.example/api/ ", "15", PurchaseOrigin::Foreign).unwrap();
        assert_eq!(settings.api_base_url, "https://stores.example/api/");
        assert_eq!(settings.default_vat_rate_percent, 15.0);
        assert_eq!(settings.default_origin, PurchaseOrigin::Foreign);
    }

    #[rstest]
    #[case("not a url", "13")]
    #[case("ftp://stores.example/", "13")]
    #[case("http://localhost:8000/api/", "abc")]
    #[case("http://localhost:8000/api/", "101")]
    #[case("http://localhost:8000/api/", "-1")]
    fn invalid_values_are_rejected(#[case] url: &str, #[case] vat: &str) {
        assert!(parse_settings(url, vat, PurchaseOrigin::Local).is_err());
    }
}
