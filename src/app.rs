use std::time::Duration;

use dioxus::{prelude::*, signals::Signal};

use crate::{
    domain::{AppState, CacheResource},
    infra::inventory_api::{CacheStatus, InventoryClient, DEFAULT_TTL},
    ui::{
        components::toast::{push_toast, Toast, ToastKind, ToastMessage},
        pages::{EquipmentPage, RrpPage, SettingsPage},
        shell::Shell,
    },
    util::{
        assets,
        persistence::{load_persisted_state, save_persisted_state},
    },
};

const STALE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Bumped to ask the catalogue resource for another fetch.
#[derive(Clone, Copy, PartialEq)]
pub struct CatalogRefresh(pub Signal<u32>);

#[derive(Routable, Clone, PartialEq)]
pub enum Route {
    #[route("/")]
    #[route("/rrp")]
    Rrp {},
    #[route("/equipment")]
    Equipment {},
    #[route("/settings")]
    Settings {},
}

#[component]
pub fn App() -> Element {
    let mut state = use_signal(AppState::default);
    use_hook(move || {
        let saved = load_persisted_state();
        state.with_mut(|st| {
            if let Some(saved) = saved {
                st.apply_persisted(saved);
            }
            st.settings = st.settings.clone().with_env_overrides();
        });
    });
    use_context_provider(|| state);

    let toasts = use_signal(Vec::<ToastMessage>::new);
    use_context_provider(|| toasts);

    let client = use_signal(|| state.with(|st| build_client(&st.settings.api_base_url)));
    use_context_provider(|| client);

    let refresh = use_signal(|| 0u32);
    use_context_provider(|| CatalogRefresh(refresh));

    let _catalog = use_resource(move || async move {
        // Subscribe to manual refreshes.
        let _ = refresh();
        fetch_equipment_catalog(state, toasts, client()).await
    });

    use_future(move || async move {
        let mut refresh = refresh;
        loop {
            tokio::time::sleep(STALE_CHECK_INTERVAL).await;
            if state.peek().is_stale(&CacheResource::EquipmentCatalog, DEFAULT_TTL) {
                tracing::debug!("equipment catalogue is older than its TTL; refreshing");
                refresh += 1;
            }
        }
    });

    rsx! {
        document::Link { rel: "icon", href: assets::favicon_data_uri() }
        document::Style { "{assets::main_css()}" }
        Router::<Route> {}
        Toast {}
    }
}

/// Builds a client for `base_url`, logging instead of failing so the UI stays usable offline.
pub fn build_client(base_url: &str) -> Option<InventoryClient> {
    match InventoryClient::new(base_url) {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::error!(%base_url, %err, "cannot build inventory client");
            None
        }
    }
}

pub fn persist_user_state(state: &Signal<AppState>) {
    let snapshot = state.with(|st| st.to_persisted());
    if let Err(err) = save_persisted_state(&snapshot) {
        tracing::error!(%err, "failed to persist user state");
    }
}

async fn fetch_equipment_catalog(
    mut state: Signal<AppState>,
    toasts: Signal<Vec<ToastMessage>>,
    client: Option<InventoryClient>,
) -> Option<CacheStatus> {
    let Some(client) = client else {
        push_toast(
            toasts,
            ToastKind::Error,
            "Backend URL is invalid; check Settings.",
        );
        return None;
    };

    match client.get_equipment_numbers().await {
        Ok(payload) => {
            state.with_mut(|st| {
                st.equipment_catalog = payload.data.clone();
                st.cache
                    .record_fetch(CacheResource::EquipmentCatalog, payload.fetched_at);
            });
            if payload.status == CacheStatus::Stale {
                push_toast(
                    toasts,
                    ToastKind::Warning,
                    "Backend unreachable; showing the cached equipment catalogue.",
                );
            }
            Some(payload.status)
        }
        Err(err) => {
            tracing::error!(%err, "equipment catalogue unavailable");
            push_toast(
                toasts,
                ToastKind::Error,
                format!("Failed to load equipment catalogue: {err}"),
            );
            None
        }
    }
}

#[component]
pub fn Rrp() -> Element {
    rsx! { Shell { RrpPage {} } }
}

#[component]
pub fn Equipment() -> Element {
    rsx! { Shell { EquipmentPage {} } }
}

#[component]
pub fn Settings() -> Element {
    rsx! { Shell { SettingsPage {} } }
}
