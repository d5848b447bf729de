use std::{
    collections::HashMap,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

use super::entities::{PurchaseOrigin, RrpDraft, RrpStatus};
use super::rrp::DEFAULT_VAT_RATE_PERCENT;

pub const API_URL_ENV: &str = "HANGAR_STORES_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/";

/// User-editable configuration, persisted next to the current draft.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub default_vat_rate_percent: f64,
    #[serde(default)]
    pub default_origin: PurchaseOrigin,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            default_vat_rate_percent: DEFAULT_VAT_RATE_PERCENT,
            default_origin: PurchaseOrigin::Local,
        }
    }
}

impl Settings {
    /// Environment wins over the persisted base URL so deployments can pin a backend.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                tracing::info!(%url, "using API base URL from {API_URL_ENV}");
                self.api_base_url = url.to_string();
            }
        }
        self
    }

    /// Starts a fresh draft seeded with the configured defaults.
    pub fn new_draft(&self) -> RrpDraft {
        RrpDraft {
            origin: self.default_origin,
            ..RrpDraft::with_vat_rate(self.default_vat_rate_percent)
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub settings: Settings,
    pub draft: RrpDraft,
    /// Status of the RRP the draft was loaded from, if any.
    pub loaded_status: Option<RrpStatus>,
    pub equipment_catalog: Vec<String>,
    pub equipment_input: String,
    pub equipment_selection: Vec<String>,
    pub cache: CacheTimestamps,
}

impl AppState {
    pub fn is_stale(&self, resource: &CacheResource, ttl: Duration) -> bool {
        self.cache.is_stale(resource, ttl)
    }

    pub fn apply_persisted(&mut self, persisted: PersistedState) {
        self.settings = persisted.settings;
        self.draft = persisted.draft;
        self.equipment_input = persisted.equipment_input;
        self.equipment_selection = persisted.equipment_selection;
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            settings: self.settings.clone(),
            draft: self.draft.clone(),
            equipment_input: self.equipment_input.clone(),
            equipment_selection: self.equipment_selection.clone(),
        }
    }

    pub fn reset_draft(&mut self) {
        self.draft = self.settings.new_draft();
        self.loaded_status = None;
    }
}

#[derive(Clone, Debug, Default)]
pub struct CacheTimestamps {
    entries: HashMap<CacheResource, SystemTime>,
}

impl CacheTimestamps {
    pub fn record_fetch(&mut self, resource: CacheResource, fetched_at: SystemTime) {
        self.entries.insert(resource, fetched_at);
    }

    pub fn fetched_at(&self, resource: &CacheResource) -> Option<SystemTime> {
        self.entries.get(resource).copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CacheResource, &SystemTime)> {
        self.entries.iter()
    }

    pub fn is_stale(&self, resource: &CacheResource, ttl: Duration) -> bool {
        self.fetched_at(resource)
            .map(|time| time.elapsed().map(|elapsed| elapsed > ttl).unwrap_or(true))
            .unwrap_or(true)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheResource {
    EquipmentCatalog,
    Rrp(String),
}

impl CacheResource {
    pub fn label(&self) -> String {
        match self {
            Self::EquipmentCatalog => "Equipment catalogue".to_string(),
            Self::Rrp(number) => format!("RRP {number}"),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub draft: RrpDraft,
    #[serde(default)]
    pub equipment_input: String,
    #[serde(default)]
    pub equipment_selection: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_resources_are_stale() {
        let cache = CacheTimestamps::default();
        assert!(cache.is_stale(&CacheResource::EquipmentCatalog, Duration::from_secs(60)));
    }

    #[test]
    fn recent_fetches_are_fresh_until_ttl() {
        let mut cache = CacheTimestamps::default();
        cache.record_fetch(CacheResource::EquipmentCatalog, SystemTime::now());
        assert!(!cache.is_stale(&CacheResource::EquipmentCatalog, Duration::from_secs(60)));

        let old = SystemTime::now() - Duration::from_secs(120);
        cache.record_fetch(CacheResource::Rrp("RRP-1".into()), old);
        assert!(cache.is_stale(&CacheResource::Rrp("RRP-1".into()), Duration::from_secs(60)));
    }

    #[test]
    fn catalogue_goes_stale_an_hour_after_its_fetch() {
        let hour = Duration::from_secs(60 * 60);
        let mut state = AppState::default();
        assert!(state.is_stale(&CacheResource::EquipmentCatalog, hour));

        state.cache.record_fetch(
            CacheResource::EquipmentCatalog,
            SystemTime::now() - Duration::from_secs(30 * 60),
        );
        assert!(!state.is_stale(&CacheResource::EquipmentCatalog, hour));

        state.cache.record_fetch(
            CacheResource::EquipmentCatalog,
            SystemTime::now() - Duration::from_secs(61 * 60),
        );
        assert!(state.is_stale(&CacheResource::EquipmentCatalog, hour));

        state.cache.clear();
        assert!(state.is_stale(&CacheResource::EquipmentCatalog, hour));
    }

    #[test]
    fn persisted_state_tolerates_missing_sections() {
        let persisted: PersistedState =
            serde_json::from_str(r#"{"equipment_selection": ["204"]}"#).unwrap();
        assert_eq!(persisted.settings, Settings::default());
        assert_eq!(persisted.equipment_selection, vec!["204".to_string()]);
        assert_eq!(persisted.draft.items.len(), 1);
    }

    #[test]
    fn new_drafts_use_configured_defaults() {
        let settings = Settings {
            default_vat_rate_percent: 15.0,
            default_origin: PurchaseOrigin::Foreign,
            ..Settings::default()
        };
        let draft = settings.new_draft();
        assert_eq!(draft.vat_rate_percent, "15");
        assert_eq!(draft.origin, PurchaseOrigin::Foreign);
    }

    #[test]
    fn state_round_trips_through_persistence() {
        let mut state = AppState::default();
        state.equipment_input = "200-204".to_string();
        state.draft.supplier = "Avio".to_string();

        let mut restored = AppState::default();
        restored.apply_persisted(state.to_persisted());
        assert_eq!(restored.equipment_input, "200-204");
        assert_eq!(restored.draft.supplier, "Avio");
    }
}
