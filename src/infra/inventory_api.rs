//! Thin asynchronous, read-only client for the inventory backend.
//!
//! - Loads RRP records and the equipment catalogue.
//! - Keeps a 60-minute in-memory cache with stale fallbacks; the catalogue is also
//!   mirrored to disk so the range select keeps working offline.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use reqwest::{Client, Url};
use semver::{Version, VersionReq};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::amount::{lenient_amount, lenient_percentage};
use crate::domain::entities::{parse_invoice_date, PurchaseOrigin, RrpRecord, RrpStatus};
use crate::domain::rrp::{
    decode_line_items, RrpError, RrpTotals, DEFAULT_VAT_RATE_PERCENT,
};
use crate::infra::cache::{load_equipment_cache, save_equipment_cache, EquipmentCatalogCache};
use crate::util::version::{parse_version_str, VersionError};

/// How long fetched data is served without asking the backend again.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
const USER_AGENT: &str = concat!("hangar-stores/", env!("CARGO_PKG_VERSION"));

/// Backend API versions this client understands.
pub const SUPPORTED_SERVER_VERSIONS: &str = "^1";

#[derive(Debug, Error)]
pub enum InventoryApiError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("base URL cannot have path segments")]
    CannotBeABase,
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
    #[error("invalid version requirement: {0}")]
    InvalidRequirement(#[from] semver::Error),
    #[error("server reported an {0}")]
    ServerVersion(#[from] VersionError),
    #[error("server version {server} is not supported (requires {required})")]
    Incompatible { server: Version, required: VersionReq },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Cached,
    Stale,
}

#[derive(Clone, Debug)]
pub struct CachedPayload<T> {
    pub data: T,
    pub fetched_at: SystemTime,
    pub status: CacheStatus,
}

impl<T> CachedPayload<T> {
    fn new(data: T, fetched_at: SystemTime, status: CacheStatus) -> Self {
        Self {
            data,
            fetched_at,
            status,
        }
    }
}

/// An RRP as loaded from the backend.
///
/// `items_error` is set when the payload's item list was not a list; the record then has
/// no items and `totals` is zero.
#[derive(Clone, Debug, PartialEq)]
pub struct RrpPayload {
    pub record: RrpRecord,
    pub totals: RrpTotals,
    pub items_error: Option<RrpError>,
}

#[derive(Default)]
struct InventoryCache {
    equipment: Option<Cached<Vec<String>>>,
    rrps: HashMap<String, Cached<RrpPayload>>,
}

impl InventoryCache {
    fn clear(&mut self) {
        self.equipment = None;
        self.rrps.clear();
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T, InventoryApiError> {
    let ApiEnvelope {
        status,
        data,
        message,
    } = envelope;

    if status.eq_ignore_ascii_case("ok") || status.eq_ignore_ascii_case("success") {
        data.ok_or_else(|| InventoryApiError::Api("response missing data".into()))
    } else {
        Err(InventoryApiError::Api(message.unwrap_or(status)))
    }
}

#[derive(Clone)]
pub struct InventoryClient {
    http: Client,
    base_url: Url,
    cache: Arc<Mutex<InventoryCache>>,
    ttl: Duration,
}

impl InventoryClient {
    pub fn new(base: &str) -> Result<Self, InventoryApiError> {
        let base_url = normalize_base_url(base)?;
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url,
            cache: Arc::new(Mutex::new(InventoryCache::default())),
            ttl: DEFAULT_TTL,
        })
    }

    pub async fn get_rrp(
        &self,
        rrp_number: &str,
    ) -> Result<CachedPayload<RrpPayload>, InventoryApiError> {
        let key = rrp_number.trim().to_string();
        if let Some(payload) = self.cached_rrp(&key).await {
            tracing::debug!(rrp = %key, "serving cached RRP");
            return Ok(payload);
        }

        let mut url = self.url("rrp/")?;
        url.path_segments_mut()
            .map_err(|_| InventoryApiError::CannotBeABase)?
            .pop_if_empty()
            .push(&key);

        tracing::info!(%url, "requesting RRP");
        match self.fetch_data::<RrpDto>(self.http.get(url)).await {
            Ok(dto) => {
                let payload = dto.into_payload();
                if let Some(err) = &payload.items_error {
                    tracing::warn!(rrp = %key, %err, "RRP items were not a list");
                }
                Ok(self.store_rrp(&key, payload).await)
            }
            Err(error) => {
                tracing::warn!(rrp = %key, %error, "RRP request failed");
                if let Some(stale) = self.cached_rrp_stale(&key).await {
                    return Ok(stale);
                }
                Err(error)
            }
        }
    }

    pub async fn get_equipment_numbers(
        &self,
    ) -> Result<CachedPayload<Vec<String>>, InventoryApiError> {
        if let Some(payload) = self.cached_equipment().await {
            return Ok(payload);
        }

        let url = self.url("equipment")?;
        match self
            .fetch_data::<Vec<EquipmentDto>>(self.http.get(url))
            .await
        {
            Ok(response) => {
                let numbers = equipment_numbers(response);
                tracing::info!(count = numbers.len(), "loaded equipment catalogue");

                let server_version = self.get_server_version().await.ok().map(|v| v.to_string());
                let disk = EquipmentCatalogCache::new(server_version, numbers.clone());
                if let Err(err) = save_equipment_cache(&disk) {
                    tracing::warn!(%err, "failed to save equipment cache");
                }

                Ok(self.store_equipment(numbers, CacheStatus::Fresh).await)
            }
            Err(error) => {
                tracing::warn!(%error, "equipment request failed; trying caches");
                if let Some(stale) = self.cached_equipment_stale().await {
                    return Ok(stale);
                }
                if let Some(disk) = load_equipment_cache() {
                    let fetched_at = disk.fetched_at();
                    let payload =
                        CachedPayload::new(disk.equipment_numbers.clone(), fetched_at, CacheStatus::Stale);
                    self.cache.lock().await.equipment =
                        Some(Cached::new(disk.equipment_numbers, fetched_at));
                    return Ok(payload);
                }
                Err(error)
            }
        }
    }

    pub async fn get_server_version(&self) -> Result<Version, InventoryApiError> {
        let url = self.url("version")?;
        let dto: VersionDto = self.fetch_data(self.http.get(url)).await?;
        Ok(parse_version_str(&dto.version)?)
    }

    /// Fails with [`InventoryApiError::Incompatible`] when the backend is outside
    /// [`SUPPORTED_SERVER_VERSIONS`].
    pub async fn check_compatibility(&self) -> Result<Version, InventoryApiError> {
        let server = self.get_server_version().await?;
        ensure_supported(server)
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    async fn cached_rrp(&self, key: &str) -> Option<CachedPayload<RrpPayload>> {
        let cache = self.cache.lock().await;
        cache.rrps.get(key).and_then(|entry| entry.if_fresh(self.ttl))
    }

    async fn cached_rrp_stale(&self, key: &str) -> Option<CachedPayload<RrpPayload>> {
        let cache = self.cache.lock().await;
        cache.rrps.get(key).map(Cached::stale)
    }

    async fn store_rrp(&self, key: &str, data: RrpPayload) -> CachedPayload<RrpPayload> {
        let fetched_at = SystemTime::now();
        let payload = CachedPayload::new(data.clone(), fetched_at, CacheStatus::Fresh);
        let mut cache = self.cache.lock().await;
        cache
            .rrps
            .insert(key.to_string(), Cached::new(data, fetched_at));
        payload
    }

    async fn cached_equipment(&self) -> Option<CachedPayload<Vec<String>>> {
        let cache = self.cache.lock().await;
        cache
            .equipment
            .as_ref()
            .and_then(|entry| entry.if_fresh(self.ttl))
    }

    async fn cached_equipment_stale(&self) -> Option<CachedPayload<Vec<String>>> {
        let cache = self.cache.lock().await;
        cache.equipment.as_ref().map(Cached::stale)
    }

    async fn store_equipment(
        &self,
        data: Vec<String>,
        status: CacheStatus,
    ) -> CachedPayload<Vec<String>> {
        let fetched_at = SystemTime::now();
        let payload = CachedPayload::new(data.clone(), fetched_at, status);
        let mut cache = self.cache.lock().await;
        cache.equipment = Some(Cached::new(data, fetched_at));
        payload
    }

    async fn fetch_data<T>(&self, builder: reqwest::RequestBuilder) -> Result<T, InventoryApiError>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await?.error_for_status()?;
        let envelope: ApiEnvelope<T> = response.json().await?;
        unwrap_envelope(envelope)
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

/// Ensures the base URL ends with `/` so relative joins stay under it.
fn normalize_base_url(base: &str) -> Result<Url, InventoryApiError> {
    let trimmed = base.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash)?;
    if url.cannot_be_a_base() {
        return Err(InventoryApiError::CannotBeABase);
    }
    Ok(url)
}

fn ensure_supported(server: Version) -> Result<Version, InventoryApiError> {
    let required = VersionReq::parse(SUPPORTED_SERVER_VERSIONS)?;
    if required.matches(&server) {
        Ok(server)
    } else {
        Err(InventoryApiError::Incompatible { server, required })
    }
}

struct Cached<T> {
    value: T,
    fetched_at: SystemTime,
}

impl<T: Clone> Cached<T> {
    fn new(value: T, fetched_at: SystemTime) -> Self {
        Self { value, fetched_at }
    }

    fn if_fresh(&self, ttl: Duration) -> Option<CachedPayload<T>> {
        if self
            .fetched_at
            .elapsed()
            .map(|elapsed| elapsed <= ttl)
            .unwrap_or(false)
        {
            Some(CachedPayload::new(
                self.value.clone(),
                self.fetched_at,
                CacheStatus::Cached,
            ))
        } else {
            None
        }
    }

    fn stale(&self) -> CachedPayload<T> {
        CachedPayload::new(self.value.clone(), self.fetched_at, CacheStatus::Stale)
    }
}

#[derive(Debug, Deserialize)]
struct VersionDto {
    version: String,
}

#[derive(Debug, Deserialize)]
struct EquipmentDto {
    #[serde(
        alias = "equipmentNumber",
        alias = "equipment_no",
        deserialize_with = "identifier_from_json"
    )]
    equipment_number: String,
    #[serde(default)]
    active: Option<bool>,
}

/// Active, non-blank equipment numbers, deduplicated in catalogue order.
fn equipment_numbers(entries: Vec<EquipmentDto>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|entry| entry.active.unwrap_or(true))
        .map(|entry| entry.equipment_number.trim().to_string())
        .filter(|number| !number.is_empty() && seen.insert(number.clone()))
        .collect()
}

#[derive(Debug, Deserialize)]
struct RrpDto {
    #[serde(
        alias = "rrpNumber",
        alias = "rrp_no",
        deserialize_with = "identifier_from_json"
    )]
    rrp_number: String,
    #[serde(default, alias = "supplier_name", deserialize_with = "identifier_from_json")]
    supplier: String,
    #[serde(default, alias = "invoiceNumber", deserialize_with = "identifier_from_json")]
    invoice_number: String,
    #[serde(default, alias = "invoiceDate")]
    invoice_date: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default, alias = "purchase_type", alias = "type")]
    origin: Option<String>,
    #[serde(default, alias = "freightCharge", deserialize_with = "lenient_amount")]
    freight_charge: f64,
    #[serde(
        default,
        alias = "customServiceCharge",
        deserialize_with = "lenient_amount"
    )]
    custom_service_charge: f64,
    #[serde(
        default,
        alias = "vat_rate",
        alias = "vatRate",
        deserialize_with = "lenient_percentage"
    )]
    vat_rate_percent: Option<f64>,
    #[serde(default)]
    items: Value,
    #[serde(default, alias = "approval_status")]
    status: Option<String>,
}

impl RrpDto {
    fn into_payload(self) -> RrpPayload {
        let mut record = RrpRecord {
            rrp_number: self.rrp_number,
            supplier: self.supplier,
            invoice_number: self.invoice_number,
            invoice_date: self.invoice_date.as_deref().and_then(parse_invoice_date),
            currency: self.currency.unwrap_or_else(|| "NPR".to_string()),
            origin: self
                .origin
                .as_deref()
                .map(PurchaseOrigin::from_flag)
                .unwrap_or_default(),
            freight_charge: self.freight_charge,
            custom_service_charge: self.custom_service_charge,
            vat_rate_percent: self.vat_rate_percent.unwrap_or(DEFAULT_VAT_RATE_PERCENT),
            items: Vec::new(),
            status: self
                .status
                .as_deref()
                .map(RrpStatus::from_flag)
                .unwrap_or_default(),
        };

        let items_error = match decode_line_items(&self.items) {
            Ok(items) => {
                record.items = items;
                None
            }
            Err(err) => {
                tracing::warn!(rrp = %record.rrp_number, %err, "RRP items are unusable");
                Some(err)
            }
        };
        let totals = record.totals();

        RrpPayload {
            record,
            totals,
            items_error,
        }
    }
}

/// Identifiers arrive as strings or bare numbers depending on the endpoint; null is blank.
fn identifier_from_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct StringOrNumber;

    impl<'de> serde::de::Visitor<'de> for StringOrNumber {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string, a number or null")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(String::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn decode_rrp(value: Value) -> RrpPayload {
        let envelope: ApiEnvelope<RrpDto> = serde_json::from_value(value).unwrap();
        unwrap_envelope(envelope).unwrap().into_payload()
    }

    #[test]
    fn rrp_payload_maps_to_record() {
        let payload = decode_rrp(json!({
            "status": "ok",
            "data": {
                "rrp_no": 42,
                "supplier_name": "Avio Parts",
                "invoiceNumber": "INV-9",
                "invoice_date": "2024-02-29",
                "currency": "USD",
                "purchase_type": "foreign",
                "freight_charge": "120.5",
                "custom_service_charge": 30,
                "vat_rate": null,
                "approval_status": "approved",
                "items": [
                    {"item_name": "Tyre", "item_price": "250", "quantity": 2, "vat": 1, "customs_charge": "10", "forex_rate": "133.2"}
                ]
            }
        }));

        assert!(payload.items_error.is_none());
        assert_eq!(payload.totals, payload.record.totals());
        let record = payload.record;
        assert_eq!(record.rrp_number, "42");
        assert_eq!(record.supplier, "Avio Parts");
        assert_eq!(record.origin, PurchaseOrigin::Foreign);
        assert_eq!(record.status, RrpStatus::Approved);
        assert_eq!(record.freight_charge, 120.5);
        assert_eq!(record.vat_rate_percent, DEFAULT_VAT_RATE_PERCENT);
        assert_eq!(record.invoice_date.map(|d| d.day()), Some(29));
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.items[0].price, 250.0);
        assert!(record.items[0].vat);
    }

    #[test]
    fn non_list_items_surface_as_error_with_zero_totals() {
        let payload = decode_rrp(json!({
            "status": "success",
            "data": {"rrp_number": "RRP-7", "freight_charge": 100, "items": {"0": {"price": 5}}}
        }));
        assert_eq!(
            payload.items_error,
            Some(RrpError::ItemsNotAList { found: "an object" })
        );
        assert!(payload.record.items.is_empty());
        assert_eq!(payload.totals, RrpTotals::default());
    }

    #[test]
    fn error_envelopes_carry_the_server_message() {
        let envelope: ApiEnvelope<RrpDto> = serde_json::from_value(json!({
            "status": "error",
            "data": null,
            "message": "RRP not found"
        }))
        .unwrap();
        match unwrap_envelope(envelope) {
            Err(InventoryApiError::Api(message)) => assert_eq!(message, "RRP not found"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn equipment_catalogue_skips_inactive_and_duplicates() {
        let entries: Vec<EquipmentDto> = serde_json::from_value(json!([
            {"equipment_number": 204},
            {"equipmentNumber": "GPU-A7"},
            {"equipment_no": "204"},
            {"equipment_number": "  "},
            {"equipment_number": "9N-AKB", "active": false}
        ]))
        .unwrap();
        assert_eq!(equipment_numbers(entries), vec!["204", "GPU-A7"]);
    }

    #[rstest]
    #[case("http://localhost:8000/api", "http://localhost:8000/api/rrp/")]
    #[case("http://localhost:8000/api/", "http://localhost:8000/api/rrp/")]
    fn base_urls_gain_trailing_slash(#[case] base: &str, #[case] expected: &str) {
        let url = normalize_base_url(base).unwrap().join("rrp/").unwrap();
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn opaque_base_urls_are_rejected() {
        assert!(matches!(
            normalize_base_url("mailto:stores@example.com"),
            Err(InventoryApiError::CannotBeABase)
        ));
    }

    #[rstest]
    #[case("1.4.2", true)]
    #[case("v1.0.0", true)]
    #[case("2.0.0", false)]
    #[case("0.9.1", false)]
    fn server_versions_are_checked(#[case] raw: &str, #[case] supported: bool) {
        let version = parse_version_str(raw).unwrap();
        assert_eq!(ensure_supported(version).is_ok(), supported);
    }

    #[test]
    fn garbage_versions_fail_to_parse() {
        let err = InventoryApiError::from(parse_version_str("latest").unwrap_err());
        assert!(matches!(
            err,
            InventoryApiError::ServerVersion(VersionError::InvalidVersion(_))
        ));
        assert!(err
            .to_string()
            .starts_with("server reported an invalid version format"));
    }
}
