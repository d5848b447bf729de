//! Persistent on-disk cache of the equipment catalogue with TTL tracking.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

const CACHE_DIR: &str = "hangar-stores";
const CACHE_FILENAME: &str = "equipment_catalog.json";

/// Equipment numbers change when aircraft or ground equipment are registered; a week is plenty.
pub const EQUIPMENT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentCatalogCache {
    /// Backend version that produced the catalogue, when known.
    #[serde(default)]
    pub server_version: Option<String>,
    /// Unix timestamp (seconds) when this cache was created.
    pub cached_at: u64,
    pub equipment_numbers: Vec<String>,
}

impl EquipmentCatalogCache {
    pub fn new(server_version: Option<String>, equipment_numbers: Vec<String>) -> Self {
        Self {
            server_version,
            cached_at: unix_now(),
            equipment_numbers,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age() > EQUIPMENT_CACHE_TTL
    }

    pub fn age(&self) -> Duration {
        Duration::from_secs(unix_now().saturating_sub(self.cached_at))
    }

    pub fn age_string(&self) -> String {
        age_string(self.age())
    }

    pub fn fetched_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.cached_at)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Compact age such as `45s`, `12m`, `3h` or `2d`.
pub fn age_string(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

fn cache_path() -> PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CACHE_DIR);
        if let Err(err) = fs::create_dir_all(&base) {
            tracing::warn!(path = %base.display(), %err, "could not create cache directory");
        }
        base.join(CACHE_FILENAME)
    })
    .clone()
}

/// Loads the equipment catalogue if present and not expired.
pub fn load_equipment_cache() -> Option<EquipmentCatalogCache> {
    load_equipment_cache_from(&cache_path())
}

pub fn save_equipment_cache(cache: &EquipmentCatalogCache) -> Result<(), std::io::Error> {
    save_equipment_cache_to(&cache_path(), cache)
}

pub fn load_equipment_cache_from(path: &Path) -> Option<EquipmentCatalogCache> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no equipment cache found");
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(%err, "failed to read equipment cache");
            return None;
        }
    };

    match serde_json::from_str::<EquipmentCatalogCache>(&content) {
        Ok(cache) if cache.is_expired() => {
            tracing::info!(age = %cache.age_string(), "equipment cache expired");
            None
        }
        Ok(cache) => {
            tracing::info!(
                entries = cache.equipment_numbers.len(),
                age = %cache.age_string(),
                "loaded equipment cache"
            );
            Some(cache)
        }
        Err(err) => {
            tracing::warn!(%err, "failed to parse equipment cache");
            None
        }
    }
}

pub fn save_equipment_cache_to(
    path: &Path,
    cache: &EquipmentCatalogCache,
) -> Result<(), std::io::Error> {
    let content = serde_json::to_string(cache)?;
    fs::write(path, content)?;
    tracing::info!(
        entries = cache.equipment_numbers.len(),
        path = %path.display(),
        "saved equipment cache"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn scratch_file() -> PathBuf {
        std::env::temp_dir().join(format!("hangar-stores-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn saved_cache_loads_back() {
        let path = scratch_file();
        let cache = EquipmentCatalogCache::new(
            Some("1.4.0".to_string()),
            vec!["9N-AKA".to_string(), "204".to_string()],
        );
        save_equipment_cache_to(&path, &cache).unwrap();

        let loaded = load_equipment_cache_from(&path).unwrap();
        assert_eq!(loaded, cache);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn expired_cache_is_ignored() {
        let path = scratch_file();
        let mut cache = EquipmentCatalogCache::new(None, vec!["1".to_string()]);
        cache.cached_at = cache
            .cached_at
            .saturating_sub(EQUIPMENT_CACHE_TTL.as_secs() + 60);
        save_equipment_cache_to(&path, &cache).unwrap();

        assert!(cache.is_expired());
        assert!(load_equipment_cache_from(&path).is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_or_corrupt_cache_is_none() {
        let path = scratch_file();
        assert!(load_equipment_cache_from(&path).is_none());

        fs::write(&path, "{not json").unwrap();
        assert!(load_equipment_cache_from(&path).is_none());
        let _ = fs::remove_file(path);
    }

    #[rstest]
    #[case(5, "5s")]
    #[case(125, "2m")]
    #[case(7_300, "2h")]
    #[case(200_000, "2d")]
    fn ages_are_compact(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(age_string(Duration::from_secs(secs)), expected);
    }
}
