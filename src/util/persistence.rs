use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde_json::Error as SerdeError;

use crate::domain::app_state::PersistedState;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "HangarStores";
const APP_NAME: &str = "HangarStores";
const STATE_FILE: &str = "state.json";

fn data_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(STATE_FILE))
}

pub fn load_persisted_state() -> Option<PersistedState> {
    load_persisted_state_from(&data_file()?)
}

pub fn save_persisted_state(state: &PersistedState) -> Result<(), PersistSaveError> {
    let path = data_file().ok_or(PersistSaveError::StorageUnavailable)?;
    save_persisted_state_to(&path, state)
}

/// A missing file is a first run; a corrupt one is logged and ignored.
pub fn load_persisted_state_from(path: &Path) -> Option<PersistedState> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to read saved state");
            return None;
        }
    };
    match serde_json::from_str(&data) {
        Ok(state) => Some(state),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "ignoring unreadable saved state");
            None
        }
    }
}

pub fn save_persisted_state_to(path: &Path, state: &PersistedState) -> Result<(), PersistSaveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json)?;
    tracing::debug!(path = %path.display(), "saved state");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PersistSaveError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PurchaseOrigin;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("hangar-stores-state-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn state_survives_a_restart() {
        let dir = scratch_dir();
        let path = dir.join(STATE_FILE);
        let mut state = PersistedState::default();
        state.settings.default_origin = PurchaseOrigin::Foreign;
        state.draft.supplier = "Avio Parts".to_string();
        state.equipment_input = "9N-AKA, 200-204".to_string();

        save_persisted_state_to(&path, &state).unwrap();
        let loaded = load_persisted_state_from(&path).unwrap();

        assert_eq!(loaded.settings.default_origin, PurchaseOrigin::Foreign);
        assert_eq!(loaded.draft, state.draft);
        assert_eq!(loaded.equipment_input, state.equipment_input);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_and_corrupt_files_load_as_none() {
        let dir = scratch_dir();
        let path = dir.join(STATE_FILE);
        assert!(load_persisted_state_from(&path).is_none());

        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, "[1, 2").unwrap();
        assert!(load_persisted_state_from(&path).is_none());
        let _ = fs::remove_dir_all(dir);
    }
}
