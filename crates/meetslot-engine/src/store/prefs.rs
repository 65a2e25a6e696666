//! Working-hours preference storage.
//!
//! Structurally the same record-file discipline as the credential store,
//! in a separate file. Values are stored verbatim: neither `start < end`
//! ordering nor day-of-week values are validated here; that is the
//! caller's concern.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use meetslot_core::WorkingHours;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Serialize, Deserialize)]
struct PreferenceRecord {
    user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    working_hours: Option<WorkingHours>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
    preferences: Vec<PreferenceRecord>,
}

/// File-backed per-user working-hours store.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Creates a store over the given record file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persists a user's working hours, overwriting any existing record
    /// wholesale.
    pub fn set(&self, user_id: &str, hours: WorkingHours) -> EngineResult<()> {
        let mut data = self.read_all();

        match data
            .preferences
            .iter_mut()
            .find(|record| record.user_id == user_id)
        {
            Some(record) => record.working_hours = Some(hours),
            None => data.preferences.push(PreferenceRecord {
                user_id: user_id.to_string(),
                working_hours: Some(hours),
            }),
        }

        self.write_all(&data)
    }

    /// Returns the user's stored working hours, if any.
    pub fn get(&self, user_id: &str) -> Option<WorkingHours> {
        self.read_all()
            .preferences
            .into_iter()
            .find(|record| record.user_id == user_id)
            .and_then(|record| record.working_hours)
    }

    /// Returns the record file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> PreferenceFile {
        if !self.path.exists() {
            return PreferenceFile::default();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!("failed to read preference file {:?}: {err}", self.path);
                return PreferenceFile::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(data) => data,
            Err(err) => {
                warn!(
                    "preference file {:?} is not valid JSON, starting empty: {err}",
                    self.path
                );
                PreferenceFile::default()
            }
        }
    }

    fn write_all(&self, data: &PreferenceFile) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::configuration(format!("failed to create data directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(data)
            .map_err(|e| EngineError::internal(format!("failed to serialize records: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            EngineError::configuration(format!("failed to write preference file: {}", e))
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            EngineError::configuration(format!("failed to rename preference file: {}", e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hours(start: &str, end: &str) -> WorkingHours {
        WorkingHours {
            days: vec!["1".to_string(), "2".to_string(), "3".to_string()],
            start: start.to_string(),
            end: end.to_string(),
            time_zone: Some("Europe/London".to_string()),
        }
    }

    fn store_in(dir: &TempDir) -> PreferenceStore {
        PreferenceStore::new(dir.path().join("preferences.json"))
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set("alice", hours("09:00", "17:00")).unwrap();
        assert_eq!(store.get("alice"), Some(hours("09:00", "17:00")));
    }

    #[test]
    fn missing_user_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store_in(&dir).get("nobody"), None);
    }

    #[test]
    fn set_overwrites_wholesale() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set("alice", hours("09:00", "17:00")).unwrap();
        store.set("alice", hours("10:00", "16:00")).unwrap();

        assert_eq!(store.get("alice"), Some(hours("10:00", "16:00")));
        let content = fs::read_to_string(store.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["preferences"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn inverted_window_is_stored_verbatim() {
        // No start < end validation at this layer.
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set("alice", hours("17:00", "09:00")).unwrap();
        assert_eq!(store.get("alice"), Some(hours("17:00", "09:00")));
    }

    #[test]
    fn records_for_different_users_coexist() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set("alice", hours("09:00", "17:00")).unwrap();
        store.set("bob", hours("08:00", "12:00")).unwrap();

        assert_eq!(store.get("alice"), Some(hours("09:00", "17:00")));
        assert_eq!(store.get("bob"), Some(hours("08:00", "12:00")));
    }

    #[test]
    fn unparseable_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{broken").unwrap();

        assert_eq!(store.get("alice"), None);
        store.set("alice", hours("09:00", "17:00")).unwrap();
        assert_eq!(store.get("alice"), Some(hours("09:00", "17:00")));
    }
}
