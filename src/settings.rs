use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

pub const DEFAULT_CONFIG_FILE: &str = "medreminder.json";
const DEBUG_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundSettings {
    pub enabled: bool,
    pub volume: f32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    /// Bearer token to use instead of logging in. Never written back to disk.
    #[serde(skip_serializing)]
    pub session_id: Option<String>,
    pub poll_interval_secs: u64,
    pub snooze_minutes: u64,
    pub request_timeout_secs: u64,
    pub auto_dismiss_secs: u64,
    pub shown_capacity: usize,
    pub sound: SoundSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".into(),
            session_id: None,
            poll_interval_secs: 30,
            snooze_minutes: 5,
            request_timeout_secs: 10,
            auto_dismiss_secs: 120,
            shown_capacity: 100,
            sound: SoundSettings::default(),
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn snooze_delay(&self) -> Duration {
        Duration::from_secs(self.snooze_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn auto_dismiss(&self) -> Duration {
        Duration::from_secs(self.auto_dismiss_secs)
    }

    /// Apply `MEDREMINDER_*` overrides on top of whatever the file said.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MEDREMINDER_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(token) = lookup("MEDREMINDER_SESSION").filter(|v| !v.trim().is_empty()) {
            self.session_id = Some(token.trim().to_string());
        }
        let debug_mode = lookup("MEDREMINDER_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.poll_interval_secs = DEBUG_POLL_INTERVAL_SECS;
        }
    }
}

/// Config file path: `MEDREMINDER_CONFIG` or `./medreminder.json`.
pub fn default_path() -> PathBuf {
    env::var_os("MEDREMINDER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unparsable settings at {}: {err}; using defaults",
                    path.display()
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn update<F>(&self, change: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.write();
        change(&mut *guard);
        self.persist(&guard)?;
        Ok(guard.clone())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("none.json")).unwrap();
        assert_eq!(store.get(), Settings::default());
        assert_eq!(store.get().poll_interval(), Duration::from_secs(30));
        assert_eq!(store.get().snooze_delay(), Duration::from_secs(300));
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get(), Settings::default());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update(|s| {
                s.snooze_minutes = 10;
                s.sound.enabled = false;
                s.session_id = Some("secret".into());
            })
            .unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("secret"));

        let reopened = SettingsStore::new(path).unwrap();
        let settings = reopened.get();
        assert_eq!(settings.snooze_minutes, 10);
        assert!(!settings.sound.enabled);
        assert_eq!(settings.session_id, None);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"api_base_url":"http://clinic:9000"}"#).unwrap();
        let settings = SettingsStore::new(path).unwrap().get();
        assert_eq!(settings.api_base_url, "http://clinic:9000");
        assert_eq!(settings.shown_capacity, 100);
    }

    #[test]
    fn huge_snooze_saturates() {
        let settings = Settings {
            snooze_minutes: u64::MAX,
            ..Settings::default()
        };
        assert_eq!(settings.snooze_delay(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("MEDREMINDER_API_URL", "http://example.test/"),
            ("MEDREMINDER_SESSION", " abc123 "),
            ("MEDREMINDER_DEBUG", "TRUE"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(settings.api_base_url, "http://example.test");
        assert_eq!(settings.session_id.as_deref(), Some("abc123"));
        assert_eq!(settings.poll_interval_secs, DEBUG_POLL_INTERVAL_SECS);
    }
}
