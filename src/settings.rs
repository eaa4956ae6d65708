use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};
use tokio::sync::watch;

use crate::error::PersistenceError;

pub const SLIDER_MIN: f32 = 1.0;
pub const SLIDER_MAX: f32 = 10.0;

/// Timer configuration as slider positions on the 1–10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub focus_dur: f32,
    pub rest_dur: f32,
    pub long_rest_dur: f32,
    pub rounds: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_dur: 5.0,
            rest_dur: 1.0,
            long_rest_dur: 3.0,
            rounds: 4.0,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), PersistenceError> {
        let fields = [
            ("focusDur", self.focus_dur),
            ("restDur", self.rest_dur),
            ("longRestDur", self.long_rest_dur),
            ("rounds", self.rounds),
        ];
        for (field, value) in fields {
            if !(SLIDER_MIN..=SLIDER_MAX).contains(&value) {
                return Err(PersistenceError::InvalidSettings { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UserSettings {
    timer: Settings,
    volume: f32,
    dark_theme: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            timer: Settings::default(),
            volume: 0.5,
            dark_theme: false,
        }
    }
}

impl UserSettings {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let mut data: UserSettings = match serde_json::from_str(&contents) {
            Ok(data) => data,
            Err(err) => {
                warn!("Settings file {} is unreadable ({err}); using defaults", path.display());
                return Ok(Self::default());
            }
        };

        if let Err(err) = data.timer.validate() {
            warn!("Stored timer settings rejected ({err}); using defaults");
            data.timer = Settings::default();
        }
        data.volume = clamp_volume(data.volume).unwrap_or(0.5);

        Ok(data)
    }
}

fn clamp_volume(volume: f32) -> Option<f32> {
    volume.is_finite().then(|| volume.clamp(0.0, 1.0))
}

/// JSON-backed store for timer settings, volume and theme.
///
/// Every accessor has a matching `observe_*` receiver that always holds the
/// current value and is notified on each successful save.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
    settings_tx: watch::Sender<Settings>,
    volume_tx: watch::Sender<f32>,
    dark_theme_tx: watch::Sender<bool>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = UserSettings::load(&path)?;
        info!("Settings loaded from {}", path.display());

        Ok(Self {
            path,
            settings_tx: watch::Sender::new(data.timer),
            volume_tx: watch::Sender::new(data.volume),
            dark_theme_tx: watch::Sender::new(data.dark_theme),
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> Settings {
        self.read().timer
    }

    pub fn volume(&self) -> f32 {
        self.read().volume
    }

    pub fn dark_theme(&self) -> bool {
        self.read().dark_theme
    }

    pub fn observe_settings(&self) -> watch::Receiver<Settings> {
        self.settings_tx.subscribe()
    }

    pub fn observe_volume(&self) -> watch::Receiver<f32> {
        self.volume_tx.subscribe()
    }

    pub fn observe_dark_theme(&self) -> watch::Receiver<bool> {
        self.dark_theme_tx.subscribe()
    }

    pub fn save_settings(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.update(|data| data.timer = settings)?;
        self.settings_tx.send_replace(settings);
        Ok(())
    }

    pub fn save_volume(&self, volume: f32) -> Result<()> {
        let Some(volume) = clamp_volume(volume) else {
            bail!("volume must be a finite number");
        };
        self.update(|data| data.volume = volume)?;
        self.volume_tx.send_replace(volume);
        Ok(())
    }

    pub fn save_dark_theme(&self, dark_theme: bool) -> Result<()> {
        self.update(|data| data.dark_theme = dark_theme)?;
        self.dark_theme_tx.send_replace(dark_theme);
        Ok(())
    }

    /// Re-reads the file and republishes every value.
    pub fn reload(&self) -> Result<()> {
        let data = UserSettings::load(&self.path)?;
        self.settings_tx.send_replace(data.timer);
        self.volume_tx.send_replace(data.volume);
        self.dark_theme_tx.send_replace(data.dark_theme);
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        Ok(())
    }

    fn read(&self) -> UserSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // The file is written before memory changes so a failed write leaves
    // both untouched.
    fn update(&self, apply: impl FnOnce(&mut UserSettings)) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut candidate = guard.clone();
        apply(&mut candidate);
        self.persist(&candidate)?;
        *guard = candidate;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.json")).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.settings(), Settings::default());
        assert_eq!(store.volume(), 0.5);
        assert!(!store.dark_theme());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        let store = store_in(&dir);
        assert_eq!(store.settings(), Settings::default());
    }

    #[test]
    fn saved_values_survive_a_restart() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            focus_dur: 6.0,
            rest_dur: 2.0,
            long_rest_dur: 4.0,
            rounds: 3.0,
        };
        {
            let store = store_in(&dir);
            store.save_settings(settings).unwrap();
            store.save_volume(0.8).unwrap();
            store.save_dark_theme(true).unwrap();
        }
        let store = store_in(&dir);
        assert_eq!(store.settings(), settings);
        assert_eq!(store.volume(), 0.8);
        assert!(store.dark_theme());
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let bad = Settings {
            rounds: 11.0,
            ..Settings::default()
        };
        let err = store.save_settings(bad).unwrap_err();
        match err.downcast_ref::<PersistenceError>() {
            Some(PersistenceError::InvalidSettings { field, value }) => {
                assert_eq!(*field, "rounds");
                assert_eq!(*value, 11.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.settings(), Settings::default());
        assert!(!dir.path().join("settings.json").exists());
    }

    #[test]
    fn volume_is_clamped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save_volume(3.0).unwrap();
        assert_eq!(store.volume(), 1.0);
        assert!(store.save_volume(f32::NAN).is_err());
    }

    #[test]
    fn observers_see_saves() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut settings_rx = store.observe_settings();
        let theme_rx = store.observe_dark_theme();

        let updated = Settings {
            focus_dur: 2.0,
            ..Settings::default()
        };
        store.save_settings(updated).unwrap();
        store.save_dark_theme(true).unwrap();

        assert!(settings_rx.has_changed().unwrap());
        assert_eq!(*settings_rx.borrow_and_update(), updated);
        assert!(*theme_rx.borrow());
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let other = store_in(&dir);
        other.save_volume(0.1).unwrap();

        let volume_rx = store.observe_volume();
        store.reload().unwrap();
        assert_eq!(store.volume(), 0.1);
        assert_eq!(*volume_rx.borrow(), 0.1);
    }
}
