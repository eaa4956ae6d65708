use std::{env, path::PathBuf, time::Duration};

use log::warn;

const DEFAULT_TICK_MS: u64 = 1000;
const DEFAULT_MINUTES_PER_STEP: f32 = 5.0;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Holds `settings.json` and the SQLite ledger.
    pub data_dir: PathBuf,
    pub debug: bool,
    pub tick_interval: Duration,
    /// Minutes one settings-slider step is worth.
    pub minutes_per_step: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            debug: false,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            minutes_per_step: DEFAULT_MINUTES_PER_STEP,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("POMODORO_DATA_DIR").filter(|value| !value.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        config.debug = lookup("POMODORO_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if let Some(raw) = lookup("POMODORO_TICK_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.tick_interval = Duration::from_millis(ms),
                _ => warn!("Ignoring invalid POMODORO_TICK_MS '{raw}'; using {DEFAULT_TICK_MS}"),
            }
        }

        if let Some(raw) = lookup("POMODORO_MINUTES_PER_STEP") {
            match raw.trim().parse::<f32>() {
                Ok(step) if step.is_finite() && step > 0.0 => config.minutes_per_step = step,
                _ => warn!(
                    "Ignoring invalid POMODORO_MINUTES_PER_STEP '{raw}'; using {DEFAULT_MINUTES_PER_STEP}"
                ),
            }
        }

        config
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("pomodoro.sqlite3")
    }

    /// Ticks between heartbeat log lines.
    pub fn heartbeat_every_ticks(&self) -> u32 {
        if self.debug {
            1
        } else {
            10
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pomodoro")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_env() {
        let config = config_from(&[]);
        assert!(!config.debug);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.minutes_per_step, 5.0);
        assert_eq!(config.heartbeat_every_ticks(), 10);
        assert!(config.data_dir.ends_with("pomodoro"));
    }

    #[test]
    fn env_overrides_are_read() {
        let config = config_from(&[
            ("POMODORO_DATA_DIR", "/tmp/pomo"),
            ("POMODORO_DEBUG", "TRUE"),
            ("POMODORO_TICK_MS", "250"),
            ("POMODORO_MINUTES_PER_STEP", "2.5"),
        ]);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pomo"));
        assert!(config.debug);
        assert_eq!(config.heartbeat_every_ticks(), 1);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.minutes_per_step, 2.5);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/pomo/pomodoro.sqlite3"));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("POMODORO_TICK_MS", "0"),
            ("POMODORO_MINUTES_PER_STEP", "-1"),
        ]);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.minutes_per_step, 5.0);
    }
}
