use crate::error::{Error, Result};
use crate::models::{CycleDuration, NoiseVariant, RestDuration};
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// User preferences, loaded once at startup and saved after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub active_variant: Option<NoiseVariant>,
    pub volume: f64,
    pub launch_at_login: bool,
    pub focus_duration: CycleDuration,
    pub rest_duration: RestDuration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            active_variant: None,
            volume: 0.7,
            launch_at_login: false,
            focus_duration: CycleDuration::Infinite,
            rest_duration: RestDuration::None,
        }
    }
}

/// On-disk key/value form. Every key is optional so one bad or missing value
/// only resets that key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_variant"
    )]
    active_noise: Option<NoiseVariant>,
    volume: Option<f64>,
    launch_at_login: Option<bool>,
    cycle_duration: Option<u32>,
    rest_duration: Option<u32>,
}

impl From<&Settings> for StoredSettings {
    fn from(s: &Settings) -> Self {
        Self {
            active_noise: s.active_variant,
            volume: Some(s.volume),
            launch_at_login: Some(s.launch_at_login),
            cycle_duration: Some(s.focus_duration.minutes()),
            rest_duration: Some(s.rest_duration.minutes()),
        }
    }
}

impl StoredSettings {
    fn into_settings(self) -> Settings {
        let defaults = Settings::default();
        Settings {
            active_variant: self.active_noise,
            volume: self
                .volume
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(defaults.volume),
            launch_at_login: self.launch_at_login.unwrap_or(defaults.launch_at_login),
            focus_duration: self
                .cycle_duration
                .and_then(CycleDuration::from_minutes)
                .unwrap_or(defaults.focus_duration),
            rest_duration: self
                .rest_duration
                .and_then(RestDuration::from_minutes)
                .unwrap_or(defaults.rest_duration),
        }
    }
}

/// An unknown or mistyped saved noise resets to none instead of failing the
/// whole file.
fn lenient_variant<'de, D>(deserializer: D) -> std::result::Result<Option<NoiseVariant>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<toml::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value.try_into::<NoiseVariant>() {
        Ok(variant) => Some(variant),
        Err(e) => {
            log::warn!("Ignoring saved noise: {e}");
            None
        }
    }))
}

/// Where settings live between runs.
pub trait SettingsStore {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings kept in a TOML file.
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `settings.toml` in the platform config directory.
    pub fn default_location() -> Result<Self> {
        let dirs = ProjectDirs::from("org", "focus-noise", "focus_noise").ok_or(Error::NoSettingsDir)?;
        Ok(Self::new(dirs.config_dir().join("settings.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> Result<Settings> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(e.into()),
        };
        match toml::from_str::<StoredSettings>(&text) {
            Ok(stored) => Ok(stored.into_settings()),
            Err(e) => {
                log::warn!(
                    "Settings file {} is unreadable, using defaults: {e}",
                    self.path.display()
                );
                Ok(Settings::default())
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string(&StoredSettings::from(settings))?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

/// Store that keeps settings in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<Settings>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn with_settings(settings: Settings) -> Self {
        let store = Self::default();
        *store.slot.lock() = Some(settings);
        store
    }

    pub fn saved(&self) -> Option<Settings> {
        self.slot.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings> {
        Ok(self.slot.lock().clone().unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.slot.lock() = Some(settings.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}
