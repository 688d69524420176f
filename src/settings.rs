use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackSettings {
    pub image_duration_ms: u64,
    /// Used when the player cannot report a usable video duration.
    pub video_fallback_duration_ms: u64,
    pub tick_interval_ms: u64,
    pub reply_max_chars: usize,
    pub prefetch_enabled: bool,
    pub heartbeat_every_ticks: u32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            image_duration_ms: 6_000,
            video_fallback_duration_ms: 10_000,
            tick_interval_ms: 50,
            reply_max_chars: 200,
            prefetch_enabled: true,
            heartbeat_every_ticks: 10,
        }
    }
}

impl PlaybackSettings {
    /// Applies `STORYVIEW_DEBUG`: progress on every tick.
    pub fn with_env_overrides(mut self) -> Self {
        let debug_mode = std::env::var("STORYVIEW_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.heartbeat_every_ticks = 1;
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    playback: PlaybackSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn playback(&self) -> PlaybackSettings {
        match self.data.read() {
            Ok(guard) => guard.playback.clone(),
            Err(poisoned) => poisoned.into_inner().playback.clone(),
        }
    }

    pub fn update_playback(&self, settings: PlaybackSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.playback = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
