//! Persisted user preferences.
//!
//! A single [`SettingsStore`] is created at startup, handed to the components
//! that need it, and written back to disk after every change. The TOML keys
//! are `darkMode`, `fontSize`, `selectedVoice`, `wordsPerPage` and
//! `playbackSpeed`.

use crate::error::{ReaderError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 24;
pub const MIN_WORDS_PER_PAGE: usize = 50;
pub const MAX_WORDS_PER_PAGE: usize = 500;
pub const MIN_PLAYBACK_SPEED: f32 = 0.5;
pub const MAX_PLAYBACK_SPEED: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_words_per_page")]
    pub words_per_page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_voice: Option<String>,
    #[serde(default = "default_playback_speed")]
    pub playback_speed: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            font_size: default_font_size(),
            words_per_page: default_words_per_page(),
            selected_voice: None,
            playback_speed: default_playback_speed(),
        }
    }
}

impl Settings {
    fn clamped(mut self) -> Self {
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self.words_per_page = self
            .words_per_page
            .clamp(MIN_WORDS_PER_PAGE, MAX_WORDS_PER_PAGE);
        self.selected_voice = self
            .selected_voice
            .map(|voice| voice.trim().to_string())
            .filter(|voice| !voice.is_empty());
        self.playback_speed = clamp_speed(self.playback_speed);
        self
    }
}

fn clamp_speed(speed: f32) -> f32 {
    if speed.is_finite() {
        speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED)
    } else {
        default_playback_speed()
    }
}

fn default_font_size() -> u32 {
    16
}

fn default_words_per_page() -> usize {
    200
}

fn default_playback_speed() -> f32 {
    1.0
}

/// Owns the settings value and the file it is persisted to.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Read settings from `path`, falling back to defaults when the file is
    /// missing or unreadable. Out-of-range values are clamped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(data) => match toml::from_str::<Settings>(&data) {
                Ok(settings) => {
                    info!(path = %path.display(), "Loaded reader settings");
                    settings.clamped()
                }
                Err(err) => {
                    warn!(path = %path.display(), "Invalid settings TOML, using defaults: {err}");
                    Settings::default()
                }
            },
            Err(err) => {
                debug!(path = %path.display(), "No saved settings, using defaults: {err}");
                Settings::default()
            }
        };
        Self { path, settings }
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| ReaderError::Settings(err.to_string()))?;
            }
        }
        let contents = toml::to_string(&self.settings)
            .map_err(|err| ReaderError::Settings(err.to_string()))?;
        fs::write(&self.path, contents).map_err(|err| ReaderError::Settings(err.to_string()))?;
        debug!(path = %self.path.display(), "Persisted reader settings");
        Ok(())
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> Result<()> {
        self.update(|settings| settings.dark_mode = enabled)
    }

    pub fn toggle_dark_mode(&mut self) -> Result<()> {
        self.update(|settings| settings.dark_mode = !settings.dark_mode)
    }

    /// Font size in points, clamped to 12..=24.
    pub fn set_font_size(&mut self, size: u32) -> Result<()> {
        self.update(|settings| settings.font_size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE))
    }

    /// Words per page, clamped to 50..=500.
    pub fn set_words_per_page(&mut self, words: usize) -> Result<()> {
        self.update(|settings| {
            settings.words_per_page = words.clamp(MIN_WORDS_PER_PAGE, MAX_WORDS_PER_PAGE)
        })
    }

    /// Playback rate multiplier, clamped to 0.5..=2.0.
    pub fn set_playback_speed(&mut self, speed: f32) -> Result<()> {
        self.update(|settings| settings.playback_speed = clamp_speed(speed))
    }

    pub fn set_selected_voice(&mut self, voice: Option<String>) -> Result<()> {
        self.update(|settings| {
            settings.selected_voice = voice
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
        })
    }

    fn update(&mut self, apply: impl FnOnce(&mut Settings)) -> Result<()> {
        let before = self.settings.clone();
        apply(&mut self.settings);
        if self.settings == before {
            return Ok(());
        }
        info!(
            dark_mode = self.settings.dark_mode,
            font_size = self.settings.font_size,
            words_per_page = self.settings.words_per_page,
            voice = ?self.settings.selected_voice,
            speed = self.settings.playback_speed,
            "Updated reader settings"
        );
        if let Err(err) = self.save() {
            warn!("Failed to persist settings: {err}");
            return Err(err);
        }
        Ok(())
    }
}
