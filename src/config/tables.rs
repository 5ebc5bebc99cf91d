use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

/// On-disk layout of `config.toml`, grouped into tables.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    api: ApiConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    assistant: AssistantConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            api_base_url: tables.api.base_url,
            settings_path: tables.storage.settings_path,
            cache_dir: tables.storage.cache_dir,
            audio_cache: tables.storage.audio_cache,
            continuous_playback: tables.playback.continuous,
            tick_interval_ms: tables.playback.tick_interval_ms,
            speak_answers: tables.assistant.speak_answers,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            api: ApiConfig {
                base_url: config.api_base_url.clone(),
            },
            storage: StorageConfig {
                settings_path: config.settings_path.clone(),
                cache_dir: config.cache_dir.clone(),
                audio_cache: config.audio_cache,
            },
            playback: PlaybackConfig {
                continuous: config.continuous_playback,
                tick_interval_ms: config.tick_interval_ms,
            },
            assistant: AssistantConfig {
                speak_answers: config.speak_answers,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ApiConfig {
    #[serde(default = "defaults::default_api_base_url")]
    base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::default_api_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_settings_path")]
    settings_path: String,
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
    #[serde(default = "defaults::default_audio_cache")]
    audio_cache: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_path: defaults::default_settings_path(),
            cache_dir: defaults::default_cache_dir(),
            audio_cache: defaults::default_audio_cache(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_continuous_playback")]
    continuous: bool,
    #[serde(default = "defaults::default_tick_interval_ms")]
    tick_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            continuous: defaults::default_continuous_playback(),
            tick_interval_ms: defaults::default_tick_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct AssistantConfig {
    #[serde(default = "defaults::default_speak_answers")]
    speak_answers: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            speak_answers: defaults::default_speak_answers(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default)]
    log_level: LogLevel,
}
