pub(crate) fn default_api_base_url() -> String {
    "http://localhost:5000".to_string()
}

pub(crate) fn default_settings_path() -> String {
    "conf/settings.toml".to_string()
}

pub(crate) fn default_cache_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_audio_cache() -> bool {
    true
}

pub(crate) fn default_continuous_playback() -> bool {
    true
}

pub(crate) fn default_tick_interval_ms() -> u64 {
    250
}

pub(crate) fn default_speak_answers() -> bool {
    true
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
