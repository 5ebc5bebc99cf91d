use super::models::AppConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    let tables: ConfigTables = toml::from_str(contents)?;
    let mut config = AppConfig::from(tables);
    config.tick_interval_ms = config.tick_interval_ms.clamp(20, 5_000);
    config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
    Ok(config)
}

pub fn serialize_config(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&ConfigTables::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn missing_tables_fall_back_to_defaults() {
        let config = parse_config("").expect("empty config parses");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn parses_grouped_tables() {
        let config = parse_config(
            r#"
            [api]
            base_url = "http://reader.local:8080/"

            [playback]
            continuous = false
            tick_interval_ms = 5

            [logging]
            log_level = "warn"
            "#,
        )
        .expect("config parses");

        assert_eq!(config.api_base_url, "http://reader.local:8080");
        assert!(!config.continuous_playback);
        assert_eq!(config.tick_interval_ms, 20);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(config.audio_cache);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut config = AppConfig::default();
        config.speak_answers = false;
        config.cache_dir = "/tmp/readit-cache".into();
        let text = serialize_config(&config).expect("serializes");
        assert_eq!(parse_config(&text).expect("parses"), config);
    }

    #[test]
    fn unreadable_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config(&dir.path().join("missing.toml"));
        assert_eq!(config, AppConfig::default());
    }
}
