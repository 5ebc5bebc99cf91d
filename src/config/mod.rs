//! Configuration loading for the reading assistant.
//!
//! Process-level settings (backend address, cache location, playback
//! behaviour, logging) are loaded from `conf/config.toml` if present. Missing
//! or invalid entries fall back to defaults so the reader can still start.
//! User-facing display preferences live in [`crate::settings`] instead.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{AppConfig, LogLevel};
