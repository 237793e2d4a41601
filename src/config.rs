//! Settings layered from built-in defaults, an optional
//! `config.toml` in the user's config directory, and `STAZHOVE__*`
//! environment variables (e.g. `STAZHOVE__DEFAULT_SORT=salary`).

use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::query::SortKey;
use crate::session::ViewMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// JSON catalog to load instead of the bundled fixtures.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub default_sort: SortKey,

    #[serde(default)]
    pub view_mode: ViewMode,

    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_path: None,
            default_sort: SortKey::default(),
            view_mode: ViewMode::default(),
            log_level: default_log_level(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "stazhove")
}

/// Default location of `config.toml`.
pub fn config_file() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// Where the interactive browser writes its log.
pub fn log_file() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().join("stazhove.log"),
        None => PathBuf::from("stazhove.log"),
    }
}

impl Settings {
    /// Loads from the default config file location (if it exists) and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(config_file())
    }

    pub fn load_from(file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("default_sort", "recent")?
            .set_default("view_mode", "grid")?
            .set_default("log_level", default_log_level())?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder
            .add_source(Environment::with_prefix("STAZHOVE").separator("__"))
            .build()?
            .try_deserialize()
    }
}
