//! Configuration file discovery.
//!
//! Never fails: unreadable or malformed files are logged and the defaults
//! are used instead.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{Config, PartialConfig};
use crate::error::ConfigError;

/// Files searched in the repository root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".commitcraftrc",
    ".commitcraftrc.json",
    "commitcraft.config.json",
];

/// Key holding configuration inside `package.json`.
const PACKAGE_JSON_KEY: &str = "commitcraft";

/// Environment variable overriding `ai.apiKey`.
pub const API_KEY_ENV_VAR: &str = "COMMITCRAFT_API_KEY";

/// Resolve configuration for a repository.
///
/// `explicit` takes precedence over discovery. Any error yields defaults.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Config {
    let partial = match find_partial(root, explicit) {
        Ok(Some((path, partial))) => {
            debug!("Loaded config from {}", path.display());
            partial
        }
        Ok(None) => PartialConfig::default(),
        Err(e) => {
            warn!("{}; using default configuration", e);
            PartialConfig::default()
        }
    };

    let mut config = Config::merge(Config::default(), partial);
    apply_env_overrides(&mut config);
    config
}

fn find_partial(
    root: &Path,
    explicit: Option<&Path>,
) -> Result<Option<(PathBuf, PartialConfig)>, ConfigError> {
    if let Some(path) = explicit {
        return parse_config_file(path).map(|p| Some((path.to_path_buf(), p)));
    }

    for name in CONFIG_FILE_NAMES {
        let path = root.join(name);
        if path.is_file() {
            return parse_config_file(&path).map(|p| Some((path, p)));
        }
    }

    let package_json = root.join("package.json");
    if package_json.is_file() {
        return from_package_json(&package_json).map(|p| p.map(|p| (package_json, p)));
    }

    Ok(None)
}

/// Parse a JSON configuration file.
pub fn parse_config_file(path: &Path) -> Result<PartialConfig, ConfigError> {
    let content = read(path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::ParseFailed {
        path: path.display().to_string(),
        source,
    })
}

fn from_package_json(path: &Path) -> Result<Option<PartialConfig>, ConfigError> {
    let content = read(path)?;
    let parse_err = |source| ConfigError::ParseFailed {
        path: path.display().to_string(),
        source,
    };

    let manifest: serde_json::Value = serde_json::from_str(&content).map_err(parse_err)?;
    match manifest.get(PACKAGE_JSON_KEY) {
        Some(section) => serde_json::from_value(section.clone())
            .map(Some)
            .map_err(parse_err),
        None => Ok(None),
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.display().to_string(),
        source,
    })
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(key) = env::var(API_KEY_ENV_VAR)
        && !key.trim().is_empty()
    {
        config.ai.api_key = Some(key);
    }
}
