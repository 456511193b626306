use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use starter_core::{EnvironmentSnapshot, InvalidDescriptor, Rejected, ResourceSpec};

pub const DEFAULT_CONFIG_PATH: &str = "starter.toml";
const CONFIG_DIR_NAME: &str = "starter";

#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Raw `[[resource]]` tables. See [`parse_resource`].
    #[serde(default, rename = "resource")]
    pub resources: Vec<toml::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(flatten)]
    pub snapshot: EnvironmentSnapshot,
    /// Locators whose load reports an error event.
    #[serde(default)]
    pub unreachable: Vec<String>,
    #[serde(default)]
    pub allow_inline: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read manifest at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse toml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Manifest, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: Manifest = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(manifest)
}

/// Parses one `[[resource]]` table. A table that does not fit the resource
/// shape is rejected on its own and leaves the rest of the manifest usable.
pub fn parse_resource(entry: &toml::Value) -> Result<ResourceSpec, Rejected> {
    entry
        .clone()
        .try_into()
        .map_err(|error: toml::de::Error| Rejected {
            name: entry
                .get("name")
                .and_then(toml::Value::as_str)
                .map(str::to_owned),
            reason: InvalidDescriptor::Malformed(error.message().to_owned()),
        })
}

/// Picks the manifest path: the explicit one, else `starter.toml` in the
/// working directory, else `<config dir>/starter/starter.toml` if present.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }

    let local = PathBuf::from(DEFAULT_CONFIG_PATH);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(DEFAULT_CONFIG_PATH))
        .filter(|path| path.exists())
        .unwrap_or(local)
}
