//! Settings loading.
//!
//! Settings live in the platform-specific configuration folder:
//! - macOS: ~/Library/Application Support/org.daedalus.DAEDALUS Shell/
//! - Windows: %APPDATA%/daedalus/DAEDALUS Shell/config/
//! - Linux: ~/.config/daedalusshell/
//!
//! Every key is optional; a missing file means defaults.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    session::{DEFAULT_GEOMETRY_PATH, DEFAULT_SEQUENCE_PATH, Session},
};

const APP_QUALIFIER: &str = "org";
const APP_ORG: &str = "daedalus";
const APP_NAME: &str = "DAEDALUS Shell";
const CONFIG_FILENAME: &str = "settings.toml";

/// Where the engine listens unless told otherwise.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4242/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// XML-RPC endpoint of the engine.
    pub endpoint: String,
    /// Whole-request timeout. Routing large meshes takes minutes.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub default_geometry_path: String,
    pub default_sequence_path: String,
    /// Folder holding the four helical-form illustrations.
    pub images_dir: PathBuf,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 300,
            connect_timeout_secs: 5,
            default_geometry_path: DEFAULT_GEOMETRY_PATH.to_string(),
            default_sequence_path: DEFAULT_SEQUENCE_PATH.to_string(),
            images_dir: PathBuf::from("./images"),
            window_width: 500.0,
            window_height: 440.0,
        }
    }
}

impl Config {
    /// Default location of the settings file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Reads and parses a settings file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads settings, falling back to defaults.
    ///
    /// An explicit `path` that cannot be read or parsed is an error. For the default
    /// location, a missing file is normal and a broken one is logged and ignored.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            let config = Self::from_file(path)?;
            tracing::info!("Loaded settings from {:?}", path);
            return Ok(config);
        }

        let Some(path) = Self::default_path() else {
            tracing::warn!("Could not determine settings path, using defaults");
            return Ok(Self::default());
        };

        match Self::from_file(&path) {
            Ok(config) => {
                tracing::info!("Loaded settings from {:?}", path);
                Ok(config)
            }
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings file found at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Ok(Self::default())
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Fresh session seeded with the configured sample files.
    pub fn initial_session(&self) -> Session {
        Session::new(&self.default_geometry_path, &self.default_sequence_path)
    }
}
