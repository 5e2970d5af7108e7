//! Layered configuration: TOML file, then environment variables, then CLI
//! flags, each layer overriding the last via [`Config::merge`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LwM2MError, Result};

/// Which `BlobStore` backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Filesystem,
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Memory
    }
}

/// Runtime configuration for the bootstrap/registration client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
}

/// Blob store selection and filesystem backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_filesystem_dir")]
    pub filesystem_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            filesystem_dir: default_filesystem_dir(),
        }
    }
}

fn default_filesystem_dir() -> PathBuf {
    PathBuf::from("store")
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| LwM2MError::ConfigInvalid(format!("failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| LwM2MError::ConfigInvalid(format!("failed to parse config: {e}")))
    }

    /// Overlay values from `M2M_LWM2M_*` environment variables onto `self`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("M2M_LWM2M_STORE_BACKEND") {
            match val.to_lowercase().as_str() {
                "memory" => config.store.backend = StoreBackend::Memory,
                "filesystem" => config.store.backend = StoreBackend::Filesystem,
                _ => {}
            }
        }
        if let Ok(val) = std::env::var("M2M_LWM2M_STORE_DIR") {
            config.store.filesystem_dir = PathBuf::from(val);
        }

        config
    }

    /// Merge with another config; `other`'s values take precedence.
    pub fn merge(self, other: Self) -> Self {
        Self { store: other.store }
    }
}
