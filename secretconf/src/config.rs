//! Front-end configuration: where the store lives and which private-key file
//! the store key is derived from. Defaults exist only here; the store itself
//! always receives an explicit path.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::crypto::envelope::SecretKey;
use crate::crypto::integrity::derive_key;

pub const DEFAULT_STORE_PATH: &str = "/tmp/secrets.conf";
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "~/.ssh/id_rsa";

pub const STORE_PATH_ENV: &str = "SECRETCONF_PATH";
pub const PRIVATE_KEY_ENV: &str = "SECRETCONF_PRIVATE_KEY";
pub const CONFIG_FILE_ENV: &str = "SECRETCONF_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse failed for {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("private key file not found at {}", .0.display())]
    MissingPrivateKey(PathBuf),
    #[error("cannot expand `~`: no home directory for the current user")]
    NoHomeDir,
}

/// Optional JSON config file. Every field may be omitted.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub store_path: Option<String>,
    pub private_key_path: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: format!("{e}"),
        })
    }
}

/// Values given explicitly on the command line or read from the environment.
/// `None` means "fall through to the next source".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub store_path: Option<String>,
    pub private_key_path: Option<String>,
    pub config_file: Option<String>,
}

impl Overrides {
    /// Fills unset fields from `SECRETCONF_*` environment variables.
    pub fn with_env(mut self) -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }
        self.store_path = self.store_path.or_else(|| var(STORE_PATH_ENV));
        self.private_key_path = self.private_key_path.or_else(|| var(PRIVATE_KEY_ENV));
        self.config_file = self.config_file.or_else(|| var(CONFIG_FILE_ENV));
        self
    }
}

/// Resolved, `~`-expanded paths for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HushConfig {
    pub store_path: PathBuf,
    pub private_key_path: PathBuf,
}

impl HushConfig {
    /// Precedence: overrides (flags, then environment), config file, defaults.
    pub fn resolve(overrides: Overrides) -> Result<Self, ConfigError> {
        let file = match &overrides.config_file {
            Some(path) => FileConfig::load(&expand_user(path)?)?,
            None => FileConfig::default(),
        };

        let store_path = overrides
            .store_path
            .or(file.store_path)
            .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string());
        let private_key_path = overrides
            .private_key_path
            .or(file.private_key_path)
            .unwrap_or_else(|| DEFAULT_PRIVATE_KEY_PATH.to_string());

        let config = Self {
            store_path: expand_user(&store_path)?,
            private_key_path: expand_user(&private_key_path)?,
        };
        debug!(
            store = %config.store_path.display(),
            private_key = %config.private_key_path.display(),
            "resolved configuration"
        );
        Ok(config)
    }

    /// Reads the private-key file's raw bytes and hashes them into the store key.
    pub fn load_key(&self) -> Result<SecretKey, ConfigError> {
        if !self.private_key_path.exists() {
            return Err(ConfigError::MissingPrivateKey(self.private_key_path.clone()));
        }
        let raw = fs::read(&self.private_key_path).map_err(|source| ConfigError::Io {
            path: self.private_key_path.clone(),
            source,
        })?;
        Ok(derive_key(&raw))
    }
}

/// Expands a leading `~` or `~/` to the current user's home directory.
pub fn expand_user(path: &str) -> Result<PathBuf, ConfigError> {
    if path == "~" {
        return dirs::home_dir().ok_or(ConfigError::NoHomeDir);
    }
    match path.strip_prefix("~/") {
        Some(rest) => Ok(dirs::home_dir().ok_or(ConfigError::NoHomeDir)?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}
