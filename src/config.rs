//! Configuration manager for Persona.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8888";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors raised by an unusable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("nickname bounds are inverted: min {min} > max {max}")]
    NicknameBounds { min: usize, max: usize },
    #[error("password bounds are inverted: min {min} > max {max}")]
    PasswordBounds { min: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Socket address the HTTP server binds to.
    pub address: String,
    #[serde(skip_deserializing)]
    pub version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Backend used to persist users.
    pub storage: Storage,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
    /// Field constraints applied to incoming payloads.
    pub validation: Validation,
    /// Expose Prometheus metrics on `/metrics`.
    pub metrics: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            address: DEFAULT_ADDRESS.to_owned(),
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            storage: Storage::default(),
            postgres: None,
            argon2: None,
            validation: Validation::default(),
            metrics: false,
        }
    }
}

/// Persistence backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    #[default]
    Postgres,
    /// Process-local store, lost on restart.
    Memory,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// `validation` section.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Validation {
    pub user: UserRules,
}

/// `validation.user` section.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRules {
    pub nickname: NicknameRule,
    pub password: PasswordRule,
}

/// `validation.user.nickname` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NicknameRule {
    /// Minimum length, in characters, inclusive.
    pub min: usize,
    /// Maximum length, in characters, inclusive.
    pub max: usize,
    /// Store and compare nicknames in lowercase.
    pub lowercase: bool,
}

impl Default for NicknameRule {
    fn default() -> Self {
        Self {
            min: 3,
            max: 32,
            lowercase: false,
        }
    }
}

/// `validation.user.password` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordRule {
    pub min: usize,
    pub max: usize,
}

impl Default for PasswordRule {
    fn default() -> Self {
        Self { min: 8, max: 255 }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, ConfigError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let config = match File::open(file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file) {
                Ok(mut config) => {
                    config.version = VERSION.to_owned();
                    config
                },
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        config.validate()?;
        Ok(Arc::new(config))
    }

    /// Reject bounds no payload could ever satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let NicknameRule { min, max, .. } = self.validation.user.nickname;
        if min > max {
            return Err(ConfigError::NicknameBounds { min, max });
        }

        let PasswordRule { min, max } = self.validation.user.password;
        if min > max {
            return Err(ConfigError::PasswordBounds { min, max });
        }

        Ok(())
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or unreadable");
        Self::default()
    }
}
