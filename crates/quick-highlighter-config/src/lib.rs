use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides the default config location when set.
pub const CONFIG_PATH_ENV: &str = "QUICK_HIGHLIGHTER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing required setting `{0}`")]
    MissingField(&'static str),
}

/// Credentials for exporting highlights to a notes database.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportCredentials {
    pub token: String,
    pub database_id: String,
}

impl ExportCredentials {
    /// Both values are trimmed; blank ones are rejected.
    pub fn new(token: &str, database_id: &str) -> Result<Self, ConfigError> {
        let token = token.trim();
        let database_id = database_id.trim();
        if token.is_empty() {
            return Err(ConfigError::MissingField("token"));
        }
        if database_id.is_empty() {
            return Err(ConfigError::MissingField("database_id"));
        }
        Ok(Self {
            token: token.to_string(),
            database_id: database_id.to_string(),
        })
    }
}

impl std::fmt::Debug for ExportCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCredentials")
            .field("token", &"<redacted>")
            .field("database_id", &self.database_id)
            .finish()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportCredentials>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Hand-edited files get the same checks as values entered through `new`
        if let Some(export) = config.export.take() {
            config.export = Some(ExportCredentials::new(&export.token, &export.database_id)?);
        }

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    /// `$QUICK_HIGHLIGHTER_CONFIG` if set, else `~/.config/quick-highlighter/config.toml`.
    pub fn config_path() -> PathBuf {
        if let Ok(custom) = std::env::var(CONFIG_PATH_ENV)
            && !custom.trim().is_empty()
        {
            let custom = PathBuf::from(custom);
            return Self::expand_path(&custom).unwrap_or(custom);
        }
        let config_dir = shellexpand::tilde("~/.config/quick-highlighter");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Tilde and environment variable expansion, as a shell would.
    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
