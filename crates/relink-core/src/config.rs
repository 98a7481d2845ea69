//! Migration configuration.
//!
//! Configuration can be loaded from:
//! - a TOML file (`--config`, or the path in `RELINK_CONFIG`)
//! - environment variables (`DATABASE_URL`, `RELINK_*`)
//!
//! # Example
//!
//! ```toml
//! [migration]
//! database_url = "${DATABASE_URL}"
//! table_prefix = "craft_"
//! rich_content_plugin = "vizy"
//! resave_fields = false
//!
//! [migration.type_overrides]
//! "presseddigital\\linkit\\models\\Twitter" = "custom"
//! "presseddigital\\linkit\\models\\Instagram" = ""   # skip
//! ```

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::defaults::RICH_CONTENT_PLUGIN;
use crate::migration::type_map::TypeOverride;

/// Environment variable naming a config file.
pub const CONFIG_PATH_VAR: &str = "RELINK_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// PostgreSQL connection string. Not needed in snapshot mode.
    pub database_url: Option<String>,
    /// Prefix of every CMS table name.
    pub table_prefix: String,
    /// Handle of the rich-content plugin whose documents are patched.
    pub rich_content_plugin: String,
    /// Force the re-save step on or off; unset uses the plugin default.
    pub resave_fields: Option<bool>,
    /// Legacy type key → link type. An empty value skips the legacy type.
    pub type_overrides: BTreeMap<String, String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            table_prefix: String::new(),
            rich_content_plugin: RICH_CONTENT_PLUGIN.to_string(),
            resave_fields: None,
            type_overrides: BTreeMap::new(),
        }
    }
}

impl MigrationConfig {
    /// Load from `path`, else from `RELINK_CONFIG`, else from the environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from));

        match path {
            Some(path) => {
                info!(subsystem = "config", path = %path.display(), "Loading migration config");
                Self::from_file(&path)
            }
            None => {
                debug!(subsystem = "config", "No config file, using environment variables");
                Self::from_env()
            }
        }
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        #[derive(Deserialize)]
        struct TomlRoot {
            #[serde(default)]
            migration: MigrationConfig,
        }

        let content = substitute_env_vars(content);
        let root: TomlRoot = toml::from_str(&content)?;

        let mut config = root.migration;
        if config.database_url.as_deref().is_some_and(str::is_empty) {
            config.database_url = None;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from a variable lookup. Unset and empty variables keep defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let mut config = Self::default();

        config.database_url = var("DATABASE_URL");
        if let Some(prefix) = var("RELINK_TABLE_PREFIX") {
            config.table_prefix = prefix;
        }
        if let Some(plugin) = var("RELINK_RICH_CONTENT_PLUGIN") {
            config.rich_content_plugin = plugin;
        }
        if let Some(resave) = var("RELINK_RESAVE_FIELDS") {
            config.resave_fields = Some(parse_bool("RELINK_RESAVE_FIELDS", &resave)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self
            .table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Validation(format!(
                "table_prefix may only contain letters, digits and underscores, got: {}",
                self.table_prefix
            )));
        }

        if self.rich_content_plugin.trim().is_empty() {
            return Err(ConfigError::Validation(
                "rich_content_plugin cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Override callback built from `type_overrides`, if any are configured.
    pub fn type_override(&self) -> Option<TypeOverride> {
        if self.type_overrides.is_empty() {
            return None;
        }

        let overrides = self.type_overrides.clone();
        Some(Box::new(move |old: &str, proposed: Option<&str>| {
            match overrides.get(old) {
                Some(replacement) if replacement.is_empty() => None,
                Some(replacement) => Some(replacement.clone()),
                None => proposed.map(str::to_string),
            }
        }))
    }
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Validation(format!(
            "{} must be a boolean, got: {}",
            key, other
        ))),
    }
}

static ENV_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern compiles"));

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    ENV_PLACEHOLDER.replace_all(content, |caps: &Captures| {
        let var_name = &caps[1];
        env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}
