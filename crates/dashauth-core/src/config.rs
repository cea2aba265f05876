//! Endpoint and OAuth client configuration.
//!
//! Configuration is read from `~/.config/dashauth/config.json` and then
//! overridden field by field from `DASHAUTH_*` environment variables.
//! Values are opaque strings; only presence is checked.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/storage directory paths
const APP_NAME: &str = "dashauth";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Storage scope directory under the local data directory
const STORAGE_DIR: &str = "storage";

#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// OAuth2 token endpoint, used for both password and refresh grants
    #[serde(default)]
    pub token_url: String,
    #[serde(default)]
    pub register_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scope: String,
    /// Overrides the default storage scope location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_url", &self.token_url)
            .field("register_url", &self.register_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("scope", &self.scope)
            .field("storage_dir", &self.storage_dir)
            .finish()
    }
}

impl AuthConfig {
    /// Load from the config file (if any), apply environment overrides, validate.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Read a config file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `DASHAUTH_*` overrides from `lookup`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("DASHAUTH_TOKEN_URL") {
            self.token_url = v;
        }
        if let Some(v) = get("DASHAUTH_REGISTER_URL") {
            self.register_url = v;
        }
        if let Some(v) = get("DASHAUTH_CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = get("DASHAUTH_CLIENT_SECRET") {
            self.client_secret = v;
        }
        if let Some(v) = get("DASHAUTH_SCOPE") {
            self.scope = v;
        }
        if let Some(v) = get("DASHAUTH_STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("token_url", &self.token_url),
            ("register_url", &self.register_url),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("scope", &self.scope),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            bail!("Missing configuration: {}", missing.join(", "));
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory backing the local storage scope.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.storage_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find local data directory"))?;
        Ok(data_dir.join(APP_NAME).join(STORAGE_DIR))
    }
}
