//! Layered configuration: defaults, then an optional TOML file, then `LIFTOFF_*` env vars.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::connectors::{GitDeployOptions, GitHubSettings, VercelSettings};
use crate::credentials::{FileCredentialStore, VerifierEndpoints};

/// The default name of the liftoff configuration file.
pub const CONFIG_FILENAME: &str = "liftoff.toml";

/// Prefix of environment variables that override the configuration.
/// Nested keys use `__`, e.g. `LIFTOFF_HOSTING__TEAM_ID`.
pub const ENV_PREFIX: &str = "LIFTOFF_";

/// Complete liftoff configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub connector settings.
    pub source_control: GitHubSettings,
    /// Vercel connector settings.
    pub hosting: VercelSettings,
    /// Credential file location. Defaults to the per-user config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    /// Timeout applied to every provider request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_control: GitHubSettings::default(),
            hosting: VercelSettings::default(),
            store_path: None,
            request_timeout_secs: crate::http::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// When `path` is `None`, `<config dir>/liftoff/liftoff.toml` is used if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Configuration file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::default_path().filter(|path| path.exists()),
        };

        let config = Self::figment(file.as_deref())
            .extract::<Self>()
            .context("Failed to load configuration")?;

        tracing::debug!(file = ?file, "Configuration loaded");
        Ok(config)
    }

    fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        // LIFTOFF_VERBOSITY and LIFTOFF_CONFIG belong to the CLI
        figment.merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["verbosity", "config"])
                .split("__"),
        )
    }

    /// `<config dir>/liftoff/liftoff.toml`, if a config directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("liftoff").join(CONFIG_FILENAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The credential store this configuration points at.
    pub fn credential_store(&self) -> Result<FileCredentialStore> {
        let path = match &self.store_path {
            Some(path) => path.clone(),
            None => FileCredentialStore::default_path()?,
        };
        Ok(FileCredentialStore::new(path).with_source_control_host(&self.source_control.git_host))
    }

    pub fn verifier_endpoints(&self) -> VerifierEndpoints {
        VerifierEndpoints {
            source_control_api: self.source_control.api_url.clone(),
            hosting_api: self.hosting.api_url.clone(),
        }
    }

    pub fn git_options(&self) -> GitDeployOptions {
        GitDeployOptions {
            git_ref: self.source_control.default_branch.clone(),
        }
    }
}
