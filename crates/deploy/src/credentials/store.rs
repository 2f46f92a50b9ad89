//! Durable, user-scoped credential persistence.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::{BasicAuth, Credential, basic_auth_key};
use crate::Provider;

/// The default name of the credential file inside the liftoff config directory.
pub const CREDENTIALS_FILENAME: &str = "credentials.toml";

/// A credential as held by a store, with the time it was saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub credential: Credential,
    pub saved_at: DateTime<Utc>,
}

/// Per-provider credential persistence.
///
/// Stores hold no logic beyond get/set/remove plus the derived basic-auth
/// record that saving a source-control credential produces. Each provider
/// key is independent and the last writer wins.
pub trait CredentialStore: Send + Sync {
    /// Load the record for a provider, with its save time.
    fn load_record(&self, provider: Provider) -> Result<Option<StoredCredential>>;

    /// Persist a credential, replacing any previous one for the same provider.
    fn save(&self, credential: &Credential) -> Result<()>;

    /// Forget the credential for a provider. Removing an absent credential is not an error.
    fn remove(&self, provider: Provider) -> Result<()>;

    /// Load the basic-auth pair derived for a git host.
    fn load_basic_auth(&self, host: &str) -> Result<Option<BasicAuth>>;

    /// Load the credential for a provider.
    fn load(&self, provider: Provider) -> Result<Option<Credential>> {
        Ok(self.load_record(provider)?.map(|record| record.credential))
    }
}

/// On-disk shape of one credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
    secret: String,
    saved_at: DateTime<Utc>,
}

/// Everything a store holds.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreContents {
    #[serde(default)]
    credentials: BTreeMap<String, CredentialRecord>,
    #[serde(default)]
    basic_auth: BTreeMap<String, BasicAuth>,
}

impl StoreContents {
    fn get(&self, provider: Provider) -> Option<StoredCredential> {
        let record = self.credentials.get(&provider.to_string())?;

        let credential = match provider {
            Provider::SourceControl => Credential::source_control(
                record.identity.clone().unwrap_or_default(),
                record.secret.clone(),
            ),
            Provider::Hosting => Credential::hosting(record.secret.clone()),
        };

        match credential {
            Ok(credential) => Some(StoredCredential {
                credential,
                saved_at: record.saved_at,
            }),
            Err(err) => {
                tracing::warn!(%provider, error = %err, "Ignoring malformed stored credential");
                None
            }
        }
    }

    fn insert(&mut self, credential: &Credential, source_control_host: &str) {
        let provider = credential.provider();
        self.credentials.insert(
            provider.to_string(),
            CredentialRecord {
                identity: credential.identity().map(str::to_string),
                secret: credential.secret().to_string(),
                saved_at: Utc::now(),
            },
        );

        if provider == Provider::SourceControl {
            self.basic_auth.insert(
                basic_auth_key(source_control_host),
                BasicAuth::from_token(credential.secret()),
            );
        }
    }

    fn remove(&mut self, provider: Provider, source_control_host: &str) {
        self.credentials.remove(&provider.to_string());
        if provider == Provider::SourceControl {
            self.basic_auth.remove(&basic_auth_key(source_control_host));
        }
    }
}

fn log_saved(credential: &Credential) {
    tracing::info!(
        provider = %credential.provider(),
        identity = credential.identity().unwrap_or_default(),
        has_token = !credential.secret().is_empty(),
        "{} connection settings updated",
        credential.provider().display_name()
    );
}

fn log_removed(provider: Provider) {
    tracing::info!(%provider, "{} connection removed", provider.display_name());
}

/// Credential store backed by a TOML file in the user's config directory.
///
/// Writes happen under an exclusive lock on a sidecar `.lock` file and go
/// through a temporary file that is renamed into place.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    source_control_host: String,
}

impl FileCredentialStore {
    /// Create a store backed by the file at `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source_control_host: Provider::SourceControl.default_host().to_string(),
        }
    }

    /// Set the git host the derived basic-auth record is keyed under.
    pub fn with_source_control_host(mut self, host: impl Into<String>) -> Self {
        self.source_control_host = host.into();
        self
    }

    /// The per-user default location: `<config dir>/liftoff/credentials.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(config_dir.join("liftoff").join(CREDENTIALS_FILENAME))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create credential directory {}", parent.display())
            })?;
        }

        let lock_path = self.path.with_extension("lock");
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))
    }

    fn read_unlocked(&self) -> Result<StoreContents> {
        if !self.path.exists() {
            return Ok(StoreContents::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials from {}", self.path.display()))?;
        toml::from_str(&content).context("Failed to parse credential file as TOML")
    }

    fn write_unlocked(&self, contents: &StoreContents) -> Result<()> {
        let content =
            toml::to_string_pretty(contents).context("Failed to serialize credentials to TOML")?;

        let tmp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write credentials to {}", tmp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict permissions on credential file")?;
        }

        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to move credentials into {}", self.path.display()))?;
        Ok(())
    }

    fn read(&self) -> Result<StoreContents> {
        let lock = self.lock_file()?;
        FileExt::lock_shared(&lock)
            .context("Failed to acquire shared lock on credential file")?;
        let contents = self.read_unlocked();
        FileExt::unlock(&lock).context("Failed to release credential file lock")?;
        contents
    }

    fn update(&self, apply: impl FnOnce(&mut StoreContents)) -> Result<()> {
        let lock = self.lock_file()?;
        FileExt::lock_exclusive(&lock)
            .context("Failed to acquire exclusive lock on credential file")?;

        let result = self.read_unlocked().and_then(|mut contents| {
            apply(&mut contents);
            self.write_unlocked(&contents)
        });

        FileExt::unlock(&lock).context("Failed to release credential file lock")?;
        result
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_record(&self, provider: Provider) -> Result<Option<StoredCredential>> {
        Ok(self.read()?.get(provider))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        self.update(|contents| contents.insert(credential, &self.source_control_host))?;
        tracing::debug!(path = %self.path.display(), "Credential file written");
        log_saved(credential);
        Ok(())
    }

    fn remove(&self, provider: Provider) -> Result<()> {
        self.update(|contents| contents.remove(provider, &self.source_control_host))?;
        log_removed(provider);
        Ok(())
    }

    fn load_basic_auth(&self, host: &str) -> Result<Option<BasicAuth>> {
        Ok(self.read()?.basic_auth.get(&basic_auth_key(host)).cloned())
    }
}

/// In-process credential store.
#[derive(Debug)]
pub struct MemoryCredentialStore {
    contents: Mutex<StoreContents>,
    source_control_host: String,
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self {
            contents: Mutex::new(StoreContents::default()),
            source_control_host: Provider::SourceControl.default_host().to_string(),
        }
    }
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the git host the derived basic-auth record is keyed under.
    pub fn with_source_control_host(mut self, host: impl Into<String>) -> Self {
        self.source_control_host = host.into();
        self
    }

    fn contents(&self) -> std::sync::MutexGuard<'_, StoreContents> {
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_record(&self, provider: Provider) -> Result<Option<StoredCredential>> {
        Ok(self.contents().get(provider))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        self.contents().insert(credential, &self.source_control_host);
        log_saved(credential);
        Ok(())
    }

    fn remove(&self, provider: Provider) -> Result<()> {
        self.contents().remove(provider, &self.source_control_host);
        log_removed(provider);
        Ok(())
    }

    fn load_basic_auth(&self, host: &str) -> Result<Option<BasicAuth>> {
        Ok(self.contents().basic_auth.get(&basic_auth_key(host)).cloned())
    }
}

impl<T: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<T> {
    fn load_record(&self, provider: Provider) -> Result<Option<StoredCredential>> {
        (**self).load_record(provider)
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        (**self).save(credential)
    }

    fn remove(&self, provider: Provider) -> Result<()> {
        (**self).remove(provider)
    }

    fn load_basic_auth(&self, host: &str) -> Result<Option<BasicAuth>> {
        (**self).load_basic_auth(host)
    }
}
