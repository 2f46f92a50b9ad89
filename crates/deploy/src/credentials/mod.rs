//! Provider credentials: the value types, their durable store and the verifier.

mod store;
mod verify;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoredCredential};
pub use verify::{
    CredentialVerifier, GITHUB_API_URL, VERCEL_API_URL, VerificationResult, VerifierEndpoints,
};

use crate::{DeployError, Provider};

/// Password half of the basic-auth pair derived from a source-control token.
pub const BASIC_AUTH_SENTINEL: &str = "x-oauth-basic";

/// A credential for one provider.
///
/// Always holds a non-empty secret; source-control credentials also hold a
/// non-empty identity (the account login the token must belong to).
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    provider: Provider,
    identity: Option<String>,
    secret: String,
}

impl Credential {
    /// Create a source-control credential from a login and a personal access token.
    pub fn source_control(
        identity: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, DeployError> {
        let identity = identity.into();
        let secret = secret.into();
        if identity.trim().is_empty() || secret.trim().is_empty() {
            return Err(DeployError::invalid_input(
                "Please provide both GitHub username and token",
            ));
        }
        Ok(Self {
            provider: Provider::SourceControl,
            identity: Some(identity),
            secret,
        })
    }

    /// Create a hosting credential from an API token.
    pub fn hosting(secret: impl Into<String>) -> Result<Self, DeployError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(DeployError::invalid_input("Please provide a Vercel token"));
        }
        Ok(Self {
            provider: Provider::Hosting,
            identity: None,
            secret,
        })
    }

    /// Re-check the invariants.
    pub fn validate(&self) -> Result<(), DeployError> {
        match self.provider {
            Provider::SourceControl => {
                Self::source_control(self.identity.clone().unwrap_or_default(), &*self.secret)
                    .map(|_| ())
            }
            Provider::Hosting => Self::hosting(&*self.secret).map(|_| ()),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Basic-auth pair used by git remote operations against a host.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// Derive the pair git uses for a source-control token.
    pub fn from_token(token: &str) -> Self {
        Self {
            username: token.to_string(),
            password: BASIC_AUTH_SENTINEL.to_string(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &"<redacted>")
            .field("password", &self.password)
            .finish()
    }
}

/// Store key of the derived basic-auth record for a host.
pub fn basic_auth_key(host: &str) -> String {
    format!("git:{host}")
}
