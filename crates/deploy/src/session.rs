//! Session-lifetime connection state for both providers.
//!
//! A [`Session`] is built at startup with [`Session::restore`], which loads
//! every persisted credential and re-verifies it. Verification state is only
//! ever updated in [`Session::refresh`] and [`Session::connect`]; nothing else
//! flips the `verified` flag. Dropping the session discards the state, the
//! persisted credentials stay in the store.

use anyhow::{Context, Result};
use strum::IntoEnumIterator;

use crate::credentials::{Credential, CredentialStore, CredentialVerifier, VerificationResult};
use crate::{DeployError, Provider};

/// Connection state of one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// The credential known for the provider, verified or not.
    pub credential: Option<Credential>,
    /// Whether the last verification of `credential` succeeded.
    pub verified: bool,
    /// Whether a verification is currently running.
    pub verifying: bool,
}

impl ConnectionState {
    /// A credential is present and its last verification succeeded.
    pub fn is_connected(&self) -> bool {
        self.verified && self.credential.is_some()
    }
}

/// Owner of the per-provider [`ConnectionState`] for the lifetime of a process.
pub struct Session<S> {
    store: S,
    verifier: CredentialVerifier,
    source_control: ConnectionState,
    hosting: ConnectionState,
}

impl<S: CredentialStore> Session<S> {
    /// Create a session with no known credentials. Nothing is loaded from the store.
    pub fn new(store: S, verifier: CredentialVerifier) -> Self {
        Self {
            store,
            verifier,
            source_control: ConnectionState::default(),
            hosting: ConnectionState::default(),
        }
    }

    /// Create a session from the persisted credentials, re-verifying each of them.
    pub async fn restore(store: S, verifier: CredentialVerifier) -> Result<Self> {
        let mut session = Self::new(store, verifier);

        for provider in Provider::iter() {
            let credential = session
                .store
                .load(provider)
                .with_context(|| format!("Failed to load {provider} credential"))?;

            if credential.is_none() {
                tracing::debug!(%provider, "No stored credential");
                continue;
            }

            session.state_mut(provider).credential = credential;
            session.refresh(provider).await;
        }

        Ok(session)
    }

    /// Connection state of a provider.
    pub fn state(&self, provider: Provider) -> &ConnectionState {
        match provider {
            Provider::SourceControl => &self.source_control,
            Provider::Hosting => &self.hosting,
        }
    }

    fn state_mut(&mut self, provider: Provider) -> &mut ConnectionState {
        match provider {
            Provider::SourceControl => &mut self.source_control,
            Provider::Hosting => &mut self.hosting,
        }
    }

    /// The credential of a provider, only if it is currently verified.
    pub fn verified_credential(&self, provider: Provider) -> Option<&Credential> {
        let state = self.state(provider);
        if state.verified {
            state.credential.as_ref()
        } else {
            None
        }
    }

    /// The underlying credential store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Re-verify the known credential of a provider and record the result.
    pub async fn refresh(&mut self, provider: Provider) -> VerificationResult {
        let Some(credential) = self.state(provider).credential.clone() else {
            self.state_mut(provider).verified = false;
            return VerificationResult::default();
        };

        self.state_mut(provider).verifying = true;
        let result = self.verifier.verify(&credential).await;

        let state = self.state_mut(provider);
        state.verifying = false;
        state.verified = result.ok;

        tracing::info!(
            %provider,
            connected = result.ok,
            "{} connection checked",
            provider.display_name()
        );
        result
    }

    /// Verify a new credential and, if it is accepted, save it and mark the provider connected.
    ///
    /// A rejected credential is not saved and leaves the provider's current
    /// state untouched; the error is a [`DeployError`] of kind
    /// `VerificationFailed`.
    pub async fn connect(&mut self, credential: Credential) -> Result<VerificationResult> {
        credential.validate()?;
        let provider = credential.provider();

        self.state_mut(provider).verifying = true;
        let result = self.verifier.verify(&credential).await;
        self.state_mut(provider).verifying = false;

        if !result.ok {
            let message = match provider {
                Provider::SourceControl => {
                    "Invalid GitHub credentials. Please check your username and token."
                }
                Provider::Hosting => "Invalid Vercel token. Please check your token.",
            };
            return Err(DeployError::verification_failed(message).into());
        }

        self.store
            .save(&credential)
            .with_context(|| format!("Failed to save {provider} credential"))?;

        let state = self.state_mut(provider);
        state.credential = Some(credential);
        state.verified = true;

        Ok(result)
    }

    /// Remove the credential of a provider from the store and from the session.
    pub fn disconnect(&mut self, provider: Provider) -> Result<()> {
        self.store
            .remove(provider)
            .with_context(|| format!("Failed to remove {provider} credential"))?;
        *self.state_mut(provider) = ConnectionState::default();
        Ok(())
    }
}
