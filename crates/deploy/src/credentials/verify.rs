//! Verification of credentials against each provider's identity endpoint.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::Credential;
use crate::{DeployError, Provider, http};

/// Default GitHub REST API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Default Vercel REST API base URL.
pub const VERCEL_API_URL: &str = "https://api.vercel.com";

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationResult {
    /// Whether the credential can be trusted.
    pub ok: bool,
    /// The identity reported by the provider, when its response was readable.
    pub remote_identity: Option<String>,
}

impl VerificationResult {
    fn rejected(remote_identity: Option<String>) -> Self {
        Self {
            ok: false,
            remote_identity,
        }
    }
}

/// API base URLs the verifier talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierEndpoints {
    pub source_control_api: String,
    pub hosting_api: String,
}

impl Default for VerifierEndpoints {
    fn default() -> Self {
        Self {
            source_control_api: GITHUB_API_URL.to_string(),
            hosting_api: VERCEL_API_URL.to_string(),
        }
    }
}

/// `GET /user` on GitHub.
#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

/// `GET /v2/user` on Vercel.
#[derive(Debug, Deserialize)]
struct VercelUserResponse {
    user: VercelUser,
}

#[derive(Debug, Deserialize)]
struct VercelUser {
    #[serde(default)]
    username: Option<String>,
}

/// Confirms that a credential is accepted by its provider.
///
/// Verification never fails: transport errors, non-200 statuses, unreadable
/// bodies and identity mismatches all resolve to `ok == false`. The cause
/// only shows up in the logs.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    client: reqwest::Client,
    endpoints: VerifierEndpoints,
}

impl CredentialVerifier {
    pub fn new(client: reqwest::Client, endpoints: VerifierEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &VerifierEndpoints {
        &self.endpoints
    }

    /// Verify a credential against the provider it belongs to.
    pub async fn verify(&self, credential: &Credential) -> VerificationResult {
        let provider = credential.provider();

        let outcome = match provider {
            Provider::SourceControl => self.verify_source_control(credential).await,
            Provider::Hosting => self.verify_hosting(credential).await,
        };

        match outcome {
            Ok(result) => {
                if result.ok {
                    tracing::debug!(
                        %provider,
                        remote_identity = ?result.remote_identity,
                        "Credential verified"
                    );
                } else {
                    tracing::warn!(
                        %provider,
                        remote_identity = ?result.remote_identity,
                        "Credential rejected"
                    );
                }
                result
            }
            Err(err) => {
                tracing::warn!(
                    %provider,
                    error = %err,
                    "Error verifying {} credentials",
                    provider.display_name()
                );
                VerificationResult::rejected(None)
            }
        }
    }

    async fn verify_source_control(
        &self,
        credential: &Credential,
    ) -> Result<VerificationResult, DeployError> {
        let url = http::endpoint(&self.endpoints.source_control_api, "user");
        let Some(user) = self.fetch_identity::<GitHubUser>(&url, credential).await? else {
            return Ok(VerificationResult::rejected(None));
        };

        let ok = credential.identity() == Some(user.login.as_str());
        if !ok {
            tracing::debug!(
                expected = credential.identity().unwrap_or_default(),
                actual = %user.login,
                "GitHub token belongs to a different account"
            );
        }
        Ok(VerificationResult {
            ok,
            remote_identity: Some(user.login),
        })
    }

    async fn verify_hosting(
        &self,
        credential: &Credential,
    ) -> Result<VerificationResult, DeployError> {
        let url = http::endpoint(&self.endpoints.hosting_api, "v2/user");
        let Some(response) = self
            .fetch_identity::<VercelUserResponse>(&url, credential)
            .await?
        else {
            return Ok(VerificationResult::rejected(None));
        };

        let username = response.user.username.filter(|name| !name.is_empty());
        Ok(VerificationResult {
            ok: username.is_some(),
            remote_identity: username,
        })
    }

    /// Authenticated identity lookup. `None` when the provider answered with anything but 200.
    async fn fetch_identity<T: DeserializeOwned>(
        &self,
        url: &str,
        credential: &Credential,
    ) -> Result<Option<T>, DeployError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(credential.secret())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            tracing::debug!(status = %response.status(), url, "Identity lookup was not successful");
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }
}
