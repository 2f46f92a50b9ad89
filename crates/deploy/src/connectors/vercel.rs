//! Vercel implementation of [`Hosting`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::{Deployment, GitDeployOptions, Hosting, RepoRef, sanitize_name};
use crate::credentials::{Credential, VERCEL_API_URL};
use crate::{DeployError, Provider, Snapshot, http};

/// Settings of the Vercel connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VercelSettings {
    /// REST API base URL.
    pub api_url: String,
    /// Team to deploy under. Personal account when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Deployment target, e.g. `production`. Preview deployment when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Default for VercelSettings {
    fn default() -> Self {
        Self {
            api_url: VERCEL_API_URL.to_string(),
            team_id: None,
            target: Some("production".to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDeployment<'a> {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<InlineFile<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    git_source: Option<GitSource<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct InlineFile<'a> {
    file: &'a str,
    data: String,
    encoding: &'static str,
}

#[derive(Debug, Serialize)]
struct GitSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    org: &'a str,
    repo: &'a str,
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedDeployment {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Hosting connector for Vercel.
#[derive(Debug, Clone)]
pub struct VercelConnector {
    client: reqwest::Client,
    settings: VercelSettings,
    credential: Option<Credential>,
}

impl VercelConnector {
    pub fn new(client: reqwest::Client, settings: VercelSettings) -> Self {
        Self {
            client,
            settings,
            credential: None,
        }
    }

    /// Use a verified Vercel credential.
    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential.filter(|c| c.provider() == Provider::Hosting);
        self
    }

    pub fn settings(&self) -> &VercelSettings {
        &self.settings
    }

    fn credential(&self) -> Result<&Credential, DeployError> {
        self.credential.as_ref().ok_or_else(|| {
            DeployError::unauthenticated("Connect your Vercel account in Settings first")
        })
    }

    async fn create_deployment(
        &self,
        body: &CreateDeployment<'_>,
    ) -> Result<Deployment, DeployError> {
        let credential = self.credential()?;

        let mut request = self
            .client
            .post(http::endpoint(&self.settings.api_url, "v13/deployments"))
            .bearer_auth(credential.secret())
            .query(&[("skipAutoDetectionConfirmation", "1")]);
        if let Some(team_id) = &self.settings.team_id {
            request = request.query(&[("teamId", team_id)]);
        }

        let response = request.json(body).send().await?;
        let created: CreatedDeployment =
            http::parse_response(response, "create a deployment", "Vercel").await?;

        let deployment = Deployment {
            url: normalize_url(created.url.as_deref().unwrap_or_default()),
            id: created.id,
        };
        tracing::info!(
            name = %body.name,
            id = ?deployment.id,
            url = %deployment.url,
            "Vercel deployment created"
        );
        Ok(deployment)
    }
}

/// Vercel project names are lowercase `[a-z0-9._-]`.
fn project_name(name: &str) -> Result<String, DeployError> {
    sanitize_name(name)
        .map(|name| name.to_lowercase())
        .ok_or_else(|| DeployError::invalid_input(format!("Invalid project name: {name}")))
}

/// Vercel reports bare host names; prefix them with `https://`. Empty stays empty.
fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || url.starts_with("https://") || url.starts_with("http://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

impl Hosting for VercelConnector {
    async fn deploy_files(
        &self,
        snapshot: &Snapshot,
        name: &str,
    ) -> Result<Deployment, DeployError> {
        self.credential()?;

        let files = snapshot
            .iter()
            .map(|(file, content)| InlineFile {
                file,
                data: BASE64.encode(content),
                encoding: "base64",
            })
            .collect();

        tracing::info!(name, files = snapshot.len(), "Deploying files to Vercel");
        self.create_deployment(&CreateDeployment {
            name: project_name(name)?,
            files: Some(files),
            git_source: None,
            target: self.settings.target.as_deref(),
        })
        .await
    }

    async fn deploy_from_source_control(
        &self,
        name: &str,
        repo: &RepoRef,
        options: &GitDeployOptions,
    ) -> Result<Deployment, DeployError> {
        self.credential()?;

        tracing::info!(
            name,
            repo = %repo.full_name(),
            git_ref = %options.git_ref,
            "Deploying repository to Vercel"
        );
        self.create_deployment(&CreateDeployment {
            name: project_name(name)?,
            files: None,
            git_source: Some(GitSource {
                kind: "github",
                org: &repo.owner,
                repo: &repo.name,
                git_ref: &options.git_ref,
            }),
            target: self.settings.target.as_deref(),
        })
        .await
    }
}
