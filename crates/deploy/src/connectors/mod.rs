//! Thin wrappers over the provider APIs the orchestrator drives.
//!
//! The orchestrator only sees the [`SourceControl`] and [`Hosting`] traits;
//! [`GitHubConnector`] and [`VercelConnector`] are the production
//! implementations.

mod git;
mod github;
mod vercel;

use std::future::Future;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempdir::TempDir;

pub use github::{GitHubConnector, GitHubSettings};
pub use vercel::{VercelConnector, VercelSettings};

use crate::{DeployError, Snapshot};

/// A repository on the source-control host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse a repository URL such as `https://github.com/owner/repo.git`.
    ///
    /// Any host is accepted; the first two path segments name the owner and
    /// the repository.
    pub fn parse(reference: &str) -> Result<Self, DeployError> {
        let invalid = || {
            DeployError::invalid_input(format!(
                "Not a repository URL: {reference}. Expected https://host/owner/repo"
            ))
        };

        let url = url::Url::parse(reference.trim()).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "https" | "http") || url.host_str().is_none() {
            return Err(invalid());
        }

        let mut segments = url
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty());
        let owner = segments.next().ok_or_else(invalid)?;
        let name = segments.next().ok_or_else(invalid)?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(owner, name))
    }

    /// `owner/name`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A local checkout produced by cloning. The directory is removed on drop.
#[derive(Debug)]
pub struct LocalRepo {
    dir: TempDir,
}

impl LocalRepo {
    pub fn new(dir: TempDir) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// A deployment accepted by the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Deployment {
    /// Public URL of the deployment. Empty when the provider did not report one.
    pub url: String,
    /// Provider-side deployment id, when reported.
    #[serde(default)]
    pub id: Option<String>,
}

impl Deployment {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id: None,
        }
    }
}

/// Options for deploying from a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitDeployOptions {
    /// Branch, tag or commit to deploy.
    pub git_ref: String,
}

impl Default for GitDeployOptions {
    fn default() -> Self {
        Self {
            git_ref: "main".to_string(),
        }
    }
}

/// Repository operations on the source-control host.
///
/// Every operation needs a verified source-control credential and fails with
/// `Unauthenticated` without one.
pub trait SourceControl: Send + Sync {
    /// Whether cloning is currently possible.
    fn clone_ready(&self) -> bool;

    /// Create a new, empty repository owned by the authenticated user.
    fn create_repo(&self, name: &str) -> impl Future<Output = Result<RepoRef, DeployError>> + Send;

    /// Push the snapshot as the initial commit of `target`.
    fn push(
        &self,
        snapshot: &Snapshot,
        target: &RepoRef,
    ) -> impl Future<Output = Result<(), DeployError>> + Send;

    /// Clone the repository at `reference` into a local directory.
    fn clone_repo(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<LocalRepo, DeployError>> + Send;
}

/// Deployment triggers on the hosting provider.
///
/// Every operation needs a verified hosting credential and fails with
/// `Unauthenticated` without one.
pub trait Hosting: Send + Sync {
    /// Deploy the snapshot's files directly.
    fn deploy_files(
        &self,
        snapshot: &Snapshot,
        name: &str,
    ) -> impl Future<Output = Result<Deployment, DeployError>> + Send;

    /// Deploy from a repository on the source-control host.
    fn deploy_from_source_control(
        &self,
        name: &str,
        repo: &RepoRef,
        options: &GitDeployOptions,
    ) -> impl Future<Output = Result<Deployment, DeployError>> + Send;
}

/// Reduce a free-form project name to `[A-Za-z0-9._-]`.
///
/// Other characters become `-`, runs of `-` collapse and leading or
/// trailing `-` are dropped. Returns `None` if nothing is left.
pub fn sanitize_name(name: &str) -> Option<String> {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.trim().chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };
        if c == '-' && sanitized.ends_with('-') {
            continue;
        }
        sanitized.push(c);
    }

    let sanitized = sanitized.trim_matches('-');
    (!sanitized.is_empty()).then(|| sanitized.to_string())
}
