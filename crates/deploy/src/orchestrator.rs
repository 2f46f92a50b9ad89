//! Deployment orchestration.
//!
//! The orchestrator validates a [`DeploymentRequest`], drives the
//! connectors for the chosen [`Strategy`] strictly in sequence and folds
//! whatever happens into a single [`DeploymentOutcome`]. Steps never run
//! speculatively: each one starts only after the previous one succeeded.
//! A failure after a repository was created leaves that repository in
//! place.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::connectors::{
    Deployment, GitDeployOptions, Hosting, RepoRef, SourceControl, sanitize_name,
};
use crate::{DeployError, Snapshot};

/// How a project gets to the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Upload the project's files directly.
    Direct,
    /// Create a repository named after the project, push to it, deploy from it.
    NewRepoThenDeploy,
    /// Clone an existing repository, then deploy from it.
    ExistingRepoThenDeploy {
        /// URL of the repository, e.g. `https://github.com/owner/repo`.
        repo_reference: String,
    },
}

/// A request to deploy the current project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub project_name: String,
    pub strategy: Strategy,
}

impl DeploymentRequest {
    pub fn direct(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            strategy: Strategy::Direct,
        }
    }

    pub fn new_repo(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            strategy: Strategy::NewRepoThenDeploy,
        }
    }

    pub fn existing_repo(
        project_name: impl Into<String>,
        repo_reference: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            strategy: Strategy::ExistingRepoThenDeploy {
                repo_reference: repo_reference.into(),
            },
        }
    }
}

/// The single result of a deployment: a URL or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    Deployed { url: String },
    Failed(DeployError),
}

impl DeploymentOutcome {
    pub fn deployed_url(&self) -> Option<&str> {
        match self {
            DeploymentOutcome::Deployed { url } => Some(url),
            DeploymentOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&DeployError> {
        match self {
            DeploymentOutcome::Deployed { .. } => None,
            DeploymentOutcome::Failed(err) => Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeploymentOutcome::Deployed { .. })
    }
}

impl From<Result<String, DeployError>> for DeploymentOutcome {
    fn from(result: Result<String, DeployError>) -> Self {
        match result {
            Ok(url) => DeploymentOutcome::Deployed { url },
            Err(err) => DeploymentOutcome::Failed(err),
        }
    }
}

/// A validated request, ready to execute.
#[derive(Debug)]
enum Plan {
    Direct,
    NewRepo { repo_name: String },
    ExistingRepo { reference: String, repo: RepoRef },
}

/// Marks a deployment as in flight until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives a deployment across the source-control and hosting connectors.
///
/// Only one deployment runs at a time per orchestrator; a call made while
/// another is pending is rejected with `AlreadyInProgress`.
pub struct Orchestrator<S, H> {
    source_control: S,
    hosting: H,
    git_options: GitDeployOptions,
    in_flight: AtomicBool,
}

impl<S: SourceControl, H: Hosting> Orchestrator<S, H> {
    pub fn new(source_control: S, hosting: H) -> Self {
        Self {
            source_control,
            hosting,
            git_options: GitDeployOptions::default(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Options used whenever the hosting provider deploys from a repository.
    pub fn with_git_options(mut self, git_options: GitDeployOptions) -> Self {
        self.git_options = git_options;
        self
    }

    pub fn source_control(&self) -> &S {
        &self.source_control
    }

    pub fn hosting(&self) -> &H {
        &self.hosting
    }

    /// Whether a deployment is currently running.
    pub fn is_deploying(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Deploy the project described by `request` using the files in `snapshot`.
    pub async fn deploy(
        &self,
        request: &DeploymentRequest,
        snapshot: &Snapshot,
    ) -> DeploymentOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            tracing::warn!(
                project = %request.project_name,
                "Rejecting deployment, another one is in progress"
            );
            return DeploymentOutcome::Failed(DeployError::already_in_progress());
        };

        let project_name = request.project_name.trim();
        let result = match self.plan(request) {
            Ok(plan) => {
                tracing::info!(project = project_name, ?plan, "Starting deployment");
                self.execute(plan, project_name, snapshot)
                    .await
                    .and_then(Self::resolve_url)
            }
            Err(err) => Err(err),
        };

        match &result {
            Ok(url) => tracing::info!(project = project_name, url = %url, "Deployment complete"),
            Err(err) => tracing::error!(
                project = project_name,
                kind = %err.kind(),
                error = %err,
                "Deployment failed"
            ),
        }

        result.into()
    }

    /// Check the request before any network call. The first failing check wins.
    fn plan(&self, request: &DeploymentRequest) -> Result<Plan, DeployError> {
        let project_name = request.project_name.trim();
        if project_name.is_empty() {
            return Err(DeployError::invalid_input("Please enter a project name"));
        }

        match &request.strategy {
            Strategy::Direct => Ok(Plan::Direct),
            Strategy::NewRepoThenDeploy => {
                let repo_name = sanitize_name(project_name).ok_or_else(|| {
                    DeployError::invalid_input(format!(
                        "Cannot derive a repository name from {project_name}"
                    ))
                })?;
                Ok(Plan::NewRepo { repo_name })
            }
            Strategy::ExistingRepoThenDeploy { repo_reference } => {
                let reference = repo_reference.trim();
                if reference.is_empty() {
                    return Err(DeployError::invalid_input(
                        "Please enter a GitHub repository URL",
                    ));
                }
                let repo = RepoRef::parse(reference)?;

                if !self.source_control.clone_ready() {
                    return Err(DeployError::not_ready(
                        "Git system is not ready. Please try again in a moment.",
                    ));
                }

                Ok(Plan::ExistingRepo {
                    reference: reference.to_string(),
                    repo,
                })
            }
        }
    }

    async fn execute(
        &self,
        plan: Plan,
        project_name: &str,
        snapshot: &Snapshot,
    ) -> Result<Deployment, DeployError> {
        match plan {
            Plan::Direct => self.hosting.deploy_files(snapshot, project_name).await,
            Plan::NewRepo { repo_name } => {
                let repo = self.source_control.create_repo(&repo_name).await?;
                self.source_control.push(snapshot, &repo).await?;
                self.hosting
                    .deploy_from_source_control(project_name, &repo, &self.git_options)
                    .await
            }
            Plan::ExistingRepo { reference, repo } => {
                let local = self.source_control.clone_repo(&reference).await?;
                tracing::debug!(path = %local.path().display(), "Repository cloned");
                self.hosting
                    .deploy_from_source_control(project_name, &repo, &self.git_options)
                    .await
            }
        }
    }

    fn resolve_url(deployment: Deployment) -> Result<String, DeployError> {
        if deployment.url.trim().is_empty() {
            return Err(DeployError::deploy_failed(
                "Failed to deploy to Vercel: no deployment URL was returned",
            ));
        }
        Ok(deployment.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors_are_exclusive() {
        let ok = DeploymentOutcome::Deployed {
            url: "https://demo.example".to_string(),
        };
        assert_eq!(ok.deployed_url(), Some("https://demo.example"));
        assert!(ok.error().is_none());
        assert!(ok.is_success());

        let failed = DeploymentOutcome::Failed(DeployError::deploy_failed("no url"));
        assert!(failed.deployed_url().is_none());
        assert!(failed.error().is_some());
    }

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = InFlight::acquire(&flag).unwrap();
            assert!(InFlight::acquire(&flag).is_none());
        }
        assert!(InFlight::acquire(&flag).is_some());
    }
}
