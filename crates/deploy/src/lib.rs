//! liftoff-deploy - publish a local project to a hosting provider.
//!
//! This crate provides the credential handling for the source-control and
//! hosting providers and the orchestrator that deploys a project through
//! one of three strategies.
//!
//! # Example
//!
//! ```no_run
//! use liftoff_deploy::{
//!     Config, CredentialVerifier, DeploymentRequest, GitHubConnector, Orchestrator, Provider,
//!     Session, Snapshot, VercelConnector, http,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! let client = http::create_client(config.request_timeout())?;
//! let verifier = CredentialVerifier::new(client.clone(), config.verifier_endpoints());
//! let session = Session::restore(config.credential_store()?, verifier).await?;
//!
//! let hosting = VercelConnector::new(client.clone(), config.hosting.clone())
//!     .with_credential(session.verified_credential(Provider::Hosting).cloned());
//! let source_control = GitHubConnector::new(client, config.source_control.clone())
//!     .await
//!     .with_credential(session.verified_credential(Provider::SourceControl).cloned());
//!
//! let orchestrator = Orchestrator::new(source_control, hosting);
//! let snapshot = Snapshot::from_dir(std::path::Path::new("."))?;
//! let outcome = orchestrator
//!     .deploy(&DeploymentRequest::direct("demo"), &snapshot)
//!     .await;
//! println!("{:?}", outcome.deployed_url());
//! # Ok(())
//! # }
//! ```

mod config;
pub mod connectors;
pub mod credentials;
mod error;
pub mod http;
mod orchestrator;
mod provider;
mod session;
mod snapshot;

pub use config::{CONFIG_FILENAME, Config, ENV_PREFIX};
pub use connectors::{
    Deployment, GitDeployOptions, GitHubConnector, GitHubSettings, Hosting, LocalRepo, RepoRef,
    SourceControl, VercelConnector, VercelSettings,
};
pub use credentials::{
    BasicAuth, Credential, CredentialStore, CredentialVerifier, FileCredentialStore,
    MemoryCredentialStore, StoredCredential, VerificationResult, VerifierEndpoints,
};
pub use error::{DeployError, ErrorKind};
pub use orchestrator::{DeploymentOutcome, DeploymentRequest, Orchestrator, Strategy};
pub use provider::Provider;
pub use session::{ConnectionState, Session};
pub use snapshot::Snapshot;
