//! liftoff deploys a local project to Vercel, directly or through a GitHub repository.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;
use strum::IntoEnumIterator;

use cli::{Cli, Command, ConnectTarget, DeployArgs, RepoCommand};
use liftoff_deploy::connectors::sanitize_name;
use liftoff_deploy::{
    Config, Credential, CredentialStore, CredentialVerifier, DeployError, DeploymentOutcome,
    DeploymentRequest, FileCredentialStore, GitHubConnector, Orchestrator, Provider, Session,
    Snapshot, SourceControl, VercelConnector, http,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let client = http::create_client(config.request_timeout())?;
    let verifier = CredentialVerifier::new(client.clone(), config.verifier_endpoints());
    let store = config.credential_store()?;

    tracing::debug!(store = %store.path().display(), "Using credential store");

    match cli.command {
        Command::Connect { target } => connect(Session::new(store, verifier), target).await,
        Command::Disconnect { provider } => {
            let mut session = Session::new(store, verifier);
            session.disconnect(provider)?;
            println!("{} disconnected", provider.display_name());
            Ok(())
        }
        Command::Status => {
            let session = Session::restore(store, verifier).await?;
            print_status(&session)
        }
        Command::Repo {
            command: RepoCommand::Create { name, path },
        } => {
            let session = Session::restore(store, verifier).await?;
            let (source_control, _) = connectors(&config, client, &session).await?;
            create_repo(&source_control, &name, &path).await
        }
        Command::Deploy(args) => {
            let session = Session::restore(store, verifier).await?;
            require_hosting(&session)?;
            let (source_control, hosting) = connectors(&config, client, &session).await?;
            deploy(&config, source_control, hosting, &args).await
        }
    }
}

async fn connect(mut session: Session<FileCredentialStore>, target: ConnectTarget) -> Result<()> {
    let credential = match target {
        ConnectTarget::SourceControl { username, token } => Credential::source_control(
            username.unwrap_or_default(),
            token.unwrap_or_default(),
        )?,
        ConnectTarget::Hosting { token } => Credential::hosting(token.unwrap_or_default())?,
    };
    let provider = credential.provider();

    let result = session.connect(credential).await?;
    match result.remote_identity {
        Some(identity) => println!("{} connected as {identity}", provider.display_name()),
        None => println!("{} connected", provider.display_name()),
    }
    Ok(())
}

fn print_status(session: &Session<FileCredentialStore>) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Provider", "Account", "Connected", "Saved at"]);

    for provider in Provider::iter() {
        let state = session.state(provider);
        let saved_at = session
            .store()
            .load_record(provider)?
            .map(|record| record.saved_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        let account = state
            .credential
            .as_ref()
            .and_then(|credential| credential.identity())
            .unwrap_or("-")
            .to_string();
        let connected = match (&state.credential, state.verified) {
            (None, _) => "no",
            (Some(_), true) => "yes",
            (Some(_), false) => "rejected",
        };

        table.add_row(vec![
            provider.display_name().to_string(),
            account,
            connected.to_string(),
            saved_at,
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Fail unless the session holds a verified hosting credential, so a deploy
/// never starts a step it cannot finish.
fn require_hosting<S: CredentialStore>(session: &Session<S>) -> Result<(), DeployError> {
    match session.verified_credential(Provider::Hosting) {
        Some(_) => Ok(()),
        None => Err(DeployError::unauthenticated(
            "Connect your Vercel account in Settings first",
        )),
    }
}

/// Build both connectors from the verified credentials of the session.
async fn connectors(
    config: &Config,
    client: reqwest::Client,
    session: &Session<FileCredentialStore>,
) -> Result<(GitHubConnector, VercelConnector)> {
    let basic_auth = session
        .store()
        .load_basic_auth(&config.source_control.git_host)
        .context("Failed to load git credentials")?;

    let source_control = GitHubConnector::new(client.clone(), config.source_control.clone())
        .await
        .with_credential(session.verified_credential(Provider::SourceControl).cloned())
        .with_basic_auth(basic_auth);
    let hosting = VercelConnector::new(client, config.hosting.clone())
        .with_credential(session.verified_credential(Provider::Hosting).cloned());

    Ok((source_control, hosting))
}

fn load_snapshot(path: &std::path::Path) -> Result<Snapshot> {
    Snapshot::from_dir(path)
        .with_context(|| format!("Failed to read project files from {}", path.display()))
}

async fn create_repo(
    source_control: &GitHubConnector,
    name: &str,
    path: &std::path::Path,
) -> Result<()> {
    let name = sanitize_name(name)
        .ok_or_else(|| DeployError::invalid_input("Please enter a repository name"))?;
    let snapshot = load_snapshot(path)?;

    let repo = source_control.create_repo(&name).await?;
    source_control.push(&snapshot, &repo).await?;

    println!(
        "https://{}/{}",
        source_control.settings().git_host,
        repo.full_name()
    );
    Ok(())
}

async fn deploy(
    config: &Config,
    source_control: GitHubConnector,
    hosting: VercelConnector,
    args: &DeployArgs,
) -> Result<()> {
    let snapshot = load_snapshot(&args.path)?;
    let request = DeploymentRequest {
        project_name: args.project_name(),
        strategy: args.strategy.to_strategy(args.repo.clone()),
    };

    let orchestrator =
        Orchestrator::new(source_control, hosting).with_git_options(config.git_options());

    match orchestrator.deploy(&request, &snapshot).await {
        DeploymentOutcome::Deployed { url } => {
            println!("{url}");
            Ok(())
        }
        DeploymentOutcome::Failed(err) => Err(err.into()),
    }
}
