use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use liftoff_deploy::{Provider, Strategy};
use tracing::level_filters::LevelFilter;

/// How `liftoff deploy` gets the project to the hosting provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum StrategyKind {
    /// Upload the project files directly.
    Direct,
    /// Create a GitHub repository, push the project, deploy from it.
    NewRepo,
    /// Deploy from an existing GitHub repository.
    ExistingRepo,
}

impl StrategyKind {
    pub fn to_strategy(self, repo: Option<String>) -> Strategy {
        match self {
            StrategyKind::Direct => Strategy::Direct,
            StrategyKind::NewRepo => Strategy::NewRepoThenDeploy,
            StrategyKind::ExistingRepo => Strategy::ExistingRepoThenDeploy {
                repo_reference: repo.unwrap_or_default(),
            },
        }
    }
}

#[derive(Parser)]
#[command(name = "liftoff")]
#[command(
    author,
    version,
    about = "Deploy a local project to Vercel, directly or through GitHub"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(
        short,
        long,
        global = true,
        env = "LIFTOFF_VERBOSITY",
        default_value_t = LevelFilter::INFO
    )]
    pub verbosity: LevelFilter,

    /// Path to a liftoff.toml configuration file.
    ///
    /// If not provided, the file in the user config directory is used when it exists.
    #[arg(long, alias = "conf", global = true, env = "LIFTOFF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Verify a provider credential and save it.
    Connect {
        #[command(subcommand)]
        target: ConnectTarget,
    },

    /// Forget the saved credential of a provider.
    Disconnect {
        /// The provider to disconnect (source-control or hosting).
        provider: Provider,
    },

    /// Re-verify the saved credentials and show the connection state.
    Status,

    /// Manage repositories on the source-control host.
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Deploy the project to the hosting provider.
    Deploy(DeployArgs),
}

#[derive(Subcommand)]
pub enum ConnectTarget {
    /// Connect a GitHub account with a personal access token.
    #[command(alias = "github")]
    SourceControl {
        /// The GitHub login the token belongs to.
        #[arg(short, long, env = "LIFTOFF_GITHUB_USERNAME")]
        username: Option<String>,

        /// A GitHub personal access token.
        #[arg(short, long, env = "LIFTOFF_GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Connect a Vercel account with an access token.
    #[command(alias = "vercel")]
    Hosting {
        /// A Vercel access token.
        #[arg(short, long, env = "LIFTOFF_VERCEL_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RepoCommand {
    /// Create a repository and push the project as its first commit.
    Create {
        /// The repository name.
        name: String,

        /// The project directory.
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// The project name. Defaults to the name of the project directory.
    #[arg(short, long, env = "LIFTOFF_PROJECT_NAME")]
    pub name: Option<String>,

    /// The deployment strategy (direct, new-repo or existing-repo).
    #[arg(short, long, default_value_t = StrategyKind::Direct)]
    pub strategy: StrategyKind,

    /// URL of the repository to deploy from, for the existing-repo strategy.
    #[arg(long, visible_alias = "repo-url")]
    pub repo: Option<String>,

    /// The project directory.
    #[arg(long, default_value = ".")]
    pub path: PathBuf,
}

impl DeployArgs {
    /// The explicit project name, or the name of the project directory.
    pub fn project_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            std::fs::canonicalize(&self.path)
                .ok()
                .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
                .unwrap_or_default()
        })
    }
}
