//! Thin helpers around the `git` command line.

use std::path::Path;
use std::process::Stdio;

use crate::DeployError;

/// Environment variables that would redirect git away from the directory we point it at.
const GIT_ENV_OVERRIDES: [&str; 4] = [
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_COMMON_DIR",
];

/// Minimum supported git version.
const MIN_GIT_VERSION: (u32, u32) = (2, 25);

/// Whether a usable git (2.25+) is on the PATH.
pub async fn git_available() -> bool {
    let output = match tokio::process::Command::new("git")
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
    {
        Ok(output) if output.status.success() => output,
        Ok(_) => return false,
        Err(err) => {
            tracing::debug!(error = %err, "git is not installed");
            return false;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    match parse_git_version(&stdout) {
        Some(version) if version >= MIN_GIT_VERSION => true,
        Some(version) => {
            tracing::warn!(?version, "git 2.25+ is required");
            false
        }
        None => {
            tracing::warn!(output = %stdout.trim(), "Unexpected git version output");
            false
        }
    }
}

/// Parse `git version 2.43.0` (and vendor suffixes like `.windows.1`) into `(major, minor)`.
fn parse_git_version(output: &str) -> Option<(u32, u32)> {
    let version = output.split_whitespace().nth(2)?;
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Run git in `dir` with `args`.
///
/// `secrets` are masked in anything that gets logged. On failure the error
/// message names the operation only; git's stderr goes to the debug log.
pub async fn run(
    dir: &Path,
    args: &[&str],
    secrets: &[&str],
    action: &str,
) -> Result<(), DeployError> {
    let mut cmd = tokio::process::Command::new("git");
    for key in GIT_ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd.env("GIT_TERMINAL_PROMPT", "0")
        .current_dir(dir)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::trace!(args = %mask(&args.join(" "), secrets), dir = %dir.display(), "Running git");

    let output = cmd.output().await.map_err(|err| {
        tracing::debug!(error = %err, "Failed to spawn git");
        DeployError::not_ready("git is not available")
    })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    tracing::debug!(
        status = ?output.status.code(),
        stderr = %mask(stderr.trim(), secrets),
        "git {action} failed"
    );
    Err(DeployError::network(format!("git {action} failed")))
}

fn mask(text: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|secret| !secret.is_empty())
        .fold(text.to_string(), |acc, secret| acc.replace(secret, "***"))
}
