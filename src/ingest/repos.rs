/// Source control collaborator.
///
/// Ensures a local working copy exists for each configured repository,
/// cloning from GitHub over HTTPS with a token when absent. An existing
/// checkout is reused as-is, never re-cloned or updated.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::info;

/// Errors from the clone collaborator.
///
/// Error text never contains the access token.
#[derive(Error, Debug)]
pub enum SourceControlError {
    #[error("invalid repository identifier: {0:?}")]
    InvalidRepo(String),

    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git clone failed for {repo}: {stderr}")]
    CloneFailed { repo: String, stderr: String },
}

/// Ensure a local copy of `repo` (an `owner/name` identifier) exists under
/// `repos_dir`, returning its path.
///
/// Idempotent: a present checkout is reused without touching the network.
pub fn ensure_local_copy(
    repo: &str,
    repos_dir: &Path,
    token: &str,
) -> Result<PathBuf, SourceControlError> {
    let name = repo
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SourceControlError::InvalidRepo(repo.to_string()))?;
    if !repo.contains('/') {
        return Err(SourceControlError::InvalidRepo(repo.to_string()));
    }

    let dest = repos_dir.join(name);
    if dest.exists() {
        info!("Already cloned: {name}");
        return Ok(dest);
    }

    fs::create_dir_all(repos_dir)?;

    info!("Cloning {repo}...");
    let url = format!("https://{token}@github.com/{repo}.git");
    let output = Command::new("git")
        .arg("clone")
        .arg(&url)
        .arg(&dest)
        .output()?;

    if !output.status.success() {
        // Scrub the token in case git echoes the remote URL
        let stderr = String::from_utf8_lossy(&output.stderr).replace(token, "***");
        return Err(SourceControlError::CloneFailed {
            repo: repo.to_string(),
            stderr,
        });
    }

    Ok(dest)
}
