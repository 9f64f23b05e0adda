//! [`VersionControl`] over the `git` executable in a local working tree.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::contract::{BoxError, VersionControl};

/// Runs `git -C <repo_dir> ...` for every operation.
#[derive(Debug, Clone)]
pub struct GitRepository {
    repo_dir: PathBuf,
}

impl GitRepository {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    async fn git<I, A>(&self, args: I) -> Result<Output, BoxError>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        debug!(repo = %self.repo_dir.display(), ?args, "Running git");

        Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                error!(error = ?e, repo = %self.repo_dir.display(), "Failed to launch git process");
                Box::new(e) as BoxError
            })
    }

    /// Run git and fail unless it exits with status zero.
    async fn git_ok<I, A>(&self, args: I, action: &str) -> Result<(), BoxError>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let output = self.git(args).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(
            repo = %self.repo_dir.display(),
            status = ?output.status,
            stderr = %stderr.trim(),
            "git {action} exited with non-zero code"
        );
        Err(format!("git {action} failed ({}): {}", output.status, stderr.trim()).into())
    }
}

#[async_trait]
impl VersionControl for GitRepository {
    async fn stage(&self, path: &Path) -> Result<(), BoxError> {
        self.git_ok([OsStr::new("add"), OsStr::new("--"), path.as_os_str()], "add")
            .await
    }

    async fn has_staged_changes(&self, path: &Path) -> Result<bool, BoxError> {
        let output = self
            .git([
                OsStr::new("diff"),
                OsStr::new("--cached"),
                OsStr::new("--quiet"),
                OsStr::new("--"),
                path.as_os_str(),
            ])
            .await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                error!(path = %path.display(), status = ?output.status, stderr = %stderr.trim(), "git diff exited unexpectedly");
                Err(format!("git diff failed ({}): {}", output.status, stderr.trim()).into())
            }
        }
    }

    async fn commit(&self, path: &Path, message: &str) -> Result<(), BoxError> {
        self.git_ok(
            [
                OsStr::new("commit"),
                OsStr::new("-m"),
                OsStr::new(message),
                OsStr::new("--"),
                path.as_os_str(),
            ],
            "commit",
        )
        .await?;
        info!(repo = %self.repo_dir.display(), path = %path.display(), commit_message = message, "Created commit");
        Ok(())
    }

    async fn push(&self) -> Result<(), BoxError> {
        self.git_ok(["push"], "push").await?;
        info!(repo = %self.repo_dir.display(), "Pushed to remote");
        Ok(())
    }
}
