//! Remote operations through the git CLI

use std::path::Path;
use std::process::Command;

use git2::BranchType;
use tracing::{debug, info, instrument, warn};

use crate::repository::{GitRepo, Result};
use lockstep_core::error::GitError;

/// Run `git` with `args` in `workdir` and return its stdout
#[instrument(skip(args), fields(command = %args.join(" ")))]
pub fn run_git(workdir: &Path, args: &[&str]) -> Result<String> {
    let start = std::time::Instant::now();
    let command = args.join(" ");
    let output = Command::new("git")
        .args(args)
        .current_dir(workdir)
        .output()
        .map_err(|e| GitError::CommandFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    debug!(
        duration_ms = start.elapsed().as_millis(),
        success = output.status.success(),
        "git (CLI)"
    );

    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command,
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl GitRepo {
    /// Whether the checked-out branch tracks an upstream
    pub fn has_upstream(&self) -> Result<bool> {
        let Some(name) = self.branch_name()? else {
            return Ok(false);
        };
        let branch = self.repo.find_branch(&name, BranchType::Local)?;
        match branch.upstream() {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(GitError::Git2(e)),
        }
    }

    /// Fetch, then list upstream commits missing from HEAD
    /// (`git log --oneline HEAD..@{u}`). Empty without an upstream.
    #[instrument(skip(self))]
    pub fn incoming_commits(&self) -> Result<String> {
        if !self.has_upstream()? {
            warn!("current branch has no upstream, skipping unpulled check");
            return Ok(String::new());
        }

        run_git(self.path(), &["fetch", "--quiet"])?;
        let log = run_git(self.path(), &["log", "--oneline", "HEAD..@{u}"])?;
        Ok(log.trim().to_string())
    }

    /// Push the current branch along with annotated tags
    #[instrument(skip(self))]
    pub fn push_follow_tags(&self) -> Result<()> {
        let start = std::time::Instant::now();
        run_git(self.path(), &["push", "--follow-tags"]).map_err(|e| match e {
            GitError::CommandFailed { reason, .. } => GitError::PushFailed(reason),
            other => other,
        })?;
        info!(
            duration_ms = start.elapsed().as_millis(),
            "pushed with tags"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::setup_repo;

    #[test]
    fn test_no_upstream_means_nothing_to_pull() {
        let (_temp, repo) = setup_repo();
        assert!(!repo.has_upstream().unwrap());
        assert_eq!(repo.incoming_commits().unwrap(), "");
    }

    #[test]
    fn test_failed_command_carries_stderr() {
        let (temp, _repo) = setup_repo();
        let err = run_git(temp.path(), &["rev-parse", "--verify", "no-such-ref"]).unwrap_err();
        match err {
            GitError::CommandFailed { command, .. } => {
                assert_eq!(command, "rev-parse --verify no-such-ref")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
