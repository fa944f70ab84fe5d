//! `VersionControl` for a git working copy

use std::path::Path;

use lockstep_core::traits::VersionControl;
use lockstep_core::Result;

use crate::repository::GitRepo;

impl VersionControl for GitRepo {
    fn current_branch(&self) -> Result<String> {
        // detached HEAD reports as "HEAD", like `git rev-parse --abbrev-ref`
        Ok(self.branch_name()?.unwrap_or_else(|| "HEAD".to_string()))
    }

    fn uncommitted_changes(&self) -> Result<String> {
        Ok(self.status_summary()?)
    }

    fn unpulled_changes(&self) -> Result<String> {
        Ok(self.incoming_commits()?)
    }

    fn changed_since(&self, reference: &str, path: &Path) -> Result<String> {
        Ok(self.files_changed_since(reference, path)?.join("\n"))
    }

    fn commit_changes(&self, message: &str) -> Result<()> {
        self.commit_all(message)?;
        Ok(())
    }

    fn add_tag(&self, tag: &str, message: &str) -> Result<()> {
        Ok(self.create_tag(tag, message)?)
    }

    fn push_with_tags(&self) -> Result<()> {
        Ok(self.push_follow_tags()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{setup_repo, write};

    #[test]
    fn test_release_cycle() {
        let (temp, repo) = setup_repo();
        let vcs: &dyn VersionControl = &repo;

        assert_eq!(vcs.uncommitted_changes().unwrap(), "");
        assert_eq!(vcs.unpulled_changes().unwrap(), "");
        let pkg = temp.path().join("packages/oao");
        assert_eq!(
            vcs.changed_since("v0.8.2", &pkg).unwrap(),
            "packages/oao/index.js"
        );

        write(temp.path(), "packages/oao/package.json", "{}\n");
        vcs.commit_changes("v0.8.3").unwrap();
        vcs.add_tag("v0.8.3", "v0.8.3").unwrap();

        assert_eq!(vcs.uncommitted_changes().unwrap(), "");
        assert_eq!(vcs.changed_since("v0.8.3", &pkg).unwrap(), "");
    }

    #[test]
    fn test_duplicate_tag_is_a_git_error() {
        let (_temp, repo) = setup_repo();
        let vcs: &dyn VersionControl = &repo;
        vcs.add_tag("v1.0.0", "v1.0.0").unwrap();
        let err = vcs.add_tag("v1.0.0", "v1.0.0").unwrap_err();
        assert_eq!(err.code(), "GIT_ERROR");
    }
}
