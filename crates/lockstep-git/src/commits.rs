//! Commit operations

use git2::IndexAddOption;
use tracing::{info, instrument};

use crate::repository::{GitRepo, Result};

impl GitRepo {
    /// Stage every change (including deletions and new files) and commit it
    /// on HEAD. Returns the new commit id.
    #[instrument(skip(self))]
    pub fn commit_all(&self, message: &str) -> Result<String> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = self.repo.signature()?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;

        info!(commit = %oid, "committed changes");
        Ok(oid.to_string())
    }
}
