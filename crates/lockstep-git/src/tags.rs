//! Tag operations

use tracing::{debug, info, instrument};

use crate::repository::{GitRepo, Result};
use lockstep_core::error::GitError;

impl GitRepo {
    /// Whether a tag with this name exists
    pub fn tag_exists(&self, name: &str) -> Result<bool> {
        let tag_ref = format!("refs/tags/{}", name);
        match self.repo.find_reference(&tag_ref) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(GitError::Git2(e)),
        }
    }

    /// Create an annotated tag at HEAD
    #[instrument(skip(self, message), fields(name))]
    pub fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        if self.tag_exists(name)? {
            return Err(GitError::TagExists(name.to_string()));
        }

        let head = self.head_commit()?;
        let sig = self.repo.signature()?;
        let oid = self.repo.tag(name, head.as_object(), &sig, message, false)?;

        debug!(tag_oid = %oid, commit = %head.id(), "tag object written");
        info!(name, "created tag");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::setup_repo;

    #[test]
    fn test_create_annotated_tag() {
        let (_temp, repo) = setup_repo();
        assert!(!repo.tag_exists("v1.0.0").unwrap());

        repo.create_tag("v1.0.0", "v1.0.0").unwrap();
        assert!(repo.tag_exists("v1.0.0").unwrap());

        let reference = repo.repo.find_reference("refs/tags/v1.0.0").unwrap();
        let tag = reference.peel_to_tag().unwrap();
        assert_eq!(tag.message(), Some("v1.0.0"));
    }

    #[test]
    fn test_tag_already_exists() {
        let (_temp, repo) = setup_repo();
        repo.create_tag("v1.0.0", "first").unwrap();
        let result = repo.create_tag("v1.0.0", "second");
        assert!(matches!(result, Err(GitError::TagExists(_))));
    }
}
