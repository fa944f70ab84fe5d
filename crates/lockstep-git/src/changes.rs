//! Per-path change probes

use std::path::Path;

use git2::DiffOptions;
use tracing::{debug, instrument};

use crate::repository::{GitRepo, Result};
use lockstep_core::error::GitError;

impl GitRepo {
    /// Files under `path` that differ between `reference` and the working
    /// tree, one repository-relative path per line.
    ///
    /// When `reference` does not resolve (first release, tag never pushed),
    /// every tracked file under `path` is listed instead.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn files_changed_since(&self, reference: &str, path: &Path) -> Result<Vec<String>> {
        let prefix = self.relative(path);

        let tree = match self.repo.revparse_single(reference) {
            Ok(object) => object.peel_to_tree()?,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                debug!(reference, "reference not found, listing tracked files");
                return self.tracked_files(&prefix);
            }
            Err(e) => return Err(GitError::Git2(e)),
        };

        let mut opts = DiffOptions::new();
        opts.include_untracked(false);
        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?;

        let mut files: Vec<String> = diff
            .deltas()
            .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
            .filter(|file| file.starts_with(&prefix))
            .map(|file| file.to_string_lossy().into_owned())
            .collect();
        files.sort();
        files.dedup();

        debug!(reference, changed = files.len(), "diffed against reference");
        Ok(files)
    }

    fn tracked_files(&self, prefix: &Path) -> Result<Vec<String>> {
        let index = self.repo.index()?;
        let files = index
            .iter()
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .filter(|file| Path::new(file).starts_with(prefix))
            .collect();
        Ok(files)
    }
}
