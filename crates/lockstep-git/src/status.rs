//! Repository status operations

use git2::{Status, StatusOptions};

use crate::repository::{GitRepo, Result};

impl GitRepo {
    /// Current branch name; `None` on a detached or unborn HEAD
    pub fn branch_name(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Uncommitted changes in short-status form (`M  path`), one per line.
    /// Untracked files count; ignored files do not.
    pub fn status_summary(&self) -> Result<String> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut lines = Vec::new();
        for entry in statuses.iter() {
            let Some(path) = entry.path() else { continue };
            let status = entry.status();
            if status.is_empty() || status.is_ignored() {
                continue;
            }
            lines.push(format!("{} {}", short_status(status), path));
        }

        Ok(lines.join("\n"))
    }

    /// Check if the working directory is clean
    pub fn is_clean(&self) -> Result<bool> {
        Ok(self.status_summary()?.is_empty())
    }
}

fn short_status(status: Status) -> String {
    if status.is_wt_new() && !status.is_index_new() {
        return "??".to_string();
    }

    let index = if status.is_index_new() {
        'A'
    } else if status.is_index_modified() {
        'M'
    } else if status.is_index_deleted() {
        'D'
    } else if status.is_index_renamed() {
        'R'
    } else if status.is_index_typechange() {
        'T'
    } else {
        ' '
    };

    let worktree = if status.is_wt_modified() {
        'M'
    } else if status.is_wt_deleted() {
        'D'
    } else if status.is_wt_renamed() {
        'R'
    } else if status.is_wt_typechange() {
        'T'
    } else {
        ' '
    };

    format!("{}{}", index, worktree)
}

#[cfg(test)]
mod tests {
    use crate::testing::{setup_repo, write};

    #[test]
    fn test_is_clean() {
        let (_temp, repo) = setup_repo();
        assert!(repo.is_clean().unwrap());
        assert_eq!(repo.status_summary().unwrap(), "");
    }

    #[test]
    fn test_modified_file() {
        let (temp, repo) = setup_repo();
        write(temp.path(), "packages/oao/index.js", "changed");
        assert_eq!(repo.status_summary().unwrap(), " M packages/oao/index.js");
    }

    #[test]
    fn test_untracked_file() {
        let (temp, repo) = setup_repo();
        write(temp.path(), "packages/oao/new.js", "new");
        assert_eq!(repo.status_summary().unwrap(), "?? packages/oao/new.js");
        assert!(!repo.is_clean().unwrap());
    }

    #[test]
    fn test_branch_name() {
        let (_temp, repo) = setup_repo();
        let branch = repo.branch_name().unwrap();
        // Git might default to 'master' or 'main' depending on config
        assert!(branch.is_some());
    }
}
