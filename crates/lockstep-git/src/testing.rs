//! Throwaway repositories for tests

use std::path::Path;

use git2::{Repository, Signature};
use tempfile::TempDir;

use crate::GitRepo;

/// A repository with one commit containing `packages/oao/index.js` and
/// `packages/oao-b/index.js`, with a committer identity configured
pub fn setup_repo() -> (TempDir, GitRepo) {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    write(temp.path(), "packages/oao/index.js", "module.exports = 1;\n");
    write(temp.path(), "packages/oao-b/index.js", "module.exports = 2;\n");

    let sig = Signature::now("Test", "test@example.com").unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("packages/oao/index.js")).unwrap();
    index.add_path(Path::new("packages/oao-b/index.js")).unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
        .unwrap();

    let git_repo = GitRepo::open(temp.path()).unwrap();
    (temp, git_repo)
}

/// Write a file below `root`, creating parent directories
pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}
