//! lockstep git - version-control collaborator
//!
//! [`GitRepo`] wraps a git2 repository for branch, status, diff, commit and
//! tag operations, and shells out to the `git` CLI for network operations
//! (fetch and push) so the user's credential setup applies.

mod changes;
mod commits;
mod remote;
mod repository;
mod status;
mod tags;
mod vcs;

#[cfg(test)]
pub(crate) mod testing;

pub use remote::run_git;
pub use repository::{GitRepo, Result};
