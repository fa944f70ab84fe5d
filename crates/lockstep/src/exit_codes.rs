//! Exit codes for the CLI

use lockstep_core::error::LockstepError;
use thiserror::Error;

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Git error
pub const GIT_ERROR: i32 = 3;

/// Version error
pub const VERSION_ERROR: i32 = 4;

/// Validation error (repository checks, graph problems)
pub const VALIDATION_ERROR: i32 = 5;

/// A package failed to publish
pub const PUBLISH_ERROR: i32 = 6;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Failures raised by the CLI itself
#[derive(Debug, Error)]
pub enum CliError {
    /// The confirmation prompt was declined
    #[error("Aborted.")]
    Cancelled,

    /// The run finished but some packages were not published
    #[error("{failed} package(s) failed to publish, {not_reached} not reached")]
    PublishFailed { failed: usize, not_reached: usize },
}

/// Exit code for an error returned by a command
pub fn for_error(err: &anyhow::Error) -> i32 {
    if let Some(err) = err.downcast_ref::<CliError>() {
        return match err {
            CliError::Cancelled => CANCELLED,
            CliError::PublishFailed { .. } => PUBLISH_ERROR,
        };
    }

    if let Some(err) = err.downcast_ref::<LockstepError>() {
        return match err {
            LockstepError::Config(_) | LockstepError::Toml(_) => CONFIG_ERROR,
            LockstepError::Git(_) => GIT_ERROR,
            LockstepError::Version(_) => VERSION_ERROR,
            LockstepError::Check(_) | LockstepError::Graph(_) => VALIDATION_ERROR,
            LockstepError::Publish(_) => PUBLISH_ERROR,
            LockstepError::Manifest(_)
            | LockstepError::Io(_)
            | LockstepError::Json(_)
            | LockstepError::Other(_) => ERROR,
        };
    }

    ERROR
}
