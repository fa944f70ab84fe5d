//! Error types for lockstep

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using LockstepError
pub type Result<T> = std::result::Result<T, LockstepError>;

/// Main error type for lockstep operations
#[derive(Debug, Error)]
pub enum LockstepError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Repository state checks (branch, uncommitted, unpulled)
    #[error(transparent)]
    Check(#[from] CheckError),

    /// Version-related errors
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Dependency graph errors
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Git-related errors
    #[error(transparent)]
    Git(#[from] GitError),

    /// Manifest read/write errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Registry publish errors
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Neither an explicit version nor an increment was supplied
    #[error("No version directive: pass an explicit version or an increment (major, minor, patch, ...)")]
    MissingVersionDirective,

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Repository state checks performed before anything is written
#[derive(Debug, Error)]
pub enum CheckError {
    /// Current branch is not a release branch
    #[error("BRANCH_CHECK_FAILED: can't publish from branch '{branch}' (expected master or main)")]
    BranchCheckFailed { branch: String },

    /// Working tree has uncommitted changes
    #[error("UNCOMMITTED_CHECK_FAILED: the working tree has uncommitted changes:\n{diff}")]
    UncommittedCheckFailed { diff: String },

    /// Remote has commits not yet pulled
    #[error("UNPULLED_CHECK_FAILED: the remote has changes that have not been pulled:\n{diff}")]
    UnpulledCheckFailed { diff: String },
}

/// Version-related errors
#[derive(Debug, Error)]
pub enum VersionError {
    /// Explicit version is not valid semver
    #[error("INVALID_VERSION: '{version}' is not a valid semantic version ({reason})")]
    InvalidVersion { version: String, reason: String },

    /// Unrecognised increment directive
    #[error("INVALID_INCREMENT_BY_VALUE: '{0}' (expected major, minor, patch, premajor, preminor, prepatch, prerelease, alpha, beta or rc)")]
    InvalidIncrementBy(String),

    /// A manifest version could not be parsed
    #[error("Failed to parse version '{0}': {1}")]
    ParseFailed(String, String),
}

/// Dependency graph errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// Local packages depend on each other in a cycle
    #[error("Circular dependency between local packages: {}", members.join(" -> "))]
    Cycle { members: Vec<String> },

    /// A package lists itself as a dependency
    #[error("Package '{0}' depends on itself")]
    SelfDependency(String),

    /// Two discovered manifests share a name
    #[error("Package name '{name}' is used by both {first} and {second}")]
    DuplicatePackage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Git-related errors
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// Tag already exists
    #[error("Tag already exists: {0}")]
    TagExists(String),

    /// A git command exited unsuccessfully
    #[error("git {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// Failed to push
    #[error("Failed to push to remote: {0}")]
    PushFailed(String),

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),
}

/// Manifest read/write errors
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Package manifest not found
    #[error("Package manifest not found at {0}")]
    NotFound(PathBuf),

    /// Failed to parse manifest
    #[error("Failed to parse manifest {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    /// Failed to write manifest
    #[error("Failed to write manifest {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    /// Invalid source glob
    #[error("Invalid package pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Registry publish errors
#[derive(Debug, Error)]
pub enum PublishError {
    /// The publish command for a package failed
    #[error("Failed to publish {package}: {reason}")]
    Failed { package: String, reason: String },

    /// The publish command could not be started
    #[error("Command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },
}

impl LockstepError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Stable machine-readable code for the error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Check(CheckError::BranchCheckFailed { .. }) => "BRANCH_CHECK_FAILED",
            Self::Check(CheckError::UncommittedCheckFailed { .. }) => "UNCOMMITTED_CHECK_FAILED",
            Self::Check(CheckError::UnpulledCheckFailed { .. }) => "UNPULLED_CHECK_FAILED",
            Self::Version(VersionError::InvalidIncrementBy(_)) => "INVALID_INCREMENT_BY_VALUE",
            Self::Version(VersionError::InvalidVersion { .. }) => "INVALID_VERSION",
            Self::Version(VersionError::ParseFailed(..)) => "VERSION_PARSE_FAILED",
            Self::Graph(GraphError::Cycle { .. }) => "DEPENDENCY_CYCLE",
            Self::Graph(GraphError::SelfDependency(_)) => "SELF_DEPENDENCY",
            Self::Graph(GraphError::DuplicatePackage { .. }) => "DUPLICATE_PACKAGE",
            Self::Config(_) | Self::Toml(_) => "CONFIG_ERROR",
            Self::Git(_) => "GIT_ERROR",
            Self::Manifest(_) | Self::Json(_) => "MANIFEST_ERROR",
            Self::Publish(_) => "PUBLISH_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Other(_) => "ERROR",
        }
    }
}
