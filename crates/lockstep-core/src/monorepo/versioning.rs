//! Shared version planning
//!
//! Every package in the dirty closure receives the same version. It is
//! computed once per run from a baseline and a directive, either an explicit
//! version or a semantic increment.

use std::str::FromStr;

use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VersionError};
use crate::types::IncrementKind;

use super::discovery::Package;

/// How the new version is chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionDirective {
    /// Use this version verbatim
    Explicit(String),
    /// Increment the baseline
    Increment(IncrementKind),
}

impl VersionDirective {
    /// Pick the directive for a run. An explicit version wins over an
    /// increment. `None` when neither is given.
    pub fn from_request(
        new_version: Option<&str>,
        increment_by: Option<&str>,
    ) -> Result<Option<Self>> {
        if let Some(version) = new_version {
            Version::parse(version).map_err(|e| VersionError::InvalidVersion {
                version: version.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(Some(Self::Explicit(version.to_string())));
        }

        match increment_by {
            Some(kind) => Ok(Some(Self::Increment(IncrementKind::from_str(kind)?))),
            None => Ok(None),
        }
    }
}

impl std::fmt::Display for VersionDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(v) => write!(f, "{}", v),
            Self::Increment(kind) => write!(f, "{}", kind),
        }
    }
}

/// Outcome of planning: the single version shared by all dirty packages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPlan {
    /// Baseline the directive was applied to
    pub previous: String,
    /// New version
    pub version: String,
    /// Directive that produced it
    pub directive: VersionDirective,
}

/// Plans the shared version for a run
pub struct VersionPlanner;

impl VersionPlanner {
    /// Apply a directive to the baseline
    pub fn plan(baseline: &Version, directive: &VersionDirective) -> Result<VersionPlan> {
        let version = match directive {
            VersionDirective::Explicit(v) => {
                Version::parse(v).map_err(|e| VersionError::InvalidVersion {
                    version: v.clone(),
                    reason: e.to_string(),
                })?;
                v.clone()
            }
            VersionDirective::Increment(kind) => increment(baseline, *kind)?.to_string(),
        };

        info!(from = %baseline, to = %version, directive = %directive, "planned version");
        Ok(VersionPlan {
            previous: baseline.to_string(),
            version,
            directive: directive.clone(),
        })
    }

    /// Baseline version: the supplied master version, else the root
    /// manifest's version, else the highest package version. Unparseable
    /// manifest versions are errors.
    pub fn baseline(
        master_version: Option<&str>,
        root: Option<&Package>,
        packages: &[Package],
    ) -> Result<Version> {
        if let Some(version) = master_version {
            debug!(version, "baseline from master version");
            return Version::parse(version).map_err(|e| {
                VersionError::InvalidVersion {
                    version: version.to_string(),
                    reason: e.to_string(),
                }
                .into()
            });
        }

        if let Some(root) = root {
            debug!(version = %root.version, "baseline from root manifest");
            return parse_manifest_version(&root.version);
        }

        let highest = packages
            .iter()
            .map(|p| parse_manifest_version(&p.version))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .max()
            .unwrap_or_else(|| Version::new(0, 0, 0));
        debug!(version = %highest, "baseline from highest package version");
        Ok(highest)
    }
}

fn parse_manifest_version(version: &str) -> Result<Version> {
    Version::parse(version)
        .map_err(|e| VersionError::ParseFailed(version.to_string(), e.to_string()).into())
}

/// Increment a version the way npm's `semver.inc` does.
///
/// `major`, `minor` and `patch` on a prerelease of exactly that release
/// only drop the prerelease. The named tracks (`alpha`, `beta`, `rc`) start
/// a prerelease of the next major from a stable version, continue their own
/// track, and switch tracks in place.
pub fn increment(version: &Version, kind: IncrementKind) -> Result<Version> {
    let mut v = version.clone();
    v.build = BuildMetadata::EMPTY;
    let is_pre = !v.pre.is_empty();

    match kind {
        IncrementKind::Major => {
            if !(is_pre && v.minor == 0 && v.patch == 0) {
                v.major = bump(v.major, version)?;
                v.minor = 0;
                v.patch = 0;
            }
            v.pre = Prerelease::EMPTY;
        }
        IncrementKind::Minor => {
            if !(is_pre && v.patch == 0) {
                v.minor = bump(v.minor, version)?;
                v.patch = 0;
            }
            v.pre = Prerelease::EMPTY;
        }
        IncrementKind::Patch => {
            if !is_pre {
                v.patch = bump(v.patch, version)?;
            }
            v.pre = Prerelease::EMPTY;
        }
        IncrementKind::Premajor => {
            v.major = bump(v.major, version)?;
            v.minor = 0;
            v.patch = 0;
            v.pre = first_prerelease(None)?;
        }
        IncrementKind::Preminor => {
            v.minor = bump(v.minor, version)?;
            v.patch = 0;
            v.pre = first_prerelease(None)?;
        }
        IncrementKind::Prepatch => {
            v.patch = bump(v.patch, version)?;
            v.pre = first_prerelease(None)?;
        }
        IncrementKind::Prerelease => {
            if is_pre {
                v.pre = next_prerelease(&v.pre)?;
            } else {
                v.patch = bump(v.patch, version)?;
                v.pre = first_prerelease(None)?;
            }
        }
        IncrementKind::Alpha | IncrementKind::Beta | IncrementKind::Rc => {
            let id = kind.preid();
            if !is_pre {
                v.major = bump(v.major, version)?;
                v.minor = 0;
                v.patch = 0;
                v.pre = first_prerelease(id)?;
            } else if v.pre.as_str().split('.').next() == id {
                v.pre = next_prerelease(&v.pre)?;
            } else {
                v.pre = first_prerelease(id)?;
            }
        }
    }

    Ok(v)
}

fn bump(n: u64, version: &Version) -> Result<u64> {
    n.checked_add(1).ok_or_else(|| {
        VersionError::ParseFailed(version.to_string(), "numeric overflow".to_string()).into()
    })
}

fn first_prerelease(id: Option<&str>) -> Result<Prerelease> {
    let text = match id {
        Some(id) => format!("{}.0", id),
        None => "0".to_string(),
    };
    build_prerelease(&text)
}

/// Bump the last numeric identifier, or append `.0` when there is none
fn next_prerelease(pre: &Prerelease) -> Result<Prerelease> {
    let mut parts: Vec<String> = pre.as_str().split('.').map(str::to_string).collect();
    let last_numeric = parts
        .iter()
        .rposition(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));

    match last_numeric {
        Some(i) => {
            let n = parts[i]
                .parse::<u64>()
                .ok()
                .and_then(|n| n.checked_add(1))
                .ok_or_else(|| {
                    VersionError::ParseFailed(pre.to_string(), "numeric overflow".into())
                })?;
            parts[i] = n.to_string();
        }
        None => parts.push("0".to_string()),
    }

    build_prerelease(&parts.join("."))
}

fn build_prerelease(text: &str) -> Result<Prerelease> {
    Prerelease::new(text)
        .map_err(|e| VersionError::ParseFailed(text.to_string(), e.to_string()).into())
}
