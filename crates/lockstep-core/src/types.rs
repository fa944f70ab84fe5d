//! Core types for lockstep

use serde::{Deserialize, Serialize};

use crate::error::VersionError;

/// Semantic increment applied to the baseline version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncrementKind {
    /// Breaking release, strips any prerelease
    Major,
    /// Feature release, strips any prerelease
    Minor,
    /// Fix release, strips any prerelease
    Patch,
    /// Next major with a prerelease suffix
    Premajor,
    /// Next minor with a prerelease suffix
    Preminor,
    /// Next patch with a prerelease suffix
    Prepatch,
    /// Next prerelease of the current track
    Prerelease,
    /// `prerelease` on the `alpha` track
    Alpha,
    /// `prerelease` on the `beta` track
    Beta,
    /// `prerelease` on the `rc` track
    Rc,
}

impl IncrementKind {
    /// Returns the string representation of the increment
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::Premajor => "premajor",
            Self::Preminor => "preminor",
            Self::Prepatch => "prepatch",
            Self::Prerelease => "prerelease",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Rc => "rc",
        }
    }

    /// Prerelease identifier carried by the named presets
    pub fn preid(&self) -> Option<&'static str> {
        match self {
            Self::Alpha => Some("alpha"),
            Self::Beta => Some("beta"),
            Self::Rc => Some("rc"),
            _ => None,
        }
    }
}

impl std::fmt::Display for IncrementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IncrementKind {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            "premajor" => Ok(Self::Premajor),
            "preminor" => Ok(Self::Preminor),
            "prepatch" => Ok(Self::Prepatch),
            "prerelease" => Ok(Self::Prerelease),
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            "rc" => Ok(Self::Rc),
            other => Err(VersionError::InvalidIncrementBy(other.to_string())),
        }
    }
}

/// How a dependent's requirement on a bumped local package is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpPolicy {
    /// Pin to the literal new version
    Exact,
    /// Keep the original operator (`^`, `~` or none) in front of the new version
    #[default]
    Range,
    /// Leave the version unpinned. The stale requirement becomes `*`.
    #[serde(rename = "no", alias = "no-change")]
    NoChange,
}

impl BumpPolicy {
    /// Returns the configuration spelling of the policy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Range => "range",
            Self::NoChange => "no",
        }
    }

    /// Rewrite `requirement` for a dependency now released as `new_version`
    pub fn apply(&self, requirement: &str, new_version: &str) -> String {
        match self {
            Self::Exact => new_version.to_string(),
            Self::Range => {
                let operator = range_operator(requirement);
                format!("{}{}", operator, new_version)
            }
            Self::NoChange => "*".to_string(),
        }
    }
}

impl std::fmt::Display for BumpPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BumpPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "range" => Ok(Self::Range),
            "no" | "no-change" | "none" => Ok(Self::NoChange),
            _ => Err(format!("Unknown bump policy: {} (expected exact, range or no)", s)),
        }
    }
}

/// Leading range operator of a requirement, if it is one we carry over
fn range_operator(requirement: &str) -> &'static str {
    match requirement.trim_start().chars().next() {
        Some('^') => "^",
        Some('~') => "~",
        _ => "",
    }
}

/// Registry access level for published packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Publicly installable
    Public,
    /// Restricted to the owning scope
    Private,
}

impl Access {
    /// Parse an access level; anything other than `public`/`private` yields `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    /// Returns the string passed to the registry
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_increment_kind_from_str() {
        assert_eq!(IncrementKind::from_str("major").unwrap(), IncrementKind::Major);
        assert_eq!(IncrementKind::from_str("rc").unwrap(), IncrementKind::Rc);
        assert_eq!(
            IncrementKind::from_str("prerelease").unwrap(),
            IncrementKind::Prerelease
        );

        let err = IncrementKind::from_str("argle-bargle").unwrap_err();
        assert!(matches!(err, VersionError::InvalidIncrementBy(ref v) if v == "argle-bargle"));
    }

    #[test]
    fn test_preid() {
        assert_eq!(IncrementKind::Beta.preid(), Some("beta"));
        assert_eq!(IncrementKind::Prerelease.preid(), None);
    }

    #[test]
    fn test_bump_policy_apply() {
        assert_eq!(BumpPolicy::Range.apply("^0.8.2", "1.0.0"), "^1.0.0");
        assert_eq!(BumpPolicy::Range.apply("~0.8.2", "1.0.0"), "~1.0.0");
        assert_eq!(BumpPolicy::Range.apply("0.8.2", "1.0.0"), "1.0.0");
        assert_eq!(BumpPolicy::Range.apply(">=0.8.2", "1.0.0"), "1.0.0");
        assert_eq!(BumpPolicy::Exact.apply("^0.8.2", "1.0.0"), "1.0.0");
        assert_eq!(BumpPolicy::NoChange.apply("^0.8.2", "1.0.0"), "*");
        assert_eq!(BumpPolicy::NoChange.apply("*", "1.0.0"), "*");
    }

    #[test]
    fn test_bump_policy_parse() {
        assert_eq!(BumpPolicy::from_str("exact").unwrap(), BumpPolicy::Exact);
        assert_eq!(BumpPolicy::from_str("no").unwrap(), BumpPolicy::NoChange);
        assert_eq!(BumpPolicy::from_str("no-change").unwrap(), BumpPolicy::NoChange);
        assert!(BumpPolicy::from_str("loose").is_err());
        assert_eq!(BumpPolicy::default(), BumpPolicy::Range);
    }

    #[test]
    fn test_bump_policy_serde_spelling() {
        let policy: BumpPolicy = serde_json::from_str("\"no\"").unwrap();
        assert_eq!(policy, BumpPolicy::NoChange);
        assert_eq!(serde_json::to_string(&BumpPolicy::NoChange).unwrap(), "\"no\"");
    }

    #[test]
    fn test_access_parse() {
        assert_eq!(Access::parse("public"), Some(Access::Public));
        assert_eq!(Access::parse("private"), Some(Access::Private));
        assert_eq!(Access::parse("bogus"), None);
    }
}
