//! Configuration validation

use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::types::{Access, IncrementKind};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_packages(config)?;
    validate_versioning(config)?;
    validate_changes(config)?;
    validate_git(config)?;
    validate_publish(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_packages(config: &Config) -> Result<()> {
    if !config.packages.single && config.packages.src.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "packages.src".to_string(),
            message: "source pattern cannot be empty".to_string(),
        }
        .into());
    }

    if let Some(ignore) = &config.packages.ignore_src {
        check_glob("packages.ignore_src", ignore)?;
    }
    if !config.packages.single {
        check_glob("packages.src", &config.packages.src)?;
    }

    Ok(())
}

fn validate_versioning(config: &Config) -> Result<()> {
    if !config.versioning.tag_format.contains("{version}") {
        return Err(ConfigError::InvalidValue {
            field: "versioning.tag_format".to_string(),
            message: "must contain {version} placeholder".to_string(),
        }
        .into());
    }

    if let Some(increment) = &config.versioning.increment_by {
        IncrementKind::from_str(increment)?;
    }

    Ok(())
}

fn validate_changes(config: &Config) -> Result<()> {
    for (i, pattern) in config.changes.ignore.iter().enumerate() {
        check_glob(&format!("changes.ignore[{}]", i), pattern)?;
    }
    Ok(())
}

fn validate_git(config: &Config) -> Result<()> {
    if !config.git.commit_message.contains("{version}") {
        return Err(ConfigError::InvalidValue {
            field: "git.commit_message".to_string(),
            message: "must contain {version} placeholder".to_string(),
        }
        .into());
    }

    Ok(())
}

fn validate_publish(config: &Config) -> Result<()> {
    if config.publish.concurrency == 0 {
        return Err(ConfigError::InvalidValue {
            field: "publish.concurrency".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if let Some(access) = &config.publish.access {
        if Access::parse(access).is_none() {
            warn!(access = %access, "ignoring access level other than public or private");
        }
    }

    Ok(())
}

fn check_glob(field: &str, pattern: &str) -> Result<()> {
    glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("invalid glob '{}': {}", pattern, e),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_tag_format() {
        let mut config = Config::default();
        config.versioning.tag_format = "no-placeholder".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_commit_message_placeholder() {
        let mut config = Config::default();
        config.git.commit_message = "release".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.publish.concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_unknown_increment() {
        let mut config = Config::default();
        config.versioning.increment_by = Some("argle-bargle".to_string());
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.code(), "INVALID_INCREMENT_BY_VALUE");
    }

    #[test]
    fn test_validate_empty_src() {
        let mut config = Config::default();
        config.packages.src = String::new();
        assert!(validate_config(&config).is_err());

        config.packages.single = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_bad_ignore_glob() {
        let mut config = Config::default();
        config.changes.ignore = vec!["[unclosed".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unknown_access_is_not_an_error() {
        let mut config = Config::default();
        config.publish.access = Some("restricted".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
