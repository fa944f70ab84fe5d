//! npm registry publisher

use std::path::Path;
use std::process::Command;

use tracing::{debug, info, instrument};

use lockstep_core::error::{PublishError, Result};
use lockstep_core::monorepo::RegistryOptions;
use lockstep_core::traits::RegistryPublisher;

/// Runs `npm publish` in a package directory
#[derive(Debug, Clone)]
pub struct NpmPublisher {
    program: String,
}

impl NpmPublisher {
    /// Publisher using `npm` from `PATH`
    pub fn new() -> Self {
        Self {
            program: "npm".to_string(),
        }
    }

    /// Publisher using another npm-compatible executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one publish: `publish [--tag X] [--otp X] [--access X]`
    pub fn args(options: &RegistryOptions) -> Vec<String> {
        let mut args = vec!["publish".to_string()];
        if let Some(tag) = &options.tag {
            args.push("--tag".to_string());
            args.push(tag.clone());
        }
        if let Some(otp) = &options.otp {
            args.push("--otp".to_string());
            args.push(otp.clone());
        }
        if let Some(access) = &options.access {
            args.push("--access".to_string());
            args.push(access.to_string());
        }
        args
    }

    /// The full command line, e.g. `npm publish --tag next`
    pub fn command_line(&self, options: &RegistryOptions) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(Self::args(options));
        parts.join(" ")
    }
}

impl Default for NpmPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryPublisher for NpmPublisher {
    #[instrument(skip(self, options), fields(path = %path.display()))]
    fn publish(&self, path: &Path, options: &RegistryOptions) -> Result<()> {
        let start = std::time::Instant::now();
        let command = self.command_line(options);
        debug!(command = %redact_otp(&command, options), "running publish command");

        let output = Command::new(&self.program)
            .args(Self::args(options))
            .current_dir(path)
            .output()
            .map_err(|e| PublishError::CommandFailed {
                command: redact_otp(&command, options),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(PublishError::Failed {
                package: path.display().to_string(),
                reason,
            }
            .into());
        }

        info!(
            path = %path.display(),
            duration_ms = start.elapsed().as_millis(),
            "npm publish finished"
        );
        Ok(())
    }

    fn describe(&self, options: &RegistryOptions) -> String {
        redact_otp(&self.command_line(options), options)
    }
}

/// Hide the one-time password in anything that gets logged or displayed
fn redact_otp(command: &str, options: &RegistryOptions) -> String {
    match &options.otp {
        Some(otp) => command.replace(&format!("--otp {}", otp), "--otp ******"),
        None => command.to_string(),
    }
}
