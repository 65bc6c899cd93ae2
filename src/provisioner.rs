// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Declarative provisioner port and its Terraform CLI adapter

use crate::command::CommandRunner;
use crate::error::{Result, TeardownError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Persisted provisioner state a destroy runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateHandle {
    dir: PathBuf,
}

impl StateHandle {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl fmt::Display for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir.display())
    }
}

#[allow(async_fn_in_trait)]
pub trait Provisioner {
    /// `None` when nothing was ever provisioned from this working directory
    async fn state_handle(&self) -> Option<StateHandle>;

    async fn destroy(&self, handle: &StateHandle) -> Result<()>;
}

const STATE_MARKERS: &[&str] = &["terraform.tfstate", ".terraform"];

pub struct TerraformProvisioner<R> {
    state_dir: Option<PathBuf>,
    runner: R,
    timeout: Duration,
}

impl<R: CommandRunner> TerraformProvisioner<R> {
    pub fn new(state_dir: Option<PathBuf>, runner: R, timeout: Duration) -> Self {
        Self {
            state_dir,
            runner,
            timeout,
        }
    }
}

impl<R: CommandRunner> Provisioner for TerraformProvisioner<R> {
    async fn state_handle(&self) -> Option<StateHandle> {
        let dir = self.state_dir.as_ref()?;

        for marker in STATE_MARKERS {
            if tokio::fs::try_exists(dir.join(marker)).await.unwrap_or(false) {
                return Some(StateHandle::new(dir));
            }
        }

        debug!("No Terraform state found in {}", dir.display());
        None
    }

    #[instrument(skip(self), fields(state = %handle))]
    async fn destroy(&self, handle: &StateHandle) -> Result<()> {
        let args = vec![
            format!("-chdir={}", handle.dir().display()),
            "destroy".to_string(),
            "-auto-approve".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
        ];

        info!("Running terraform destroy in {}", handle);
        let output = self.runner.run("terraform", &args, self.timeout).await?;

        if output.success {
            info!("Terraform destroy completed");
            Ok(())
        } else {
            Err(TeardownError::CommandFailed(format!(
                "terraform destroy exited with {}: {}",
                output
                    .code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                error_summary(&output.stderr)
            )))
        }
    }
}

/// First `Error:` line of Terraform's diagnostics, or the first line at all
fn error_summary(stderr: &str) -> &str {
    let mut lines = stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.clone().next();
    lines
        .find(|l| l.starts_with("Error:"))
        .or(first)
        .unwrap_or("no error output")
}
