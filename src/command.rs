// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! External process execution with a hard timeout

use crate::error::{Result, TeardownError};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Abstracts process execution so the vendor CLIs can be swapped or stubbed.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, program: &str, args: &[String], timeout: Duration)
        -> Result<CommandOutput>;
}

/// Runs commands through tokio and kills them when the timeout fires
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        debug!("Running {} {}", program, args.join(" "));

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    TeardownError::Unreachable(format!("{} is not installed or not on PATH", program))
                }
                _ => TeardownError::CommandFailed(format!("failed to spawn {}: {}", program, e)),
            })?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                let status = status.map_err(|e| {
                    TeardownError::CommandFailed(format!("waiting for {}: {}", program, e))
                })?;
                Ok(CommandOutput {
                    success: status.success(),
                    code: status.code(),
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                Err(TeardownError::Timeout {
                    operation: program.to_string(),
                    after: timeout,
                })
            }
        }
    }
}
