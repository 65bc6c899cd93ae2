// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sequences the teardown phases behind an operator confirmation.

use crate::cloud::CloudApi;
use crate::config::Config;
use crate::error::{Result, TeardownError};
use crate::kubernetes::ClusterApi;
use crate::phases::{
    ClusterResourceSweeper, CloudOrphanReconciler, DeclarativeDestroyRunner, DestroyStep,
    PostDestroyVerifier, SweepSummary,
};
use crate::provisioner::Provisioner;
use crate::types::{RunReport, RunState};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, instrument, warn};

/// Where the operator's confirmation text comes from
#[allow(async_fn_in_trait)]
pub trait ConfirmationSource {
    async fn read_confirmation(&self, prompt: &str) -> Result<String>;
}

/// Prompts on stderr and reads one line from stdin
pub struct StdinConfirmation;

impl ConfirmationSource for StdinConfirmation {
    async fn read_confirmation(&self, prompt: &str) -> Result<String> {
        let prompt_error =
            |e: std::io::Error| TeardownError::Config(format!("Failed to write prompt: {}", e));
        let mut stderr = tokio::io::stderr();
        stderr.write_all(prompt.as_bytes()).await.map_err(prompt_error)?;
        stderr.flush().await.map_err(prompt_error)?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| TeardownError::Config(format!("Failed to read confirmation: {}", e)))?;
        Ok(line)
    }
}

/// Confirmation text supplied up front, e.g. through `--confirm`
pub struct FixedConfirmation(pub String);

impl ConfirmationSource for FixedConfirmation {
    async fn read_confirmation(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    Cancelled(RunReport),
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Cancelled(report) => report,
        }
    }
}

pub struct Orchestrator<'a, C, A, P> {
    config: &'a Config,
    cluster: &'a C,
    cloud: &'a A,
    provisioner: &'a P,
}

impl<'a, C: ClusterApi, A: CloudApi, P: Provisioner> Orchestrator<'a, C, A, P> {
    pub fn new(config: &'a Config, cluster: &'a C, cloud: &'a A, provisioner: &'a P) -> Self {
        Self {
            config,
            cluster,
            cloud,
            provisioner,
        }
    }

    /// Run every phase in order. Nothing is called on any port before the
    /// confirmation matches the cluster name, unless `force` is set.
    #[instrument(skip(self, confirmation), fields(cluster = %self.config.identity))]
    pub async fn run(&self, confirmation: &impl ConfirmationSource, force: bool) -> RunOutcome {
        let identity = &self.config.identity;
        let mut report = RunReport::new(identity.clone());

        report.enter(RunState::Confirming);
        if force {
            info!("Confirmation skipped (--force)");
        } else if let Err(e) = self.confirm(confirmation).await {
            warn!("{}, nothing was deleted", e);
            report.enter(RunState::Cancelled);
            return RunOutcome::Cancelled(report);
        }

        let sweeper = ClusterResourceSweeper::new(self.cluster, &self.config.timings);

        report.enter(RunState::Sweeping);
        let summary = sweeper.sweep().await;
        record_sweep(&mut report, &summary, None);

        report.enter(RunState::Destroying);
        let runner = DeclarativeDestroyRunner::new(self.provisioner);
        match runner.run().await {
            DestroyStep::Completed(attempt) => report.record_attempt(attempt),
            DestroyStep::NeedsResweep { handle, error } => {
                info!("Resweeping cluster objects before retrying the destroy");
                let summary = sweeper.sweep().await;
                record_sweep(&mut report, &summary, Some("resweep"));

                let attempt = runner.retry(&handle, &error).await;
                if !attempt.succeeded {
                    report.destroy_terminal_failure = true;
                    report.add_followup(format!(
                        "Declarative destroy failed twice; inspect and re-run it manually in {}: {}",
                        handle,
                        attempt.error_detail.as_deref().unwrap_or("unknown error")
                    ));
                }
                report.record_attempt(attempt);
            }
        }

        report.enter(RunState::Reconciling);
        let outcome = CloudOrphanReconciler::new(
            self.cloud,
            identity,
            &self.config.timings,
            self.config.unreachable_cloud,
        )
        .reconcile()
        .await;
        for attempt in outcome.attempts {
            report.record_attempt(attempt);
        }
        for followup in outcome.followups {
            report.add_followup(followup);
        }

        report.enter(RunState::Verifying);
        let findings = PostDestroyVerifier::new(
            self.cluster,
            self.cloud,
            identity,
            &self.config.database_name,
            &self.config.network_name,
            &self.config.timings,
            self.config.unreachable_cloud,
        )
        .verify()
        .await;
        for finding in findings {
            report.record_finding(finding);
        }

        report.enter(RunState::Done);
        if report.is_clean() {
            info!("Teardown of {} complete", identity);
        } else {
            warn!(
                "Teardown of {} incomplete, {} follow-ups",
                identity,
                report.manual_followups.len()
            );
        }
        RunOutcome::Completed(report)
    }

    /// The typed text must equal the cluster name exactly, bar the line ending
    async fn confirm(&self, confirmation: &impl ConfirmationSource) -> Result<()> {
        let expected = self.config.identity.cluster_name();
        let prompt = format!(
            "This permanently deletes {}.\nType the cluster name to continue: ",
            self.config.identity
        );

        let text = confirmation.read_confirmation(&prompt).await.map_err(|e| {
            warn!("No confirmation received: {}", e);
            TeardownError::ConfirmationDeclined
        })?;
        if text.trim_end_matches(['\r', '\n']) == expected {
            Ok(())
        } else {
            Err(TeardownError::ConfirmationDeclined)
        }
    }
}

fn record_sweep(report: &mut RunReport, summary: &SweepSummary, subject: Option<&str>) {
    let attempt = summary.to_attempt();
    report.record_attempt(match subject {
        Some(subject) => attempt.with_subject(subject),
        None => attempt,
    });
    for failure in &summary.failures {
        report.add_followup(format!("Remove cluster object manually: {}", failure));
    }
}
