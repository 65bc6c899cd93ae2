// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::cli::Cli;
use crate::constants::timing;
use crate::types::{DeploymentIdentity, Provider};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What an unreachable cloud API means for the reconcile and verify phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnreachableCloudPolicy {
    /// Record every cloud-facing step as failed
    #[default]
    Fatal,
    /// Treat the cloud side as already torn down
    AssumeGone,
}

/// Delays and timeouts used across the phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    pub call_timeout: Duration,
    pub transient_attempts: u32,
    pub transient_backoff: Duration,
    pub namespace_wait: Duration,
    pub namespace_poll: Duration,
    pub settle_delay: Duration,
    pub destroy_timeout: Duration,
    pub in_use_polls: u32,
    pub in_use_poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(timing::CALL_TIMEOUT_SECS),
            transient_attempts: timing::TRANSIENT_ATTEMPTS,
            transient_backoff: Duration::from_secs(timing::TRANSIENT_BACKOFF_SECS),
            namespace_wait: Duration::from_secs(timing::NAMESPACE_WAIT_SECS),
            namespace_poll: Duration::from_secs(timing::NAMESPACE_POLL_SECS),
            settle_delay: Duration::from_secs(timing::SETTLE_DELAY_SECS),
            destroy_timeout: Duration::from_secs(timing::DESTROY_TIMEOUT_SECS),
            in_use_polls: timing::IN_USE_POLLS,
            in_use_poll_interval: Duration::from_secs(timing::IN_USE_POLL_SECS),
        }
    }
}

/// Run configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub identity: DeploymentIdentity,
    /// Terraform working directory; `None` makes the destroy phase a no-op
    pub state_dir: Option<PathBuf>,
    pub kubeconfig: Option<PathBuf>,
    pub kube_context: Option<String>,
    pub database_name: String,
    pub network_name: String,
    pub unreachable_cloud: UnreachableCloudPolicy,
    pub timings: Timings,
}

/// Optional YAML file; every field can be overridden by environment or flags
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FileConfig {
    cluster_name: Option<String>,
    project: Option<String>,
    location: Option<String>,
    provider: Option<Provider>,
    state_dir: Option<PathBuf>,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
    database_name: Option<String>,
    network_name: Option<String>,
    unreachable_cloud: Option<UnreachableCloudPolicy>,
    call_timeout_secs: Option<u64>,
    settle_delay_secs: Option<u64>,
    namespace_wait_secs: Option<u64>,
    destroy_timeout_secs: Option<u64>,
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

impl Config {
    /// Merge the config file (if any) with flags and environment, flags winning
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };

        let cluster_name = cli
            .cluster_name
            .clone()
            .or(file.cluster_name)
            .context("cluster name not set (--cluster-name or TEARDOWN_CLUSTER_NAME)")?;
        let project = cli
            .project
            .clone()
            .or(file.project)
            .context("project/account not set (--project or TEARDOWN_PROJECT)")?;
        let location = cli
            .location
            .clone()
            .or(file.location)
            .context("region/zone not set (--location or TEARDOWN_LOCATION)")?;
        let provider = cli
            .provider
            .or(file.provider)
            .context("provider not set (--provider or TEARDOWN_PROVIDER)")?;

        let identity = DeploymentIdentity::new(cluster_name, project, location, provider)
            .context("Invalid deployment identity")?;

        let mut timings = Timings::default();
        if let Some(secs) = cli.call_timeout_secs.or(file.call_timeout_secs) {
            timings.call_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = cli.settle_delay_secs.or(file.settle_delay_secs) {
            timings.settle_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = file.namespace_wait_secs {
            timings.namespace_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = file.destroy_timeout_secs {
            timings.destroy_timeout = Duration::from_secs(secs);
        }
        if timings.call_timeout.is_zero() {
            anyhow::bail!("call timeout must be greater than zero");
        }

        let database_name = cli
            .database_name
            .clone()
            .or(file.database_name)
            .unwrap_or_else(|| format!("{}-db", identity.cluster_name()));
        let network_name = cli
            .network_name
            .clone()
            .or(file.network_name)
            .unwrap_or_else(|| format!("{}-network", identity.cluster_name()));

        Ok(Config {
            identity,
            state_dir: cli.state_dir.clone().or(file.state_dir),
            kubeconfig: cli.kubeconfig.clone().or(file.kubeconfig),
            kube_context: cli.context.clone().or(file.context),
            database_name,
            network_name,
            unreachable_cloud: cli
                .unreachable_cloud
                .or(file.unreachable_cloud)
                .unwrap_or_default(),
            timings,
        })
    }
}
