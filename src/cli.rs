// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Command-line arguments

use crate::config::UnreachableCloudPolicy;
use crate::types::Provider;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Tear down a cluster-based ML platform deployment and its cloud leftovers
#[derive(Parser, Debug, Default)]
#[command(name = "teardown", version)]
pub struct Cli {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub force: bool,

    /// Confirmation text, instead of prompting on stdin (must equal the cluster name)
    #[arg(long, value_name = "TEXT")]
    pub confirm: Option<String>,

    /// YAML file with defaults for any of the options below
    #[arg(long, env = "TEARDOWN_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "TEARDOWN_CLUSTER_NAME")]
    pub cluster_name: Option<String>,

    /// GCP project, AWS account or Azure resource group
    #[arg(long, env = "TEARDOWN_PROJECT")]
    pub project: Option<String>,

    /// Region or zone
    #[arg(long, env = "TEARDOWN_LOCATION")]
    pub location: Option<String>,

    #[arg(long, value_enum, env = "TEARDOWN_PROVIDER")]
    pub provider: Option<Provider>,

    /// Terraform working directory holding the deployment state
    #[arg(long, env = "TEARDOWN_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    #[arg(long, env = "TEARDOWN_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, env = "TEARDOWN_KUBE_CONTEXT")]
    pub context: Option<String>,

    /// Managed database instance checked after teardown [default: <cluster>-db]
    #[arg(long, env = "TEARDOWN_DATABASE_NAME")]
    pub database_name: Option<String>,

    /// Network checked after teardown [default: <cluster>-network]
    #[arg(long, env = "TEARDOWN_NETWORK_NAME")]
    pub network_name: Option<String>,

    /// How to treat an unreachable cloud API
    #[arg(long, value_enum, env = "TEARDOWN_UNREACHABLE_CLOUD")]
    pub unreachable_cloud: Option<UnreachableCloudPolicy>,

    /// Per-call timeout for cluster and cloud API calls
    #[arg(long, env = "TEARDOWN_CALL_TIMEOUT_SECS")]
    pub call_timeout_secs: Option<u64>,

    /// Pause after the cluster sweep
    #[arg(long, env = "TEARDOWN_SETTLE_DELAY_SECS")]
    pub settle_delay_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output: OutputFormat,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "TEARDOWN_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
