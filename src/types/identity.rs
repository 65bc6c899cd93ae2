// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{Result, TeardownError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cloud backend hosting the deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gcp,
    Aws,
    Azure,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provider::Gcp => "gcp",
            Provider::Aws => "aws",
            Provider::Azure => "azure",
        };
        f.write_str(s)
    }
}

/// Identifying fields that scope every destructive call of a run.
///
/// Built once from configuration and shared read-only by all phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentIdentity {
    cluster_name: String,
    account_or_project: String,
    location: String,
    provider: Provider,
}

impl DeploymentIdentity {
    pub fn new(
        cluster_name: impl Into<String>,
        account_or_project: impl Into<String>,
        location: impl Into<String>,
        provider: Provider,
    ) -> Result<Self> {
        let cluster_name = cluster_name.into().trim().to_string();
        let account_or_project = account_or_project.into().trim().to_string();
        let location = location.into().trim().to_string();

        // An empty name is contained in every identifier
        if cluster_name.is_empty() {
            return Err(TeardownError::Config(
                "cluster name must not be empty".to_string(),
            ));
        }
        if !cluster_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TeardownError::Config(format!(
                "cluster name '{}' may only contain letters, digits, '-' and '_'",
                cluster_name
            )));
        }
        if account_or_project.is_empty() {
            return Err(TeardownError::Config(
                "account/project must not be empty".to_string(),
            ));
        }
        if location.is_empty() {
            return Err(TeardownError::Config(
                "region/zone must not be empty".to_string(),
            ));
        }

        Ok(Self {
            cluster_name,
            account_or_project,
            location,
            provider,
        })
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn account_or_project(&self) -> &str {
        &self.account_or_project
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Whether an identifier falls inside this deployment's blast radius
    pub fn owns(&self, identifier: &str) -> bool {
        identifier.contains(&self.cluster_name)
    }
}

impl fmt::Display for DeploymentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{}/{})",
            self.cluster_name, self.provider, self.account_or_project, self.location
        )
    }
}
