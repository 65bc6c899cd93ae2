// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! `az` command construction and output parsing.
//!
//! Disks and public IPs created by AKS live in the node resource group
//! `MC_<group>_<cluster>_<location>`, so the full ARM id always carries the
//! cluster name and serves as the identifier.

use crate::cloud::cli::{args, items_at, status_at, str_at, CliDialect};
use crate::cloud::NameFilter;
use crate::error::{Result, TeardownError};
use crate::types::{
    DeploymentIdentity, ManagedServiceKind, ManagedServiceStatus, OrphanKind,
    OrphanResourceDescriptor,
};
use serde_json::Value;

pub struct AzureCli;

pub fn node_resource_group(identity: &DeploymentIdentity) -> String {
    format!(
        "MC_{}_{}_{}",
        identity.account_or_project(),
        identity.cluster_name(),
        identity.location()
    )
}

fn parse_item(kind: OrphanKind, item: &Value) -> Result<OrphanResourceDescriptor> {
    let id = str_at(item, "/id").ok_or_else(|| {
        TeardownError::InvalidResponse(format!("{} entry without an id", kind))
    })?;
    let in_use = match kind {
        OrphanKind::Disk => str_at(item, "/diskState").is_some_and(|s| s != "Unattached"),
        OrphanKind::PublicIp => item.get("ipConfiguration").is_some_and(|v| !v.is_null()),
        _ => false,
    };

    Ok(OrphanResourceDescriptor {
        kind,
        identifier: id.to_string(),
        location: str_at(item, "/location").unwrap_or("global").to_string(),
        handle: id.to_string(),
        in_use,
    })
}

impl CliDialect for AzureCli {
    fn program(&self) -> &'static str {
        "az"
    }

    fn probe_args(&self, identity: &DeploymentIdentity) -> Vec<String> {
        args(&[
            "group",
            "show",
            "--name",
            identity.account_or_project(),
            "--output",
            "json",
        ])
    }

    fn list_args(
        &self,
        kind: OrphanKind,
        identity: &DeploymentIdentity,
        _filter: &NameFilter,
    ) -> Vec<String> {
        let group = node_resource_group(identity);
        let mut cmd = match kind {
            OrphanKind::PublicIp => args(&["network", "public-ip", "list"]),
            _ => args(&["disk", "list"]),
        };
        cmd.extend(args(&["--resource-group", &group, "--output", "json"]));
        cmd
    }

    fn parse_list(
        &self,
        kind: OrphanKind,
        _identity: &DeploymentIdentity,
        output: &Value,
    ) -> Result<Vec<OrphanResourceDescriptor>> {
        items_at(output, "")?
            .iter()
            .map(|item| parse_item(kind, item))
            .collect()
    }

    fn delete_args(
        &self,
        resource: &OrphanResourceDescriptor,
        _identity: &DeploymentIdentity,
    ) -> Vec<String> {
        match resource.kind {
            OrphanKind::PublicIp => {
                args(&["network", "public-ip", "delete", "--ids", &resource.handle])
            }
            _ => args(&["disk", "delete", "--ids", &resource.handle, "--yes"]),
        }
    }

    fn describe_args(
        &self,
        kind: ManagedServiceKind,
        name: &str,
        identity: &DeploymentIdentity,
    ) -> Vec<String> {
        let mut cmd = match kind {
            ManagedServiceKind::Cluster => args(&["aks", "show"]),
            ManagedServiceKind::Database => args(&["postgres", "flexible-server", "show"]),
            ManagedServiceKind::Network => args(&["network", "vnet", "show"]),
        };
        cmd.extend(args(&[
            "--resource-group",
            identity.account_or_project(),
            "--name",
            name,
            "--output",
            "json",
        ]));
        cmd
    }

    fn parse_status(&self, kind: ManagedServiceKind, output: &Value) -> ManagedServiceStatus {
        match kind {
            ManagedServiceKind::Database => status_at(output, "/state"),
            _ => status_at(output, "/provisioningState"),
        }
    }
}
