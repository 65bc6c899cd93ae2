// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! `gcloud` command construction and output parsing

use crate::cloud::cli::{args, items_at, status_at, str_at, CliDialect};
use crate::cloud::{last_segment, NameFilter};
use crate::error::{Result, TeardownError};
use crate::types::{
    DeploymentIdentity, ManagedServiceKind, ManagedServiceStatus, OrphanKind,
    OrphanResourceDescriptor,
};
use serde_json::Value;

pub struct Gcloud;

fn collection(kind: OrphanKind) -> &'static str {
    match kind {
        OrphanKind::Disk => "disks",
        OrphanKind::ForwardingRule => "forwarding-rules",
        OrphanKind::BackendService => "backend-services",
        OrphanKind::HealthCheck => "health-checks",
        OrphanKind::PublicIp => "addresses",
    }
}

/// `us-central1-a` is a zone, `us-central1` a region
fn is_zone(location: &str) -> bool {
    location
        .rsplit_once('-')
        .is_some_and(|(head, tail)| head.contains('-') && tail.len() == 1)
}

fn scope_flags(location: &str) -> Vec<String> {
    if location == "global" {
        args(&["--global"])
    } else if is_zone(location) {
        args(&["--zone", location])
    } else {
        args(&["--region", location])
    }
}

fn parse_item(kind: OrphanKind, item: &Value) -> Result<OrphanResourceDescriptor> {
    let name = str_at(item, "/name").ok_or_else(|| {
        TeardownError::InvalidResponse(format!("{} entry without a name", kind))
    })?;
    let location = str_at(item, "/zone")
        .or_else(|| str_at(item, "/region"))
        .map(last_segment)
        .unwrap_or("global");
    let in_use = match kind {
        OrphanKind::Disk => item
            .get("users")
            .and_then(Value::as_array)
            .is_some_and(|users| !users.is_empty()),
        OrphanKind::PublicIp => str_at(item, "/status") == Some("IN_USE"),
        _ => false,
    };

    Ok(OrphanResourceDescriptor {
        kind,
        identifier: name.to_string(),
        location: location.to_string(),
        handle: name.to_string(),
        in_use,
    })
}

impl CliDialect for Gcloud {
    fn program(&self) -> &'static str {
        "gcloud"
    }

    fn probe_args(&self, identity: &DeploymentIdentity) -> Vec<String> {
        args(&[
            "projects",
            "describe",
            identity.account_or_project(),
            "--format",
            "json",
        ])
    }

    fn list_args(
        &self,
        kind: OrphanKind,
        identity: &DeploymentIdentity,
        filter: &NameFilter,
    ) -> Vec<String> {
        args(&[
            "compute",
            collection(kind),
            "list",
            "--project",
            identity.account_or_project(),
            "--filter",
            &format!("name~{}", filter.fragment()),
            "--format",
            "json",
        ])
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
        identity: &DeploymentIdentity,
    ) -> Vec<String> {
        let mut cmd = args(&["compute", collection(resource.kind), "delete", &resource.handle]);
        cmd.extend(scope_flags(&resource.location));
        cmd.extend(args(&["--project", identity.account_or_project(), "--quiet"]));
        cmd
    }

    fn describe_args(
        &self,
        kind: ManagedServiceKind,
        name: &str,
        identity: &DeploymentIdentity,
    ) -> Vec<String> {
        let project = identity.account_or_project();
        match kind {
            ManagedServiceKind::Cluster => args(&[
                "container",
                "clusters",
                "describe",
                name,
                "--location",
                identity.location(),
                "--project",
                project,
                "--format",
                "json",
            ]),
            ManagedServiceKind::Database => args(&[
                "sql", "instances", "describe", name, "--project", project, "--format", "json",
            ]),
            ManagedServiceKind::Network => args(&[
                "compute", "networks", "describe", name, "--project", project, "--format", "json",
            ]),
        }
    }

    fn parse_status(&self, kind: ManagedServiceKind, output: &Value) -> ManagedServiceStatus {
        match kind {
            ManagedServiceKind::Cluster => status_at(output, "/status"),
            ManagedServiceKind::Database => status_at(output, "/state"),
            // VPC networks carry no lifecycle status
            ManagedServiceKind::Network if output.is_null() => ManagedServiceStatus::Absent,
            ManagedServiceKind::Network => ManagedServiceStatus::Present("EXISTS".to_string()),
        }
    }
}
