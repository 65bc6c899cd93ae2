// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! `aws` command construction and output parsing

use crate::cloud::cli::{args, items_at, str_at, CliDialect};
use crate::cloud::NameFilter;
use crate::error::{Result, TeardownError};
use crate::types::{
    DeploymentIdentity, ManagedServiceKind, ManagedServiceStatus, OrphanKind,
    OrphanResourceDescriptor,
};
use serde_json::Value;

pub struct AwsCli;

fn with_region(identity: &DeploymentIdentity, mut cmd: Vec<String>) -> Vec<String> {
    cmd.extend(args(&["--region", identity.location(), "--output", "json"]));
    cmd
}

fn name_tag_filter(fragment: &str) -> String {
    format!("Name=tag:Name,Values=*{}*", fragment)
}

fn name_tag(item: &Value) -> Option<&str> {
    item.get("Tags")?
        .as_array()?
        .iter()
        .find(|tag| str_at(tag, "/Key") == Some("Name"))
        .and_then(|tag| str_at(tag, "/Value"))
}

fn required<'a>(item: &'a Value, pointer: &str, kind: OrphanKind) -> Result<&'a str> {
    str_at(item, pointer).ok_or_else(|| {
        TeardownError::InvalidResponse(format!("{} entry without {}", kind, pointer))
    })
}

fn parse_item(
    kind: OrphanKind,
    identity: &DeploymentIdentity,
    item: &Value,
) -> Result<OrphanResourceDescriptor> {
    let (identifier, handle, in_use) = match kind {
        OrphanKind::Disk => {
            let id = required(item, "/VolumeId", kind)?;
            (
                name_tag(item).unwrap_or(id),
                id,
                str_at(item, "/State") == Some("in-use"),
            )
        }
        OrphanKind::PublicIp => {
            let id = required(item, "/AllocationId", kind)?;
            (
                name_tag(item).unwrap_or(id),
                id,
                item.get("AssociationId").is_some_and(|v| !v.is_null()),
            )
        }
        OrphanKind::ForwardingRule => (
            required(item, "/LoadBalancerName", kind)?,
            required(item, "/LoadBalancerArn", kind)?,
            false,
        ),
        OrphanKind::BackendService => (
            required(item, "/TargetGroupName", kind)?,
            required(item, "/TargetGroupArn", kind)?,
            false,
        ),
        OrphanKind::HealthCheck => {
            return Err(TeardownError::Unsupported(
                "health checks are part of AWS target groups".to_string(),
            ))
        }
    };

    Ok(OrphanResourceDescriptor {
        kind,
        identifier: identifier.to_string(),
        location: str_at(item, "/AvailabilityZone")
            .unwrap_or(identity.location())
            .to_string(),
        handle: handle.to_string(),
        in_use,
    })
}

impl CliDialect for AwsCli {
    fn program(&self) -> &'static str {
        "aws"
    }

    fn probe_args(&self, identity: &DeploymentIdentity) -> Vec<String> {
        with_region(identity, args(&["sts", "get-caller-identity"]))
    }

    fn check_probe(&self, identity: &DeploymentIdentity, output: &Value) -> Result<()> {
        match str_at(output, "/Account") {
            Some(account) if account == identity.account_or_project() => Ok(()),
            Some(account) => Err(TeardownError::Config(format!(
                "AWS credentials belong to account {}, expected {}",
                account,
                identity.account_or_project()
            ))),
            None => Err(TeardownError::InvalidResponse(
                "caller identity without an account".to_string(),
            )),
        }
    }

    fn list_args(
        &self,
        kind: OrphanKind,
        identity: &DeploymentIdentity,
        filter: &NameFilter,
    ) -> Vec<String> {
        let cmd = match kind {
            OrphanKind::Disk => args(&[
                "ec2",
                "describe-volumes",
                "--filters",
                &name_tag_filter(filter.fragment()),
            ]),
            OrphanKind::PublicIp => args(&[
                "ec2",
                "describe-addresses",
                "--filters",
                &name_tag_filter(filter.fragment()),
            ]),
            // No server-side name filter; the caller filters by name
            OrphanKind::ForwardingRule => args(&["elbv2", "describe-load-balancers"]),
            OrphanKind::BackendService | OrphanKind::HealthCheck => {
                args(&["elbv2", "describe-target-groups"])
            }
        };
        with_region(identity, cmd)
    }

    fn parse_list(
        &self,
        kind: OrphanKind,
        identity: &DeploymentIdentity,
        output: &Value,
    ) -> Result<Vec<OrphanResourceDescriptor>> {
        let pointer = match kind {
            OrphanKind::Disk => "/Volumes",
            OrphanKind::PublicIp => "/Addresses",
            OrphanKind::ForwardingRule => "/LoadBalancers",
            OrphanKind::BackendService | OrphanKind::HealthCheck => "/TargetGroups",
        };
        items_at(output, pointer)?
            .iter()
            .map(|item| parse_item(kind, identity, item))
            .collect()
    }

    fn delete_args(
        &self,
        resource: &OrphanResourceDescriptor,
        identity: &DeploymentIdentity,
    ) -> Vec<String> {
        let handle = resource.handle.as_str();
        let cmd = match resource.kind {
            OrphanKind::Disk => args(&["ec2", "delete-volume", "--volume-id", handle]),
            OrphanKind::PublicIp => args(&["ec2", "release-address", "--allocation-id", handle]),
            OrphanKind::ForwardingRule => args(&[
                "elbv2",
                "delete-load-balancer",
                "--load-balancer-arn",
                handle,
            ]),
            OrphanKind::BackendService | OrphanKind::HealthCheck => args(&[
                "elbv2",
                "delete-target-group",
                "--target-group-arn",
                handle,
            ]),
        };
        with_region(identity, cmd)
    }

    fn describe_args(
        &self,
        kind: ManagedServiceKind,
        name: &str,
        identity: &DeploymentIdentity,
    ) -> Vec<String> {
        let cmd = match kind {
            ManagedServiceKind::Cluster => args(&["eks", "describe-cluster", "--name", name]),
            ManagedServiceKind::Database => args(&[
                "rds",
                "describe-db-instances",
                "--db-instance-identifier",
                name,
            ]),
            ManagedServiceKind::Network => args(&[
                "ec2",
                "describe-vpcs",
                "--filters",
                &format!("Name=tag:Name,Values={}", name),
            ]),
        };
        with_region(identity, cmd)
    }

    fn parse_status(&self, kind: ManagedServiceKind, output: &Value) -> ManagedServiceStatus {
        let (list, field) = match kind {
            ManagedServiceKind::Cluster => {
                return match str_at(output, "/cluster/status") {
                    Some(status) => ManagedServiceStatus::Present(status.to_string()),
                    None => ManagedServiceStatus::Absent,
                }
            }
            ManagedServiceKind::Database => ("/DBInstances", "/DBInstanceStatus"),
            ManagedServiceKind::Network => ("/Vpcs", "/State"),
        };
        match output.pointer(list).and_then(Value::as_array).and_then(|l| l.first()) {
            Some(first) => ManagedServiceStatus::Present(
                str_at(first, field).unwrap_or("UNKNOWN").to_string(),
            ),
            None => ManagedServiceStatus::Absent,
        }
    }
}
