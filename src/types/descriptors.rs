// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use serde::Serialize;
use std::fmt;

/// Cluster object categories known to block namespace or cluster deletion.
///
/// Declaration order is the sweep priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockingKind {
    Webhook,
    PolicyObject,
    FinalizerHeldNamespace,
    ScaledObject,
    LoadBalancerService,
}

impl BlockingKind {
    pub const SWEEP_ORDER: [BlockingKind; 5] = [
        BlockingKind::Webhook,
        BlockingKind::PolicyObject,
        BlockingKind::FinalizerHeldNamespace,
        BlockingKind::ScaledObject,
        BlockingKind::LoadBalancerService,
    ];
}

impl fmt::Display for BlockingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockingKind::Webhook => "webhook",
            BlockingKind::PolicyObject => "policy object",
            BlockingKind::FinalizerHeldNamespace => "namespace",
            BlockingKind::ScaledObject => "scaled object",
            BlockingKind::LoadBalancerService => "load balancer service",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingResourceDescriptor {
    pub kind: BlockingKind,
    /// Concrete Kubernetes kind, e.g. `ValidatingWebhookConfiguration`
    pub api_kind: String,
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl BlockingResourceDescriptor {
    pub fn cluster_scoped(kind: BlockingKind, api_kind: &str, identifier: &str) -> Self {
        Self {
            kind,
            api_kind: api_kind.to_string(),
            identifier: identifier.to_string(),
            namespace: None,
        }
    }

    pub fn namespaced(kind: BlockingKind, api_kind: &str, namespace: &str, identifier: &str) -> Self {
        Self {
            kind,
            api_kind: api_kind.to_string(),
            identifier: identifier.to_string(),
            namespace: Some(namespace.to_string()),
        }
    }
}

impl fmt::Display for BlockingResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.api_kind, ns, self.identifier),
            None => write!(f, "{} {}", self.api_kind, self.identifier),
        }
    }
}

/// Phase reported by the namespace status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NamespacePhase {
    Active,
    Terminating,
}

/// Cloud resources created indirectly by cluster controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrphanKind {
    Disk,
    ForwardingRule,
    BackendService,
    HealthCheck,
    #[serde(rename = "publicIP")]
    PublicIp,
}

impl OrphanKind {
    /// Deletion stages; kinds within a stage are independent of each other.
    /// A forwarding rule references a backend service and an address, and a
    /// backend service references a health check.
    pub const STAGES: [&'static [OrphanKind]; 3] = [
        &[OrphanKind::ForwardingRule, OrphanKind::Disk],
        &[OrphanKind::BackendService, OrphanKind::PublicIp],
        &[OrphanKind::HealthCheck],
    ];
}

impl fmt::Display for OrphanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrphanKind::Disk => "disk",
            OrphanKind::ForwardingRule => "forwarding rule",
            OrphanKind::BackendService => "backend service",
            OrphanKind::HealthCheck => "health check",
            OrphanKind::PublicIp => "public IP",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanResourceDescriptor {
    pub kind: OrphanKind,
    /// Human-readable name checked against the cluster name
    pub identifier: String,
    /// Zone, region or `global`
    pub location: String,
    /// Provider-side handle used for deletion (name, id or ARN)
    pub handle: String,
    /// Attached disk or associated address
    pub in_use: bool,
}

impl fmt::Display for OrphanResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.identifier, self.location)
    }
}

/// Principal managed resources re-checked after teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ManagedServiceKind {
    Cluster,
    Database,
    Network,
}

impl fmt::Display for ManagedServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ManagedServiceKind::Cluster => "cluster",
            ManagedServiceKind::Database => "database",
            ManagedServiceKind::Network => "network",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedServiceStatus {
    Absent,
    /// Raw provider status string
    Present(String),
}

/// Result of an idempotent deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}
