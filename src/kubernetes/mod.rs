// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster API port and its kube-backed adapter.

pub mod client;
pub mod namespaces;
pub mod resources;

pub use client::{create_client, KubeClusterApi};

use crate::constants::blocking::{DATA_BEARING_KINDS, PROTECTED_NAMESPACES};
use crate::error::Result;
use crate::types::{BlockingKind, BlockingResourceDescriptor, DeleteOutcome, NamespacePhase};

/// Narrow view of the cluster API used by the sweeper and the verifier.
///
/// Implementations report "not found" on delete as `DeleteOutcome::NotFound`
/// rather than an error.
#[allow(async_fn_in_trait)]
pub trait ClusterApi {
    /// Cheap reachability check against the API server
    async fn probe(&self) -> Result<()>;

    async fn list_resources(
        &self,
        kind: BlockingKind,
        selector: &Selector,
    ) -> Result<Vec<BlockingResourceDescriptor>>;

    async fn delete_resource(&self, resource: &BlockingResourceDescriptor)
        -> Result<DeleteOutcome>;

    /// `None` when the namespace does not exist
    async fn namespace_phase(&self, name: &str) -> Result<Option<NamespacePhase>>;

    async fn clear_finalizers(&self, namespace: &str) -> Result<()>;
}

/// Name-based narrowing applied on top of a resource kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    /// Exact names; takes precedence over `name_contains`
    pub names: Vec<String>,
    /// Any of these fragments must appear in the name
    pub name_contains: Vec<String>,
}

impl Selector {
    /// Every object of the kind
    pub fn all() -> Self {
        Self::default()
    }

    pub fn named(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|s| s.to_string()).collect(),
            name_contains: Vec::new(),
        }
    }

    pub fn containing(fragments: &[&str]) -> Self {
        Self {
            names: Vec::new(),
            name_contains: fragments.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        if !self.names.is_empty() {
            return self.names.iter().any(|n| n == name);
        }
        if !self.name_contains.is_empty() {
            return self.name_contains.iter().any(|f| name.contains(f.as_str()));
        }
        true
    }
}

/// Whether the sweeper may delete this object at all.
///
/// Data-bearing kinds and system namespaces are never eligible.
pub fn is_sweepable(resource: &BlockingResourceDescriptor) -> bool {
    if DATA_BEARING_KINDS.contains(&resource.api_kind.as_str()) {
        return false;
    }
    // Load balancers in system namespaces still hold cloud resources
    if resource.kind == BlockingKind::LoadBalancerService {
        return true;
    }
    let namespace = match resource.kind {
        BlockingKind::FinalizerHeldNamespace => Some(resource.identifier.as_str()),
        _ => resource.namespace.as_deref(),
    };
    !namespace.is_some_and(|ns| PROTECTED_NAMESPACES.contains(&ns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_all_matches_everything() {
        assert!(Selector::all().matches("anything"));
    }

    #[test]
    fn test_selector_named_is_exact() {
        let s = Selector::named(&["kyverno"]);
        assert!(s.matches("kyverno"));
        assert!(!s.matches("kyverno-old"));
    }

    #[test]
    fn test_selector_containing() {
        let s = Selector::containing(&["kyverno", "tetragon"]);
        assert!(s.matches("kyverno-resource-validating-webhook-cfg"));
        assert!(s.matches("tetragon-mutating"));
        assert!(!s.matches("cert-manager-webhook"));
    }

    #[test]
    fn test_protected_namespace_is_not_sweepable() {
        let ns = BlockingResourceDescriptor::cluster_scoped(
            BlockingKind::FinalizerHeldNamespace,
            "Namespace",
            "kube-system",
        );
        assert!(!is_sweepable(&ns));
    }

    #[test]
    fn test_data_bearing_kind_is_not_sweepable() {
        let pvc = BlockingResourceDescriptor::namespaced(
            BlockingKind::ScaledObject,
            "PersistentVolumeClaim",
            "mlflow",
            "data-postgres-0",
        );
        assert!(!is_sweepable(&pvc));
    }

    #[test]
    fn test_load_balancer_service_in_system_namespace_is_sweepable() {
        let svc = BlockingResourceDescriptor::namespaced(
            BlockingKind::LoadBalancerService,
            "Service",
            "kube-system",
            "ingress-lb",
        );
        assert!(is_sweepable(&svc));
    }

    #[test]
    fn test_component_namespace_is_sweepable() {
        let ns = BlockingResourceDescriptor::cluster_scoped(
            BlockingKind::FinalizerHeldNamespace,
            "Namespace",
            "kyverno",
        );
        assert!(is_sweepable(&ns));
    }
}
