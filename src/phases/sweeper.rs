// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Best-effort removal of cluster objects that block namespace or cluster deletion

use crate::calls::{guarded, CallPolicy};
use crate::config::Timings;
use crate::constants::blocking::{COMPONENT_NAMESPACES, WEBHOOK_OWNERS};
use crate::error::{ErrorClass, Result, TeardownError};
use crate::kubernetes::{is_sweepable, ClusterApi, Selector};
use crate::types::{
    BlockingKind, BlockingResourceDescriptor, DeleteOutcome, DestroyAttemptResult,
    NamespacePhase, Phase,
};
use futures::future::join_all;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

/// What one sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub deleted: Vec<String>,
    pub already_absent: Vec<String>,
    pub finalizers_cleared: Vec<String>,
    pub failures: Vec<String>,
    pub cluster_unreachable: bool,
}

impl SweepSummary {
    pub fn to_attempt(&self) -> DestroyAttemptResult {
        if self.cluster_unreachable {
            DestroyAttemptResult::ok(Phase::Sweep)
                .with_note("cluster API unreachable, nothing swept")
        } else if self.failures.is_empty() {
            DestroyAttemptResult::ok(Phase::Sweep)
        } else {
            DestroyAttemptResult::failed(Phase::Sweep, self.failures.join("; "))
        }
    }
}

enum Removal {
    Deleted,
    /// Namespace deletion is underway but held by finalizers
    Terminating,
    AlreadyAbsent,
}

pub struct ClusterResourceSweeper<'a, C> {
    cluster: &'a C,
    policy: CallPolicy,
    timings: Timings,
}

impl<'a, C: ClusterApi> ClusterResourceSweeper<'a, C> {
    pub fn new(cluster: &'a C, timings: &Timings) -> Self {
        Self {
            cluster,
            policy: CallPolicy::from_timings(timings),
            timings: timings.clone(),
        }
    }

    /// Sweep every blocking kind in priority order.
    ///
    /// Never fails: problems are collected in the summary.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> SweepSummary {
        let mut summary = SweepSummary::default();

        match guarded(&self.policy, "probe cluster API", || self.cluster.probe()).await {
            Err(e) if e.is_unreachable() => {
                warn!("Cluster API unreachable, skipping sweep: {}", e);
                summary.cluster_unreachable = true;
                return summary;
            }
            Err(e) => warn!("Cluster probe failed, sweeping anyway: {}", e),
            Ok(()) => {}
        }

        for kind in BlockingKind::SWEEP_ORDER {
            self.sweep_kind(kind, &mut summary).await;
        }

        if !self.timings.settle_delay.is_zero() {
            info!(
                "Waiting {:?} for the control plane to settle",
                self.timings.settle_delay
            );
            sleep(self.timings.settle_delay).await;
        }

        info!(
            "Sweep finished: {} deleted, {} already absent, {} finalizers cleared, {} failures",
            summary.deleted.len(),
            summary.already_absent.len(),
            summary.finalizers_cleared.len(),
            summary.failures.len()
        );
        summary
    }

    async fn sweep_kind(&self, kind: BlockingKind, summary: &mut SweepSummary) {
        let operation = format!("list {}s", kind);
        let selector = selector_for(kind);

        let listed = match guarded(&self.policy, &operation, || {
            self.cluster.list_resources(kind, &selector)
        })
        .await
        {
            Ok(listed) => listed,
            Err(e) if e.is_not_found() => {
                debug!("No {} API in this cluster", kind);
                return;
            }
            Err(e) => {
                warn!("Failed to {}: {}", operation, e);
                summary.failures.push(format!("{}: {}", operation, e.detail()));
                return;
            }
        };

        let targets: Vec<BlockingResourceDescriptor> = listed
            .into_iter()
            .filter(|resource| {
                let sweepable = is_sweepable(resource);
                if !sweepable {
                    warn!("Refusing to delete {}", resource);
                }
                sweepable
            })
            .collect();

        if targets.is_empty() {
            debug!("No {}s to sweep", kind);
            return;
        }

        let results = join_all(targets.iter().map(|resource| self.remove(resource))).await;

        let mut pending_namespaces = Vec::new();
        for (resource, result) in targets.iter().zip(results) {
            match result {
                Ok(Removal::Deleted) => {
                    summary.deleted.push(resource.to_string());
                    if kind == BlockingKind::FinalizerHeldNamespace {
                        pending_namespaces.push(resource.identifier.as_str());
                    }
                }
                Ok(Removal::Terminating) => pending_namespaces.push(resource.identifier.as_str()),
                Ok(Removal::AlreadyAbsent) => summary.already_absent.push(resource.to_string()),
                Err(e) => {
                    warn!("Failed to delete {}: {}", resource, e);
                    summary.failures.push(format!("{}: {}", resource, e.detail()));
                }
            }
        }

        let waits = join_all(pending_namespaces.iter().map(|ns| self.await_namespace(ns))).await;
        for (namespace, result) in pending_namespaces.iter().zip(waits) {
            match result {
                Ok(true) => summary.finalizers_cleared.push(namespace.to_string()),
                Ok(false) => {}
                Err(e) => {
                    warn!("Namespace {} did not terminate: {}", namespace, e);
                    summary
                        .failures
                        .push(format!("Namespace {}: {}", namespace, e.detail()));
                }
            }
        }
    }

    async fn remove(&self, resource: &BlockingResourceDescriptor) -> Result<Removal> {
        if resource.kind == BlockingKind::FinalizerHeldNamespace {
            return self.remove_namespace(resource).await;
        }
        Ok(match self.delete(resource).await? {
            DeleteOutcome::Deleted => Removal::Deleted,
            DeleteOutcome::NotFound => Removal::AlreadyAbsent,
        })
    }

    /// The API server refuses to delete a namespace that is already
    /// terminating (409), so those go straight to the finalizer wait.
    async fn remove_namespace(&self, resource: &BlockingResourceDescriptor) -> Result<Removal> {
        let name = resource.identifier.as_str();
        let operation = format!("read namespace {}", name);

        match guarded(&self.policy, &operation, || self.cluster.namespace_phase(name)).await? {
            None => return Ok(Removal::AlreadyAbsent),
            Some(NamespacePhase::Terminating) => {
                info!("Namespace {} is already terminating", name);
                return Ok(Removal::Terminating);
            }
            Some(NamespacePhase::Active) => {}
        }

        match self.delete(resource).await {
            Ok(DeleteOutcome::Deleted) => Ok(Removal::Deleted),
            Ok(DeleteOutcome::NotFound) => Ok(Removal::AlreadyAbsent),
            Err(e) if e.class() == ErrorClass::Blocking => {
                debug!("Deletion of namespace {} already pending: {}", name, e);
                Ok(Removal::Terminating)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, resource: &BlockingResourceDescriptor) -> Result<DeleteOutcome> {
        let operation = format!("delete {}", resource);
        guarded(&self.policy, &operation, || self.cluster.delete_resource(resource)).await
    }

    /// Wait for a deleted namespace to disappear, clearing its finalizers if
    /// it is still terminating at the deadline. Returns whether finalizers
    /// were cleared.
    async fn await_namespace(&self, name: &str) -> Result<bool> {
        let deadline = Instant::now() + self.timings.namespace_wait;
        let operation = format!("read namespace {}", name);

        let phase = loop {
            let phase =
                guarded(&self.policy, &operation, || self.cluster.namespace_phase(name)).await?;
            if phase.is_none() {
                debug!("Namespace {} is gone", name);
                return Ok(false);
            }
            if Instant::now() >= deadline {
                break phase;
            }
            sleep(self.timings.namespace_poll).await;
        };

        match phase {
            Some(NamespacePhase::Terminating) => {
                info!(
                    "Namespace {} still terminating after {:?}, clearing finalizers",
                    name, self.timings.namespace_wait
                );
                let operation = format!("clear finalizers on {}", name);
                guarded(&self.policy, &operation, || self.cluster.clear_finalizers(name)).await?;
                Ok(true)
            }
            _ => Err(TeardownError::Blocking(format!(
                "namespace {} still active after deletion",
                name
            ))),
        }
    }
}

fn selector_for(kind: BlockingKind) -> Selector {
    match kind {
        BlockingKind::Webhook => Selector::containing(WEBHOOK_OWNERS),
        BlockingKind::FinalizerHeldNamespace => Selector::named(COMPONENT_NAMESPACES),
        BlockingKind::PolicyObject | BlockingKind::ScaledObject | BlockingKind::LoadBalancerService => {
            Selector::all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::blocking;
    use crate::kubernetes::KubeClusterApi;
    use crate::test_utils::{
        immediate_timings, namespace_json, terminating_namespace_json, CallLog, MockService,
        RecordingCluster,
    };

    fn webhook(name: &str) -> BlockingResourceDescriptor {
        BlockingResourceDescriptor::cluster_scoped(
            BlockingKind::Webhook,
            blocking::VALIDATING_WEBHOOK,
            name,
        )
    }

    fn lb_service(namespace: &str, name: &str) -> BlockingResourceDescriptor {
        BlockingResourceDescriptor::namespaced(
            BlockingKind::LoadBalancerService,
            blocking::SERVICE,
            namespace,
            name,
        )
    }

    #[tokio::test]
    async fn test_unreachable_cluster_short_circuits() {
        let log = CallLog::new();
        let cluster = RecordingCluster::new(&log).unreachable();

        let summary = ClusterResourceSweeper::new(&cluster, &immediate_timings())
            .sweep()
            .await;

        assert!(summary.cluster_unreachable);
        assert_eq!(log.entries(), vec!["cluster.probe"]);
        assert!(summary.to_attempt().succeeded);
    }

    #[tokio::test]
    async fn test_sweeps_kinds_in_priority_order() {
        let log = CallLog::new();
        let cluster = RecordingCluster::new(&log)
            .with_object(lb_service("mlflow", "mlflow-lb"))
            .with_object(webhook("kyverno-resource-validating-webhook-cfg"));

        ClusterResourceSweeper::new(&cluster, &immediate_timings())
            .sweep()
            .await;

        let entries = log.entries();
        let position = |entry: &str| entries.iter().position(|e| e == entry).unwrap();
        assert!(
            position("cluster.delete ValidatingWebhookConfiguration kyverno-resource-validating-webhook-cfg")
                < position("cluster.delete Service mlflow/mlflow-lb")
        );
        assert!(cluster.remaining().is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_webhooks_are_left_alone() {
        let log = CallLog::new();
        let cluster = RecordingCluster::new(&log).with_object(webhook("cert-manager-webhook"));

        let summary = ClusterResourceSweeper::new(&cluster, &immediate_timings())
            .sweep()
            .await;

        assert!(summary.deleted.is_empty());
        assert_eq!(cluster.remaining().len(), 1);
    }

    #[tokio::test]
    async fn test_stuck_namespace_gets_finalizers_cleared() {
        let log = CallLog::new();
        let cluster = RecordingCluster::new(&log).with_stuck_namespace("kyverno");

        let summary = ClusterResourceSweeper::new(&cluster, &immediate_timings())
            .sweep()
            .await;

        assert_eq!(summary.finalizers_cleared, vec!["kyverno"]);
        assert!(summary.failures.is_empty());
        assert!(cluster.remaining().is_empty());
        assert_eq!(log.count_prefixed("cluster.clear_finalizers"), 1);
    }

    #[tokio::test]
    async fn test_already_terminating_namespace_is_not_deleted_again() {
        let log = CallLog::new();
        let cluster = RecordingCluster::new(&log).with_terminating_namespace("kyverno");

        let summary = ClusterResourceSweeper::new(&cluster, &immediate_timings())
            .sweep()
            .await;

        assert_eq!(summary.finalizers_cleared, vec!["kyverno"]);
        assert!(summary.failures.is_empty());
        assert!(summary.deleted.is_empty());
        assert_eq!(log.count_prefixed("cluster.delete Namespace kyverno"), 0);
        assert!(cluster.remaining().is_empty());
    }

    #[tokio::test]
    async fn test_terminating_namespace_over_kube_api() {
        let client = MockService::new()
            .on_get(
                "/version",
                200,
                r#"{"major":"1","minor":"30","gitVersion":"v1.30.2","gitCommit":"","gitTreeState":"","buildDate":"","goVersion":"","compiler":"","platform":""}"#,
            )
            .on_get(
                "/api/v1/namespaces/kyverno",
                200,
                &terminating_namespace_json("kyverno"),
            )
            .on_delete(
                "/api/v1/namespaces/kyverno",
                409,
                r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"Operation cannot be fulfilled on namespaces \"kyverno\": The system is ensuring all content is removed from this namespace.","reason":"Conflict","code":409}"#,
            )
            .on_put(
                "/api/v1/namespaces/kyverno/finalize",
                200,
                &namespace_json("kyverno"),
            )
            .into_client();
        let cluster = KubeClusterApi::new(client);

        let summary = ClusterResourceSweeper::new(&cluster, &immediate_timings())
            .sweep()
            .await;

        assert_eq!(summary.finalizers_cleared, vec!["kyverno"]);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_twice_is_idempotent() {
        let log = CallLog::new();
        let cluster = RecordingCluster::new(&log)
            .with_object(webhook("tetragon-mutating"))
            .with_stuck_namespace("tetragon");
        let sweeper = ClusterResourceSweeper::new(&cluster, &immediate_timings());

        let first = sweeper.sweep().await;
        let second = sweeper.sweep().await;

        assert!(first.failures.is_empty());
        assert!(second.failures.is_empty());
        assert!(second.deleted.is_empty());
        assert!(second.to_attempt().succeeded);
    }

    #[tokio::test]
    async fn test_failed_delete_is_reported_not_fatal() {
        let log = CallLog::new();
        let cluster = RecordingCluster::new(&log)
            .with_object(webhook("kyverno-policy-validating-webhook-cfg"))
            .failing_delete("kyverno-policy-validating-webhook-cfg")
            .with_object(lb_service("kserve", "predictor-lb"));

        let summary = ClusterResourceSweeper::new(&cluster, &immediate_timings())
            .sweep()
            .await;

        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].contains("[blocking]"));
        assert_eq!(summary.deleted, vec!["Service kserve/predictor-lb"]);
        assert!(!summary.to_attempt().succeeded);
    }

    #[tokio::test]
    async fn test_protected_namespace_objects_are_skipped() {
        let log = CallLog::new();
        let cluster = RecordingCluster::new(&log).with_object(BlockingResourceDescriptor::namespaced(
            BlockingKind::ScaledObject,
            blocking::SCALED_OBJECT,
            "kube-system",
            "metrics",
        ));

        ClusterResourceSweeper::new(&cluster, &immediate_timings())
            .sweep()
            .await;

        assert_eq!(log.count_prefixed("cluster.delete"), 0);
    }
}
