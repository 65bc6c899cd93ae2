// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Discovery and deletion of cloud resources the provisioner never tracked.
//!
//! Every listing is narrowed again on the client side: a resource whose
//! identifier lacks the cluster name is never deleted, whatever the cloud
//! API returned.

use crate::calls::{guarded, CallPolicy};
use crate::cloud::{CloudApi, NameFilter};
use crate::config::{Timings, UnreachableCloudPolicy};
use crate::error::{Result, TeardownError};
use crate::types::{
    DeleteOutcome, DeploymentIdentity, DestroyAttemptResult, OrphanKind,
    OrphanResourceDescriptor, Phase,
};
use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// One per supported orphan kind
    pub attempts: Vec<DestroyAttemptResult>,
    pub followups: Vec<String>,
}

struct KindOutcome {
    attempt: DestroyAttemptResult,
    followups: Vec<String>,
}

pub struct CloudOrphanReconciler<'a, A> {
    cloud: &'a A,
    identity: &'a DeploymentIdentity,
    policy: CallPolicy,
    timings: Timings,
    unreachable: UnreachableCloudPolicy,
}

impl<'a, A: CloudApi> CloudOrphanReconciler<'a, A> {
    pub fn new(
        cloud: &'a A,
        identity: &'a DeploymentIdentity,
        timings: &Timings,
        unreachable: UnreachableCloudPolicy,
    ) -> Self {
        Self {
            cloud,
            identity,
            policy: CallPolicy::from_timings(timings),
            timings: timings.clone(),
            unreachable,
        }
    }

    #[instrument(skip(self), fields(cluster = %self.identity.cluster_name()))]
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let supported = self.cloud.supported_kinds();
        let mut outcome = ReconcileOutcome::default();

        // Only a transient probe failure may go on to list and delete
        match guarded(&self.policy, "probe cloud API", || self.cloud.probe()).await {
            Err(e) if e.is_unreachable() => return self.unreachable_outcome(supported, &e),
            Err(e) if e.is_transient() => warn!("Cloud probe failed, reconciling anyway: {}", e),
            Err(e) => return self.refused_outcome(supported, &e),
            Ok(()) => {}
        }

        let filter = NameFilter::contains(self.identity.cluster_name());

        for stage in OrphanKind::STAGES {
            let kinds: Vec<OrphanKind> = stage
                .iter()
                .copied()
                .filter(|kind| supported.contains(kind))
                .collect();
            let results = join_all(kinds.iter().map(|kind| self.reconcile_kind(*kind, &filter))).await;

            for result in results {
                outcome.attempts.push(result.attempt);
                outcome.followups.extend(result.followups);
            }
        }

        outcome
    }

    fn unreachable_outcome(
        &self,
        supported: &[OrphanKind],
        error: &TeardownError,
    ) -> ReconcileOutcome {
        match self.unreachable {
            UnreachableCloudPolicy::Fatal => {
                warn!("Cloud API unreachable, orphaned resources cannot be checked: {}", error);
                self.failed_outcome(supported, error, "the cloud API was unreachable")
            }
            UnreachableCloudPolicy::AssumeGone => {
                info!("Cloud API unreachable, assuming its resources are gone");
                let mut outcome = ReconcileOutcome::default();
                for kind in supported {
                    outcome.attempts.push(
                        DestroyAttemptResult::ok(Phase::Reconcile)
                            .with_subject(kind.to_string())
                            .with_note("cloud API unreachable, assumed gone"),
                    );
                }
                outcome
            }
        }
    }

    fn refused_outcome(&self, supported: &[OrphanKind], error: &TeardownError) -> ReconcileOutcome {
        warn!("Cloud probe failed, not touching any cloud resources: {}", error);
        self.failed_outcome(supported, error, "the cloud credentials could not be verified")
    }

    fn failed_outcome(
        &self,
        supported: &[OrphanKind],
        error: &TeardownError,
        reason: &str,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        for kind in supported {
            outcome.attempts.push(
                DestroyAttemptResult::failed(Phase::Reconcile, error.detail())
                    .with_subject(kind.to_string()),
            );
            outcome.followups.push(format!(
                "Check for orphaned {} resources named after '{}' manually; {}",
                kind,
                self.identity.cluster_name(),
                reason
            ));
        }
        outcome
    }

    async fn reconcile_kind(&self, kind: OrphanKind, filter: &NameFilter) -> KindOutcome {
        let mut resources = match self.list_owned(kind, filter).await {
            Ok(resources) => resources,
            Err(e) => {
                warn!("Failed to list {} resources: {}", kind, e);
                return KindOutcome {
                    attempt: DestroyAttemptResult::failed(Phase::Reconcile, e.detail())
                        .with_subject(kind.to_string()),
                    followups: vec![format!(
                        "Check for orphaned {} resources named after '{}' manually; listing failed",
                        kind,
                        self.identity.cluster_name()
                    )],
                };
            }
        };

        let mut polls = 0;
        while polls < self.timings.in_use_polls && resources.iter().any(|r| r.in_use) {
            polls += 1;
            debug!(
                "{} {} resources still in use, re-listing ({}/{})",
                resources.iter().filter(|r| r.in_use).count(),
                kind,
                polls,
                self.timings.in_use_polls
            );
            sleep(self.timings.in_use_poll_interval).await;
            match self.list_owned(kind, filter).await {
                Ok(relisted) => resources = relisted,
                Err(e) => {
                    warn!("Re-listing {} resources failed: {}", kind, e);
                    break;
                }
            }
        }

        let (in_use, deletable): (Vec<_>, Vec<_>) = resources.iter().partition(|r| r.in_use);
        let mut failures: Vec<(String, String)> = in_use
            .iter()
            .map(|r| {
                let error = TeardownError::Blocking(format!("{} is still in use", r.identifier));
                warn!("Not deleting {}: still in use", r);
                (r.to_string(), error.detail())
            })
            .collect();

        let results = join_all(deletable.iter().map(|r| self.delete(r))).await;
        let mut deleted = 0;
        for (resource, result) in deletable.iter().zip(results) {
            match result {
                Ok(DeleteOutcome::Deleted) => deleted += 1,
                Ok(DeleteOutcome::NotFound) => debug!("{} already gone", resource),
                Err(e) => {
                    warn!("Failed to delete {}: {}", resource, e);
                    failures.push((resource.to_string(), e.detail()));
                }
            }
        }

        if deleted > 0 {
            info!("Deleted {} orphaned {} resources", deleted, kind);
        }

        let attempt = if failures.is_empty() {
            DestroyAttemptResult::ok(Phase::Reconcile)
        } else {
            let detail = failures
                .iter()
                .map(|(resource, detail)| format!("{}: {}", resource, detail))
                .collect::<Vec<_>>()
                .join("; ");
            DestroyAttemptResult::failed(Phase::Reconcile, detail)
        };

        KindOutcome {
            attempt: attempt.with_subject(kind.to_string()),
            followups: failures
                .into_iter()
                .map(|(resource, detail)| format!("Delete {} manually: {}", resource, detail))
                .collect(),
        }
    }

    /// List one kind and keep only resources inside the deployment
    async fn list_owned(
        &self,
        kind: OrphanKind,
        filter: &NameFilter,
    ) -> Result<Vec<OrphanResourceDescriptor>> {
        let operation = format!("list {} resources", kind);
        let listed = guarded(&self.policy, &operation, || self.cloud.list_resources(kind, filter))
            .await?;

        Ok(listed
            .into_iter()
            .filter(|resource| {
                let owned = filter.matches(&resource.identifier)
                    && self.identity.owns(&resource.identifier);
                if !owned {
                    warn!("Ignoring {} outside the deployment", resource);
                }
                owned
            })
            .collect())
    }

    async fn delete(&self, resource: &OrphanResourceDescriptor) -> Result<DeleteOutcome> {
        let operation = format!("delete {}", resource);
        guarded(&self.policy, &operation, || self.cloud.delete_resource(resource)).await
    }
}
