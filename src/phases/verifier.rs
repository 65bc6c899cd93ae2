// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read-only re-check of the principal managed resources

use crate::calls::{guarded, CallPolicy};
use crate::cloud::{is_transitional, CloudApi};
use crate::config::{Timings, UnreachableCloudPolicy};
use crate::kubernetes::ClusterApi;
use crate::types::{
    DeploymentIdentity, Expected, ManagedServiceKind, ManagedServiceStatus, Observed, Severity,
    VerificationFinding,
};
use tracing::{debug, info, instrument, warn};

/// Map a described status onto what was observed and how bad it is
pub fn classify(status: &ManagedServiceStatus) -> (Observed, Severity) {
    match status {
        ManagedServiceStatus::Absent => (Observed::Absent, Severity::Ok),
        ManagedServiceStatus::Present(s) if is_transitional(s) => {
            (Observed::Transitioning(s.clone()), Severity::Warning)
        }
        ManagedServiceStatus::Present(s) => (Observed::Stable(s.clone()), Severity::Error),
    }
}

pub struct PostDestroyVerifier<'a, C, A> {
    cluster: &'a C,
    cloud: &'a A,
    identity: &'a DeploymentIdentity,
    database_name: &'a str,
    network_name: &'a str,
    policy: CallPolicy,
    unreachable: UnreachableCloudPolicy,
}

impl<'a, C: ClusterApi, A: CloudApi> PostDestroyVerifier<'a, C, A> {
    pub fn new(
        cluster: &'a C,
        cloud: &'a A,
        identity: &'a DeploymentIdentity,
        database_name: &'a str,
        network_name: &'a str,
        timings: &Timings,
        unreachable: UnreachableCloudPolicy,
    ) -> Self {
        Self {
            cluster,
            cloud,
            identity,
            database_name,
            network_name,
            policy: CallPolicy::from_timings(timings),
            unreachable,
        }
    }

    /// One finding each for the cluster, the database and the network
    #[instrument(skip(self), fields(cluster = %self.identity.cluster_name()))]
    pub async fn verify(&self) -> Vec<VerificationFinding> {
        let (cluster, database, network) = futures::join!(
            self.check_cluster(),
            self.check(ManagedServiceKind::Database, self.database_name),
            self.check(ManagedServiceKind::Network, self.network_name),
        );
        let findings = vec![cluster, database, network];

        for finding in &findings {
            match finding.severity {
                Severity::Ok => debug!(
                    "{} {} verified: {}",
                    finding.resource_kind, finding.name, finding.observed
                ),
                _ => warn!(
                    "{} {} is {} ({})",
                    finding.resource_kind, finding.name, finding.observed, finding.severity
                ),
            }
        }
        findings
    }

    async fn check_cluster(&self) -> VerificationFinding {
        let name = self.identity.cluster_name();

        if let Err(e) = guarded(&self.policy, "probe cluster API", || self.cluster.probe()).await {
            if e.is_unreachable() {
                info!("Cluster API unreachable, treating cluster {} as gone", name);
                return finding(ManagedServiceKind::Cluster, name, Observed::Absent, Severity::Ok);
            }
            debug!("Cluster probe failed ({}), asking the cloud API", e);
        }

        self.check(ManagedServiceKind::Cluster, name).await
    }

    async fn check(&self, kind: ManagedServiceKind, name: &str) -> VerificationFinding {
        let operation = format!("describe {} {}", kind, name);

        match guarded(&self.policy, &operation, || {
            self.cloud.describe_managed_service(kind, name)
        })
        .await
        {
            Ok(status) => {
                let (observed, severity) = classify(&status);
                finding(kind, name, observed, severity)
            }
            Err(e) if e.is_unreachable() => {
                let severity = match self.unreachable {
                    UnreachableCloudPolicy::Fatal => Severity::Error,
                    UnreachableCloudPolicy::AssumeGone => Severity::Ok,
                };
                finding(kind, name, Observed::Unreachable, severity)
            }
            Err(e) => finding(kind, name, Observed::Unknown(e.detail()), Severity::Error),
        }
    }
}

fn finding(
    kind: ManagedServiceKind,
    name: &str,
    observed: Observed,
    severity: Severity,
) -> VerificationFinding {
    VerificationFinding {
        resource_kind: kind,
        name: name.to_string(),
        expected: Expected::Absent,
        observed,
        severity,
    }
}
