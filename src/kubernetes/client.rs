// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster client creation and the kube-backed `ClusterApi`

use crate::error::{Result, TeardownError};
use crate::kubernetes::{namespaces, resources, ClusterApi, Selector};
use crate::types::{BlockingKind, BlockingResourceDescriptor, DeleteOutcome, NamespacePhase};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config as KConfig};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Create a Kubernetes client from an explicit kubeconfig, a named context or
/// the inferred environment.
#[instrument]
pub async fn create_client(
    kubeconfig: Option<&Path>,
    context: Option<&str>,
    connect_timeout: Duration,
) -> Result<Client> {
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };

    let mut config = match kubeconfig {
        Some(path) => {
            debug!("Loading kubeconfig from {}", path.display());
            let parsed = Kubeconfig::read_from(path).map_err(|e| {
                TeardownError::KubeconfigError(format!(
                    "Failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            KConfig::from_custom_kubeconfig(parsed, &options)
                .await
                .map_err(|e| {
                    TeardownError::KubeconfigError(format!("Failed to create config: {}", e))
                })?
        }
        None if context.is_some() => KConfig::from_kubeconfig(&options).await.map_err(|e| {
            TeardownError::KubeconfigError(format!("Failed to load context: {}", e))
        })?,
        None => KConfig::infer().await.map_err(|e| {
            TeardownError::KubeconfigError(format!("Failed to infer config: {}", e))
        })?,
    };

    // An unreachable API server should fail fast rather than hang each call
    config.connect_timeout = Some(connect_timeout);

    info!("Using cluster API at {}", config.cluster_url);

    Client::try_from(config)
        .map_err(|e| TeardownError::KubeconfigError(format!("Failed to create client: {}", e)))
}

/// `ClusterApi` backed by a kube client.
///
/// Built without a client when no usable kubeconfig exists; every call then
/// reports the cluster as unreachable.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Option<Client>,
    unavailable_reason: String,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self {
            client: Some(client),
            unavailable_reason: String::new(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Cluster API unavailable: {}", reason);
        Self {
            client: None,
            unavailable_reason: reason,
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| TeardownError::Unreachable(self.unavailable_reason.clone()))
    }
}

impl ClusterApi for KubeClusterApi {
    async fn probe(&self) -> Result<()> {
        let version = self.client()?.apiserver_version().await?;
        debug!("Cluster API reachable, server version {}", version.git_version);
        Ok(())
    }

    async fn list_resources(
        &self,
        kind: BlockingKind,
        selector: &Selector,
    ) -> Result<Vec<BlockingResourceDescriptor>> {
        let client = self.client()?;
        match kind {
            BlockingKind::FinalizerHeldNamespace => {
                namespaces::list_namespaces(client, selector).await
            }
            BlockingKind::LoadBalancerService => {
                resources::list_load_balancer_services(client, selector).await
            }
            _ => resources::list_dynamic(client, kind, selector).await,
        }
    }

    async fn delete_resource(
        &self,
        resource: &BlockingResourceDescriptor,
    ) -> Result<DeleteOutcome> {
        resources::delete(self.client()?, resource).await
    }

    async fn namespace_phase(&self, name: &str) -> Result<Option<NamespacePhase>> {
        namespaces::namespace_phase(self.client()?, name).await
    }

    async fn clear_finalizers(&self, namespace: &str) -> Result<()> {
        namespaces::clear_finalizers(self.client()?, namespace).await
    }
}
