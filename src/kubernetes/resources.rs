// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Listing and deletion of the blocking object kinds

use crate::constants::{api, blocking};
use crate::error::{Result, TeardownError};
use crate::kubernetes::{is_sweepable, Selector};
use crate::types::{BlockingKind, BlockingResourceDescriptor, DeleteOutcome};
use k8s_openapi::api::core::v1::{Namespace, Service};
use kube::{
    api::{ApiResource, DeleteParams, DynamicObject, GroupVersionKind, ListParams},
    Api, Client, ResourceExt,
};
use tracing::{debug, info, instrument};

/// Concrete API kinds backing each blocking category (namespaces and services are typed)
fn api_kinds(kind: BlockingKind) -> &'static [&'static str] {
    match kind {
        BlockingKind::Webhook => &[blocking::VALIDATING_WEBHOOK, blocking::MUTATING_WEBHOOK],
        BlockingKind::PolicyObject => &[blocking::CLUSTER_POLICY, blocking::TRACING_POLICY],
        BlockingKind::ScaledObject => &[blocking::SCALED_OBJECT],
        BlockingKind::FinalizerHeldNamespace => &[blocking::NAMESPACE],
        BlockingKind::LoadBalancerService => &[blocking::SERVICE],
    }
}

/// Resolve the group/version/plural for a dynamically handled kind
fn api_resource(api_kind: &str) -> Option<(ApiResource, bool)> {
    api::RESOURCES
        .iter()
        .find(|(kind, ..)| *kind == api_kind)
        .map(|(kind, group, version, plural, namespaced)| {
            let gvk = GroupVersionKind::gvk(group, version, kind);
            (ApiResource::from_gvk_with_plural(&gvk, plural), *namespaced)
        })
}

/// List webhook, policy and autoscaler objects through the dynamic API.
///
/// A kind whose CRD is not installed yields nothing.
#[instrument(skip(client))]
pub async fn list_dynamic(
    client: &Client,
    kind: BlockingKind,
    selector: &Selector,
) -> Result<Vec<BlockingResourceDescriptor>> {
    let mut found = Vec::new();

    for api_kind in api_kinds(kind) {
        let Some((ar, namespaced)) = api_resource(api_kind) else {
            continue;
        };
        let objects: Api<DynamicObject> = Api::all_with(client.clone(), &ar);

        let list = match objects.list(&ListParams::default()).await {
            Ok(list) => list,
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("{} is not served by this cluster, skipping", api_kind);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for object in list.items {
            let name = object.name_any();
            if !selector.matches(&name) {
                continue;
            }
            let descriptor = match (namespaced, object.namespace()) {
                (true, Some(ns)) => {
                    BlockingResourceDescriptor::namespaced(kind, api_kind, &ns, &name)
                }
                _ => BlockingResourceDescriptor::cluster_scoped(kind, api_kind, &name),
            };
            found.push(descriptor);
        }
    }

    Ok(found)
}

/// List `Service` objects of type `LoadBalancer` in all namespaces
#[instrument(skip(client))]
pub async fn list_load_balancer_services(
    client: &Client,
    selector: &Selector,
) -> Result<Vec<BlockingResourceDescriptor>> {
    let services: Api<Service> = Api::all(client.clone());
    let list = services.list(&ListParams::default()).await?;

    Ok(list
        .items
        .iter()
        .filter(|svc| is_load_balancer(svc))
        .filter(|svc| selector.matches(&svc.name_any()))
        .map(|svc| {
            BlockingResourceDescriptor::namespaced(
                BlockingKind::LoadBalancerService,
                blocking::SERVICE,
                &svc.namespace().unwrap_or_default(),
                &svc.name_any(),
            )
        })
        .collect())
}

fn is_load_balancer(service: &Service) -> bool {
    service
        .spec
        .as_ref()
        .and_then(|s| s.type_.as_deref())
        .is_some_and(|t| t == "LoadBalancer")
}

/// Delete one blocking object; "not found" counts as done
#[instrument(skip(client, resource), fields(resource = %resource))]
pub async fn delete(client: &Client, resource: &BlockingResourceDescriptor) -> Result<DeleteOutcome> {
    if !is_sweepable(resource) {
        return Err(TeardownError::Unsupported(format!(
            "{} is outside the sweepable set",
            resource
        )));
    }

    let dp = DeleteParams::default();
    let name = resource.identifier.as_str();

    let result = match resource.api_kind.as_str() {
        blocking::NAMESPACE => {
            let api: Api<Namespace> = Api::all(client.clone());
            api.delete(name, &dp).await.map(|_| ())
        }
        blocking::SERVICE => {
            let namespace = resource.namespace.as_deref().unwrap_or("default");
            let api: Api<Service> = Api::namespaced(client.clone(), namespace);
            api.delete(name, &dp).await.map(|_| ())
        }
        other => {
            let (ar, namespaced) = api_resource(other).ok_or_else(|| {
                TeardownError::Unsupported(format!("no API mapping for kind {}", other))
            })?;
            let api: Api<DynamicObject> = match (namespaced, resource.namespace.as_deref()) {
                (true, Some(ns)) => Api::namespaced_with(client.clone(), ns, &ar),
                _ => Api::all_with(client.clone(), &ar),
            };
            api.delete(name, &dp).await.map(|_| ())
        }
    };

    match result {
        Ok(()) => {
            info!("Deleted {}", resource);
            Ok(DeleteOutcome::Deleted)
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("{} already absent", resource);
            Ok(DeleteOutcome::NotFound)
        }
        Err(e) => Err(e.into()),
    }
}
