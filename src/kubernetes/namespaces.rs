// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace status and finalizer management

use crate::constants::blocking::{NAMESPACE, PROTECTED_NAMESPACES};
use crate::error::{Result, TeardownError};
use crate::kubernetes::Selector;
use crate::types::{BlockingKind, BlockingResourceDescriptor, NamespacePhase};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{ListParams, PostParams},
    Api, Client, ResourceExt,
};
use tracing::{debug, info, instrument};

/// List namespaces matching the selector, skipping protected system namespaces
#[instrument(skip(client))]
pub async fn list_namespaces(
    client: &Client,
    selector: &Selector,
) -> Result<Vec<BlockingResourceDescriptor>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let names: Vec<String> = if selector.names.is_empty() {
        namespaces
            .list(&ListParams::default())
            .await?
            .items
            .iter()
            .map(ResourceExt::name_any)
            .filter(|name| selector.matches(name))
            .collect()
    } else {
        let mut found = Vec::new();
        for name in &selector.names {
            if namespaces.get_opt(name).await?.is_some() {
                found.push(name.clone());
            } else {
                debug!("Namespace {} does not exist", name);
            }
        }
        found
    };

    Ok(names
        .into_iter()
        .filter(|name| !PROTECTED_NAMESPACES.contains(&name.as_str()))
        .map(|name| {
            BlockingResourceDescriptor::cluster_scoped(
                BlockingKind::FinalizerHeldNamespace,
                NAMESPACE,
                &name,
            )
        })
        .collect())
}

/// Current phase of a namespace, `None` if it no longer exists
pub async fn namespace_phase(client: &Client, name: &str) -> Result<Option<NamespacePhase>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let Some(namespace) = namespaces.get_opt(name).await? else {
        return Ok(None);
    };

    Ok(Some(phase_of(&namespace)))
}

fn phase_of(namespace: &Namespace) -> NamespacePhase {
    let terminating = namespace
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|p| p == "Terminating");

    if terminating {
        NamespacePhase::Terminating
    } else {
        NamespacePhase::Active
    }
}

/// Drop all finalizers from a namespace through the `finalize` subresource
#[instrument(skip(client))]
pub async fn clear_finalizers(client: &Client, name: &str) -> Result<()> {
    if PROTECTED_NAMESPACES.contains(&name) {
        return Err(TeardownError::Unsupported(format!(
            "refusing to clear finalizers on protected namespace {}",
            name
        )));
    }

    let namespaces: Api<Namespace> = Api::all(client.clone());

    let Some(mut namespace) = namespaces.get_opt(name).await? else {
        debug!("Namespace {} already gone, no finalizers to clear", name);
        return Ok(());
    };

    strip_finalizers(&mut namespace);

    let body = serde_json::to_vec(&namespace).map_err(|e| {
        TeardownError::InvalidResponse(format!("Failed to encode namespace {}: {}", name, e))
    })?;

    match namespaces
        .replace_subresource("finalize", name, &PostParams::default(), body)
        .await
    {
        Ok(_) => {
            info!("Cleared finalizers on namespace {}", name);
            Ok(())
        }
        Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn strip_finalizers(namespace: &mut Namespace) {
    namespace.metadata.finalizers = None;
    if let Some(spec) = namespace.spec.as_mut() {
        spec.finalizers = Some(Vec::new());
    }
}
