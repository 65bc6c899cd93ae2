// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cloud resource port and its vendor-CLI-backed adapter.

pub mod aws;
pub mod azure;
pub mod cli;
pub mod gcp;

pub use cli::CliCloudApi;

use crate::error::{Result, TeardownError};
use crate::types::{
    DeleteOutcome, ManagedServiceKind, ManagedServiceStatus, OrphanKind,
    OrphanResourceDescriptor, Provider,
};

/// Narrow view of the cloud API used by the reconciler and the verifier
#[allow(async_fn_in_trait)]
pub trait CloudApi {
    /// Confirms the cloud API answers for the configured account/project
    async fn probe(&self) -> Result<()>;

    /// Orphan kinds this backend can enumerate
    fn supported_kinds(&self) -> &'static [OrphanKind];

    async fn list_resources(
        &self,
        kind: OrphanKind,
        filter: &NameFilter,
    ) -> Result<Vec<OrphanResourceDescriptor>>;

    async fn delete_resource(&self, resource: &OrphanResourceDescriptor) -> Result<DeleteOutcome>;

    async fn describe_managed_service(
        &self,
        kind: ManagedServiceKind,
        name: &str,
    ) -> Result<ManagedServiceStatus>;
}

/// Name-contains filter scoping orphan discovery to one deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFilter {
    fragment: String,
}

impl NameFilter {
    pub fn contains(fragment: &str) -> Self {
        Self {
            fragment: fragment.to_string(),
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// An empty fragment never matches
    pub fn matches(&self, identifier: &str) -> bool {
        !self.fragment.is_empty() && identifier.contains(&self.fragment)
    }
}

/// Orphan kinds each provider's CLI can enumerate
pub fn supported_kinds(provider: Provider) -> &'static [OrphanKind] {
    match provider {
        Provider::Gcp => &[
            OrphanKind::Disk,
            OrphanKind::ForwardingRule,
            OrphanKind::BackendService,
            OrphanKind::HealthCheck,
            OrphanKind::PublicIp,
        ],
        Provider::Aws => &[
            OrphanKind::Disk,
            OrphanKind::ForwardingRule,
            OrphanKind::BackendService,
            OrphanKind::PublicIp,
        ],
        Provider::Azure => &[OrphanKind::Disk, OrphanKind::PublicIp],
    }
}

const TRANSITIONAL_MARKERS: &[&str] = &[
    "delet",
    "stopping",
    "terminat",
    "deprovision",
    "pending_delete",
];

/// Whether a provider status string describes a deletion in progress
pub fn is_transitional(status: &str) -> bool {
    let lower = status.to_ascii_lowercase();
    TRANSITIONAL_MARKERS.iter().any(|m| lower.contains(m))
}

const NOT_FOUND_MARKERS: &[&str] = &[
    "not found",
    "notfound",
    "could not be found",
    "does not exist",
    "could not find",
];

const UNREACHABLE_MARKERS: &[&str] = &[
    "could not resolve",
    "name resolution",
    "connection refused",
    "unable to connect",
    "failed to connect",
    "could not connect",
    "network is unreachable",
    "no route to host",
    "endpointconnectionerror",
];

const TRANSIENT_MARKERS: &[&str] = &[
    "ratelimitexceeded",
    "rate limit",
    "throttl",
    "too many requests",
    "service unavailable",
    "internal error",
    "timed out",
    "try again",
];

const BLOCKING_MARKERS: &[&str] = &[
    "resourceinusebyanotherresource",
    "being used by",
    "in use",
    "inuse",
    "dependencyviolation",
    "cannot be deleted because",
];

/// Map a failed vendor CLI invocation onto the error taxonomy
pub fn classify_cli_failure(operation: &str, stderr: &str) -> TeardownError {
    let lower = stderr.to_ascii_lowercase();
    let message = format!("{}: {}", operation, first_line(stderr));
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(NOT_FOUND_MARKERS) {
        TeardownError::NotFound(message)
    } else if has(UNREACHABLE_MARKERS) {
        TeardownError::Unreachable(message)
    } else if has(TRANSIENT_MARKERS) {
        TeardownError::Transient(message)
    } else if has(BLOCKING_MARKERS) {
        TeardownError::Blocking(message)
    } else {
        TeardownError::CommandFailed(message)
    }
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no error output")
}

/// Last path segment of a self link, or the value itself
pub(crate) fn last_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}
