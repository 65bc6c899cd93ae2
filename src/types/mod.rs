// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Value types shared by the phases: identity, resource descriptors and the run report.

pub mod descriptors;
pub mod identity;
pub mod report;

pub use descriptors::{
    BlockingKind, BlockingResourceDescriptor, DeleteOutcome, ManagedServiceKind,
    ManagedServiceStatus, NamespacePhase, OrphanKind, OrphanResourceDescriptor,
};
pub use identity::{DeploymentIdentity, Provider};
pub use report::{
    DestroyAttemptResult, Expected, Observed, Phase, RunReport, RunState, Severity,
    VerificationFinding,
};
