// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The four teardown phases, run in order by the orchestrator.

pub mod destroy;
pub mod reconciler;
pub mod sweeper;
pub mod verifier;

pub use destroy::{DeclarativeDestroyRunner, DestroyStep};
pub use reconciler::{CloudOrphanReconciler, ReconcileOutcome};
pub use sweeper::{ClusterResourceSweeper, SweepSummary};
pub use verifier::PostDestroyVerifier;
