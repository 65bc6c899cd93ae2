// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Declarative destroy with a single resweep-and-retry

use crate::error::TeardownError;
use crate::provisioner::{Provisioner, StateHandle};
use crate::types::{DestroyAttemptResult, Phase};
use tracing::{info, instrument, warn};

/// Result of the first destroy attempt
#[derive(Debug)]
pub enum DestroyStep {
    Completed(DestroyAttemptResult),
    /// The first attempt failed; the caller should sweep again and call
    /// [`DeclarativeDestroyRunner::retry`]
    NeedsResweep {
        handle: StateHandle,
        error: TeardownError,
    },
}

pub struct DeclarativeDestroyRunner<'a, P> {
    provisioner: &'a P,
}

impl<'a, P: Provisioner> DeclarativeDestroyRunner<'a, P> {
    pub fn new(provisioner: &'a P) -> Self {
        Self { provisioner }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> DestroyStep {
        let Some(handle) = self.provisioner.state_handle().await else {
            info!("No provisioner state found, nothing to destroy");
            return DestroyStep::Completed(
                DestroyAttemptResult::ok(Phase::Destroy).with_note("no provisioner state"),
            );
        };

        match self.provisioner.destroy(&handle).await {
            Ok(()) => DestroyStep::Completed(DestroyAttemptResult::ok(Phase::Destroy)),
            Err(error) => {
                warn!("Destroy of {} failed, a resweep is needed: {}", handle, error);
                DestroyStep::NeedsResweep { handle, error }
            }
        }
    }

    /// The one retry after a resweep; its failure is terminal
    #[instrument(skip(self, first_error), fields(state = %handle))]
    pub async fn retry(
        &self,
        handle: &StateHandle,
        first_error: &TeardownError,
    ) -> DestroyAttemptResult {
        match self.provisioner.destroy(handle).await {
            Ok(()) => {
                info!("Destroy succeeded on retry");
                DestroyAttemptResult::ok(Phase::Destroy).with_retry_count(1)
            }
            Err(e) => {
                warn!("Destroy failed again: {}", e);
                DestroyAttemptResult::failed(
                    Phase::Destroy,
                    format!("first attempt: {}; retry: {}", first_error.detail(), e.detail()),
                )
                .with_retry_count(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CallLog, ScriptedProvisioner};

    #[tokio::test]
    async fn test_no_state_is_a_successful_noop() {
        let log = CallLog::new();
        let provisioner = ScriptedProvisioner::new(&log).without_state();

        let DestroyStep::Completed(result) = DeclarativeDestroyRunner::new(&provisioner).run().await
        else {
            panic!("expected a completed step");
        };

        assert!(result.succeeded);
        assert_eq!(result.retry_count, 0);
        assert_eq!(log.count_prefixed("provisioner.destroy"), 0);
    }

    #[tokio::test]
    async fn test_first_failure_asks_for_resweep() {
        let log = CallLog::new();
        let provisioner = ScriptedProvisioner::new(&log).failing_with("cluster has dependent objects");

        let step = DeclarativeDestroyRunner::new(&provisioner).run().await;

        assert!(matches!(step, DestroyStep::NeedsResweep { .. }));
        assert_eq!(log.count_prefixed("provisioner.destroy"), 1);
    }

    #[tokio::test]
    async fn test_fail_then_succeed_reports_one_retry() {
        let log = CallLog::new();
        let provisioner = ScriptedProvisioner::new(&log).failing_with("namespace stuck");
        let runner = DeclarativeDestroyRunner::new(&provisioner);

        let DestroyStep::NeedsResweep { handle, error } = runner.run().await else {
            panic!("expected a resweep request");
        };
        let result = runner.retry(&handle, &error).await;

        assert!(result.succeeded);
        assert_eq!(result.retry_count, 1);
    }

    #[tokio::test]
    async fn test_second_failure_is_terminal() {
        let log = CallLog::new();
        let provisioner = ScriptedProvisioner::new(&log)
            .failing_with("namespace stuck")
            .failing_with("timeout waiting for cluster deletion");
        let runner = DeclarativeDestroyRunner::new(&provisioner);

        let DestroyStep::NeedsResweep { handle, error } = runner.run().await else {
            panic!("expected a resweep request");
        };
        let result = runner.retry(&handle, &error).await;

        assert!(!result.succeeded);
        assert_eq!(result.retry_count, 1);
        let detail = result.error_detail.unwrap();
        assert!(detail.contains("namespace stuck"));
        assert!(detail.contains("timeout waiting for cluster deletion"));
    }
}
