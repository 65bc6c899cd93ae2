// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::descriptors::ManagedServiceKind;
use crate::types::identity::DeploymentIdentity;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Sweep,
    Destroy,
    Reconcile,
    Verify,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Sweep => "Sweep",
            Phase::Destroy => "Destroy",
            Phase::Reconcile => "Reconcile",
            Phase::Verify => "Verify",
        };
        f.write_str(s)
    }
}

/// Outcome of one phase invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyAttemptResult {
    pub phase: Phase,
    /// Narrows the attempt, e.g. the orphan kind or `resweep`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub retry_count: u32,
}

impl DestroyAttemptResult {
    pub fn ok(phase: Phase) -> Self {
        Self {
            phase,
            subject: None,
            succeeded: true,
            error_detail: None,
            retry_count: 0,
        }
    }

    pub fn failed(phase: Phase, detail: impl Into<String>) -> Self {
        Self {
            phase,
            subject: None,
            succeeded: false,
            error_detail: Some(detail.into()),
            retry_count: 0,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Attach a note without marking the attempt failed
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.error_detail = Some(note.into());
        self
    }

    pub fn label(&self) -> String {
        match &self.subject {
            Some(subject) => format!("{} ({})", self.phase, subject),
            None => self.phase.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Expected {
    Absent,
    Deleting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "detail")]
pub enum Observed {
    Absent,
    /// Present with a deletion in progress
    Transitioning(String),
    /// Present and settled
    Stable(String),
    /// Endpoint could not be contacted
    Unreachable,
    /// Query failed for another reason
    Unknown(String),
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Absent => f.write_str("absent"),
            Observed::Transitioning(s) => write!(f, "transitioning ({})", s),
            Observed::Stable(s) => write!(f, "present ({})", s),
            Observed::Unreachable => f.write_str("unreachable"),
            Observed::Unknown(e) => write!(f, "unknown ({})", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationFinding {
    pub resource_kind: ManagedServiceKind,
    pub name: String,
    pub expected: Expected,
    pub observed: Observed,
    pub severity: Severity,
}

impl VerificationFinding {
    /// Follow-up instruction for the operator, `None` when nothing is left to do
    pub fn action(&self) -> Option<String> {
        match (self.severity, &self.observed) {
            (Severity::Ok, _) => None,
            (Severity::Warning, observed) => Some(format!(
                "{} '{}' is {}; deletion may still complete asynchronously, re-check before removing it manually",
                self.resource_kind, self.name, observed
            )),
            (Severity::Error, Observed::Unreachable) => Some(format!(
                "{} '{}' could not be checked because the cloud API was unreachable; verify it manually",
                self.resource_kind, self.name
            )),
            (Severity::Error, Observed::Unknown(e)) => Some(format!(
                "{} '{}' could not be checked ({}); verify it manually",
                self.resource_kind, self.name, e
            )),
            (Severity::Error, observed) => Some(format!(
                "{} '{}' is still {}; teardown did not remove it, manual deletion required",
                self.resource_kind, self.name, observed
            )),
        }
    }
}

/// Orchestrator states, in the only order they can be visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    Confirming,
    Sweeping,
    Destroying,
    Reconciling,
    Verifying,
    Done,
    Cancelled,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Confirming => "Confirming",
            RunState::Sweeping => "Sweeping",
            RunState::Destroying => "Destroying",
            RunState::Reconciling => "Reconciling",
            RunState::Verifying => "Verifying",
            RunState::Done => "Done",
            RunState::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// Append-only record of one run, owned by the orchestrator
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub identity: DeploymentIdentity,
    pub states: Vec<RunState>,
    pub attempts: Vec<DestroyAttemptResult>,
    pub findings: Vec<VerificationFinding>,
    pub manual_followups: Vec<String>,
    pub destroy_terminal_failure: bool,
}

impl RunReport {
    pub fn new(identity: DeploymentIdentity) -> Self {
        Self {
            identity,
            states: Vec::new(),
            attempts: Vec::new(),
            findings: Vec::new(),
            manual_followups: Vec::new(),
            destroy_terminal_failure: false,
        }
    }

    pub fn enter(&mut self, state: RunState) {
        self.states.push(state);
    }

    pub fn current_state(&self) -> Option<RunState> {
        self.states.last().copied()
    }

    pub fn record_attempt(&mut self, attempt: DestroyAttemptResult) {
        self.attempts.push(attempt);
    }

    pub fn record_finding(&mut self, finding: VerificationFinding) {
        if let Some(action) = finding.action() {
            self.manual_followups.push(action);
        }
        self.findings.push(finding);
    }

    pub fn add_followup(&mut self, followup: impl Into<String>) {
        self.manual_followups.push(followup.into());
    }

    pub fn is_cancelled(&self) -> bool {
        self.current_state() == Some(RunState::Cancelled)
    }

    /// Distinct phases in execution order
    pub fn phases_executed(&self) -> Vec<Phase> {
        let mut phases = Vec::new();
        for attempt in &self.attempts {
            if !phases.contains(&attempt.phase) {
                phases.push(attempt.phase);
            }
        }
        if !self.findings.is_empty() && !phases.contains(&Phase::Verify) {
            phases.push(Phase::Verify);
        }
        phases
    }

    /// Labels of attempts that failed, plus Verify when any finding is not ok
    pub fn phases_with_issues(&self) -> Vec<String> {
        let mut issues: Vec<String> = self
            .attempts
            .iter()
            .filter(|a| !a.succeeded)
            .map(DestroyAttemptResult::label)
            .collect();
        if self.findings.iter().any(|f| f.severity != Severity::Ok) {
            issues.push(Phase::Verify.to_string());
        }
        issues
    }

    pub fn worst_severity(&self) -> Severity {
        self.findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Ok)
    }

    /// Success derives only from verification findings and the destroy outcome
    pub fn is_clean(&self) -> bool {
        !self.is_cancelled()
            && !self.destroy_terminal_failure
            && self.worst_severity() == Severity::Ok
    }
}
