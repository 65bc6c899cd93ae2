// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Human and JSON renderings of the run report

use crate::types::{Phase, RunReport, RunState, Severity};
use serde::Serialize;
use std::fmt::Write;

/// Overall verdict, mirrored by the exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Clean,
    Incomplete,
    Cancelled,
}

impl Verdict {
    pub fn of(report: &RunReport) -> Self {
        if report.is_cancelled() {
            Verdict::Cancelled
        } else if report.is_clean() {
            Verdict::Clean
        } else {
            Verdict::Incomplete
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    verdict: Verdict,
    phases_executed: Vec<Phase>,
    phases_with_issues: Vec<String>,
    #[serde(flatten)]
    report: &'a RunReport,
}

pub fn render_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        verdict: Verdict::of(report),
        phases_executed: report.phases_executed(),
        phases_with_issues: report.phases_with_issues(),
        report,
    })
}

pub fn render_human(report: &RunReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_human(&mut out, report);
    out
}

fn write_human(out: &mut String, report: &RunReport) -> std::fmt::Result {
    writeln!(out, "Teardown of {}", report.identity)?;
    let states: Vec<String> = report.states.iter().map(RunState::to_string).collect();
    writeln!(out, "States: {}", states.join(" -> "))?;

    if report.is_cancelled() {
        writeln!(out, "Confirmation declined, nothing was deleted.")?;
        return writeln!(out, "Result: cancelled");
    }

    let executed: Vec<String> = report.phases_executed().iter().map(Phase::to_string).collect();
    writeln!(out, "Phases executed: {}", executed.join(", "))?;

    if !report.attempts.is_empty() {
        writeln!(out, "\nAttempts:")?;
        for attempt in &report.attempts {
            let status = if attempt.succeeded { "ok" } else { "FAILED" };
            write!(out, "  [{:<6}] {}", status, attempt.label())?;
            if attempt.retry_count > 0 {
                write!(out, " (retried {}x)", attempt.retry_count)?;
            }
            if let Some(detail) = &attempt.error_detail {
                write!(out, ": {}", detail)?;
            }
            writeln!(out)?;
        }
    }

    if !report.findings.is_empty() {
        writeln!(out, "\nVerification:")?;
        for finding in &report.findings {
            let severity = match finding.severity {
                Severity::Ok => "ok",
                Severity::Warning => "WARNING",
                Severity::Error => "ERROR",
            };
            writeln!(
                out,
                "  [{:<7}] {} {}: {}",
                severity, finding.resource_kind, finding.name, finding.observed
            )?;
        }
    }

    let issues = report.phases_with_issues();
    writeln!(
        out,
        "\nPhases with issues: {}",
        if issues.is_empty() {
            "none".to_string()
        } else {
            issues.join(", ")
        }
    )?;

    if !report.manual_followups.is_empty() {
        writeln!(out, "\nManual follow-up required:")?;
        for followup in &report.manual_followups {
            writeln!(out, "  - {}", followup)?;
        }
    }

    let verdict = match Verdict::of(report) {
        Verdict::Clean => "clean",
        Verdict::Incomplete => "incomplete",
        Verdict::Cancelled => "cancelled",
    };
    writeln!(out, "\nResult: {}", verdict)
}
