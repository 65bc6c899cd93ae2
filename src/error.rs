// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TeardownError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Deletion blocked: {0}")]
    Blocking(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Confirmation declined")]
    ConfirmationDeclined,
}

pub type Result<T> = std::result::Result<T, TeardownError>;

/// Coarse classification driving retry and reporting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Endpoint could not be contacted at all
    Unreachable,
    /// Target is already gone; deletions treat this as success
    NotFound,
    /// Timeout, rate limit or server-side hiccup; retried in-call
    Transient,
    /// An active dependency prevents deletion
    Blocking,
    /// Anything else
    Failed,
    ConfirmationDeclined,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorClass::Unreachable => "unreachable",
            ErrorClass::NotFound => "not-found",
            ErrorClass::Transient => "transient",
            ErrorClass::Blocking => "blocking",
            ErrorClass::Failed => "failed",
            ErrorClass::ConfirmationDeclined => "confirmation-declined",
        };
        f.write_str(s)
    }
}

impl TeardownError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TeardownError::KubeError(e) => classify_kube_error(e),
            TeardownError::Unreachable(_) | TeardownError::KubeconfigError(_) => {
                ErrorClass::Unreachable
            }
            TeardownError::NotFound(_) => ErrorClass::NotFound,
            TeardownError::Transient(_) | TeardownError::Timeout { .. } => ErrorClass::Transient,
            TeardownError::Blocking(_) => ErrorClass::Blocking,
            TeardownError::ConfirmationDeclined => ErrorClass::ConfirmationDeclined,
            TeardownError::CommandFailed(_)
            | TeardownError::InvalidResponse(_)
            | TeardownError::Unsupported(_)
            | TeardownError::Config(_) => ErrorClass::Failed,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }

    pub fn is_unreachable(&self) -> bool {
        self.class() == ErrorClass::Unreachable
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// One-line rendering used in attempt results and the follow-up list
    pub fn detail(&self) -> String {
        format!("[{}] {}", self.class(), self)
    }
}

fn classify_kube_error(error: &kube::Error) -> ErrorClass {
    match error {
        kube::Error::Api(resp) => match resp.code {
            404 => ErrorClass::NotFound,
            409 => ErrorClass::Blocking,
            429 | 500..=599 => ErrorClass::Transient,
            _ => ErrorClass::Failed,
        },
        kube::Error::HyperError(_) | kube::Error::Service(_) => ErrorClass::Unreachable,
        _ => ErrorClass::Failed,
    }
}
