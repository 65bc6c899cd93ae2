// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! `CloudApi` implemented on top of the provider's command-line tool

use crate::cloud::{aws, azure, classify_cli_failure, gcp, supported_kinds, CloudApi, NameFilter};
use crate::command::CommandRunner;
use crate::error::{Result, TeardownError};
use crate::types::{
    DeleteOutcome, DeploymentIdentity, ManagedServiceKind, ManagedServiceStatus, OrphanKind,
    OrphanResourceDescriptor, Provider,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Per-provider command construction and output parsing
pub trait CliDialect: Sync {
    fn program(&self) -> &'static str;

    fn probe_args(&self, identity: &DeploymentIdentity) -> Vec<String>;

    /// Extra validation of the probe output, e.g. that the account matches
    fn check_probe(&self, _identity: &DeploymentIdentity, _output: &Value) -> Result<()> {
        Ok(())
    }

    fn list_args(
        &self,
        kind: OrphanKind,
        identity: &DeploymentIdentity,
        filter: &NameFilter,
    ) -> Vec<String>;

    fn parse_list(
        &self,
        kind: OrphanKind,
        identity: &DeploymentIdentity,
        output: &Value,
    ) -> Result<Vec<OrphanResourceDescriptor>>;

    fn delete_args(
        &self,
        resource: &OrphanResourceDescriptor,
        identity: &DeploymentIdentity,
    ) -> Vec<String>;

    fn describe_args(
        &self,
        kind: ManagedServiceKind,
        name: &str,
        identity: &DeploymentIdentity,
    ) -> Vec<String>;

    fn parse_status(&self, kind: ManagedServiceKind, output: &Value) -> ManagedServiceStatus;
}

pub fn dialect_for(provider: Provider) -> &'static dyn CliDialect {
    match provider {
        Provider::Gcp => &gcp::Gcloud,
        Provider::Aws => &aws::AwsCli,
        Provider::Azure => &azure::AzureCli,
    }
}

pub struct CliCloudApi<R> {
    identity: DeploymentIdentity,
    runner: R,
    timeout: Duration,
    dialect: &'static dyn CliDialect,
}

impl<R: CommandRunner> CliCloudApi<R> {
    pub fn new(identity: DeploymentIdentity, runner: R, timeout: Duration) -> Self {
        let dialect = dialect_for(identity.provider());
        Self {
            identity,
            runner,
            timeout,
            dialect,
        }
    }

    async fn invoke(&self, operation: &str, args: Vec<String>) -> Result<String> {
        let output = self
            .runner
            .run(self.dialect.program(), &args, self.timeout)
            .await?;

        if output.success {
            Ok(output.stdout)
        } else {
            Err(classify_cli_failure(operation, &output.stderr))
        }
    }

    async fn invoke_json(&self, operation: &str, args: Vec<String>) -> Result<Value> {
        let stdout = self.invoke(operation, args).await?;
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&stdout).map_err(|e| {
            TeardownError::InvalidResponse(format!("{}: output is not JSON: {}", operation, e))
        })
    }
}

impl<R: CommandRunner> CloudApi for CliCloudApi<R> {
    #[instrument(skip(self), fields(provider = %self.identity.provider()))]
    async fn probe(&self) -> Result<()> {
        let output = self
            .invoke_json("probe cloud API", self.dialect.probe_args(&self.identity))
            .await?;
        self.dialect.check_probe(&self.identity, &output)?;
        debug!("Cloud API reachable for {}", self.identity.account_or_project());
        Ok(())
    }

    fn supported_kinds(&self) -> &'static [OrphanKind] {
        supported_kinds(self.identity.provider())
    }

    async fn list_resources(
        &self,
        kind: OrphanKind,
        filter: &NameFilter,
    ) -> Result<Vec<OrphanResourceDescriptor>> {
        if !self.supported_kinds().contains(&kind) {
            return Err(TeardownError::Unsupported(format!(
                "{} cannot list {} resources",
                self.identity.provider(),
                kind
            )));
        }
        let operation = format!("list {} resources", kind);
        let output = self
            .invoke_json(&operation, self.dialect.list_args(kind, &self.identity, filter))
            .await?;
        self.dialect.parse_list(kind, &self.identity, &output)
    }

    async fn delete_resource(&self, resource: &OrphanResourceDescriptor) -> Result<DeleteOutcome> {
        let operation = format!("delete {}", resource);
        match self
            .invoke(&operation, self.dialect.delete_args(resource, &self.identity))
            .await
        {
            Ok(_) => {
                info!("Deleted {}", resource);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if e.is_not_found() => {
                debug!("{} already absent", resource);
                Ok(DeleteOutcome::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    async fn describe_managed_service(
        &self,
        kind: ManagedServiceKind,
        name: &str,
    ) -> Result<ManagedServiceStatus> {
        let operation = format!("describe {} {}", kind, name);
        match self
            .invoke_json(&operation, self.dialect.describe_args(kind, name, &self.identity))
            .await
        {
            Ok(output) => Ok(self.dialect.parse_status(kind, &output)),
            Err(e) if e.is_not_found() => Ok(ManagedServiceStatus::Absent),
            Err(e) => Err(e),
        }
    }
}

/// String field lookup by JSON pointer
pub(crate) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Elements of a JSON array at `pointer` (the root when empty)
pub(crate) fn items_at<'a>(value: &'a Value, pointer: &str) -> Result<&'a Vec<Value>> {
    if value.is_null() {
        static EMPTY: Vec<Value> = Vec::new();
        return Ok(&EMPTY);
    }
    let target = if pointer.is_empty() {
        Some(value)
    } else {
        value.pointer(pointer)
    };
    target.and_then(Value::as_array).ok_or_else(|| {
        TeardownError::InvalidResponse(format!("expected a JSON array at '{}'", pointer))
    })
}

/// Status at `pointer`, or `Absent` when the object carries no such field
pub(crate) fn status_at(value: &Value, pointer: &str) -> ManagedServiceStatus {
    match str_at(value, pointer) {
        Some(status) => ManagedServiceStatus::Present(status.to_string()),
        None if value.is_null() => ManagedServiceStatus::Absent,
        None => ManagedServiceStatus::Present("UNKNOWN".to_string()),
    }
}

pub(crate) fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
