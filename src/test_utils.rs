// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mocked Kubernetes API and recording stubs for the ports.

use crate::cloud::{CloudApi, NameFilter};
use crate::command::{CommandOutput, CommandRunner};
use crate::config::Timings;
use crate::error::{Result, TeardownError};
use crate::kubernetes::{ClusterApi, Selector};
use crate::provisioner::{Provisioner, StateHandle};
use crate::types::{
    BlockingKind, BlockingResourceDescriptor, DeleteOutcome, ManagedServiceKind,
    ManagedServiceStatus, NamespacePhase, OrphanKind, OrphanResourceDescriptor,
};
use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);

        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        },
        "status": { "phase": "Active" }
    })
    .to_string()
}

/// A namespace stuck on its finalizers
pub fn terminating_namespace_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid",
            "deletionTimestamp": "2026-01-01T00:00:00Z"
        },
        "spec": { "finalizers": ["kubernetes"] },
        "status": { "phase": "Terminating" }
    })
    .to_string()
}

/// Wrap items into a Kubernetes list response
pub fn list_json(kind: &str, api_version: &str, items: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Delays shrunk to nothing so phase tests run instantly
pub fn immediate_timings() -> Timings {
    Timings {
        call_timeout: Duration::from_secs(5),
        transient_attempts: 3,
        transient_backoff: Duration::ZERO,
        namespace_wait: Duration::ZERO,
        namespace_poll: Duration::ZERO,
        settle_delay: Duration::ZERO,
        destroy_timeout: Duration::from_secs(5),
        in_use_polls: 2,
        in_use_poll_interval: Duration::ZERO,
    }
}

/// Ordered record of every port call, shared between stubs
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count_prefixed(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

pub fn cli_ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        success: true,
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn cli_err(stderr: &str) -> CommandOutput {
    CommandOutput {
        success: false,
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// `CommandRunner` replaying canned outputs in order
#[derive(Clone)]
pub struct ScriptedRunner {
    outputs: Arc<Mutex<VecDeque<CommandOutput>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new(outputs: Vec<CommandOutput>) -> Self {
        Self {
            outputs: Arc::new(Mutex::new(outputs.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every invocation as `program arg1 arg2 ...`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().unwrap().push(line.clone());

        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TeardownError::CommandFailed(format!("unscripted call: {}", line)))
    }
}

#[derive(Default)]
struct ClusterState {
    objects: Vec<BlockingResourceDescriptor>,
    stuck_namespaces: HashSet<String>,
    terminating: HashSet<String>,
    failing: HashSet<String>,
}

/// In-memory cluster recording every call it receives
#[derive(Clone)]
pub struct RecordingCluster {
    log: CallLog,
    reachable: bool,
    state: Arc<Mutex<ClusterState>>,
}

impl RecordingCluster {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            reachable: true,
            state: Arc::new(Mutex::new(ClusterState::default())),
        }
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn with_object(self, object: BlockingResourceDescriptor) -> Self {
        self.state.lock().unwrap().objects.push(object);
        self
    }

    /// Namespace that goes `Terminating` on delete and only disappears once
    /// its finalizers are cleared
    pub fn with_stuck_namespace(self, name: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.objects.push(BlockingResourceDescriptor::cluster_scoped(
                BlockingKind::FinalizerHeldNamespace,
                "Namespace",
                name,
            ));
            state.stuck_namespaces.insert(name.to_string());
        }
        self
    }

    /// Namespace already `Terminating` with a finalizer present. Like the
    /// API server, deleting it again answers with a conflict.
    pub fn with_terminating_namespace(self, name: &str) -> Self {
        let cluster = self.with_stuck_namespace(name);
        cluster
            .state
            .lock()
            .unwrap()
            .terminating
            .insert(name.to_string());
        cluster
    }

    /// Deleting this identifier fails with a conflict
    pub fn failing_delete(self, identifier: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(identifier.to_string());
        self
    }

    pub fn remaining(&self) -> Vec<BlockingResourceDescriptor> {
        self.state.lock().unwrap().objects.clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(TeardownError::Unreachable(
                "dial tcp 10.0.0.1:443: connect: connection refused".to_string(),
            ))
        }
    }
}

impl ClusterApi for RecordingCluster {
    async fn probe(&self) -> Result<()> {
        self.log.record("cluster.probe");
        self.check_reachable()
    }

    async fn list_resources(
        &self,
        kind: BlockingKind,
        selector: &Selector,
    ) -> Result<Vec<BlockingResourceDescriptor>> {
        self.log.record(format!("cluster.list {}", kind));
        self.check_reachable()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .objects
            .iter()
            .filter(|o| o.kind == kind && selector.matches(&o.identifier))
            .cloned()
            .collect())
    }

    async fn delete_resource(
        &self,
        resource: &BlockingResourceDescriptor,
    ) -> Result<DeleteOutcome> {
        self.log.record(format!("cluster.delete {}", resource));
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();

        if state.failing.contains(&resource.identifier) {
            return Err(TeardownError::Blocking(format!(
                "{} is held by an admission webhook",
                resource
            )));
        }
        if state.terminating.contains(&resource.identifier) {
            return Err(TeardownError::Blocking(format!(
                "namespace {} is terminating: the system is ensuring all content is removed",
                resource.identifier
            )));
        }
        if state.stuck_namespaces.contains(&resource.identifier) {
            state.terminating.insert(resource.identifier.clone());
            return Ok(DeleteOutcome::Deleted);
        }

        let before = state.objects.len();
        state.objects.retain(|o| o != resource);
        if state.objects.len() < before {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    async fn namespace_phase(&self, name: &str) -> Result<Option<NamespacePhase>> {
        self.log.record(format!("cluster.namespace_phase {}", name));
        self.check_reachable()?;
        let state = self.state.lock().unwrap();

        let exists = state
            .objects
            .iter()
            .any(|o| o.kind == BlockingKind::FinalizerHeldNamespace && o.identifier == name);
        Ok(match (exists, state.terminating.contains(name)) {
            (false, _) => None,
            (true, true) => Some(NamespacePhase::Terminating),
            (true, false) => Some(NamespacePhase::Active),
        })
    }

    async fn clear_finalizers(&self, namespace: &str) -> Result<()> {
        self.log.record(format!("cluster.clear_finalizers {}", namespace));
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();

        if state.terminating.remove(namespace) {
            state.stuck_namespaces.remove(namespace);
            state.objects.retain(|o| {
                !(o.kind == BlockingKind::FinalizerHeldNamespace && o.identifier == namespace)
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct CloudState {
    resources: Vec<OrphanResourceDescriptor>,
    /// Lists remaining before an in-use resource is released
    release_after: HashMap<String, u32>,
    managed: HashMap<ManagedServiceKind, ManagedServiceStatus>,
}

/// In-memory cloud recording every call it receives.
///
/// Listing ignores the name filter, like a provider without server-side
/// filtering, so callers must narrow results themselves.
#[derive(Clone)]
pub struct RecordingCloud {
    log: CallLog,
    reachable: bool,
    supported: &'static [OrphanKind],
    state: Arc<Mutex<CloudState>>,
}

impl RecordingCloud {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            reachable: true,
            supported: crate::cloud::supported_kinds(crate::types::Provider::Gcp),
            state: Arc::new(Mutex::new(CloudState::default())),
        }
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn supporting(mut self, kinds: &'static [OrphanKind]) -> Self {
        self.supported = kinds;
        self
    }

    pub fn with_resource(self, resource: OrphanResourceDescriptor) -> Self {
        self.state.lock().unwrap().resources.push(resource);
        self
    }

    /// An in-use resource that detaches after `lists` listings
    pub fn with_attached(self, mut resource: OrphanResourceDescriptor, lists: u32) -> Self {
        resource.in_use = true;
        {
            let mut state = self.state.lock().unwrap();
            state.release_after.insert(resource.handle.clone(), lists);
            state.resources.push(resource);
        }
        self
    }

    pub fn with_managed(self, kind: ManagedServiceKind, status: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .managed
            .insert(kind, ManagedServiceStatus::Present(status.to_string()));
        self
    }

    pub fn remaining(&self) -> Vec<OrphanResourceDescriptor> {
        self.state.lock().unwrap().resources.clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(TeardownError::Unreachable(
                "Could not resolve host: compute.googleapis.com".to_string(),
            ))
        }
    }
}

pub fn orphan(kind: OrphanKind, name: &str) -> OrphanResourceDescriptor {
    OrphanResourceDescriptor {
        kind,
        identifier: name.to_string(),
        location: "us-central1-a".to_string(),
        handle: name.to_string(),
        in_use: false,
    }
}

impl CloudApi for RecordingCloud {
    async fn probe(&self) -> Result<()> {
        self.log.record("cloud.probe");
        self.check_reachable()
    }

    fn supported_kinds(&self) -> &'static [OrphanKind] {
        self.supported
    }

    async fn list_resources(
        &self,
        kind: OrphanKind,
        _filter: &NameFilter,
    ) -> Result<Vec<OrphanResourceDescriptor>> {
        self.log.record(format!("cloud.list {}", kind));
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        let CloudState {
            resources,
            release_after,
            ..
        } = &mut *state;

        for resource in resources.iter_mut().filter(|r| r.kind == kind && r.in_use) {
            if let Some(left) = release_after.get_mut(&resource.handle) {
                if *left == 0 {
                    resource.in_use = false;
                } else {
                    *left -= 1;
                }
            }
        }

        Ok(resources.iter().filter(|r| r.kind == kind).cloned().collect())
    }

    async fn delete_resource(&self, resource: &OrphanResourceDescriptor) -> Result<DeleteOutcome> {
        self.log
            .record(format!("cloud.delete {} {}", resource.kind, resource.identifier));
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();

        let Some(pos) = state
            .resources
            .iter()
            .position(|r| r.kind == resource.kind && r.handle == resource.handle)
        else {
            return Ok(DeleteOutcome::NotFound);
        };
        if state.resources[pos].in_use {
            return Err(TeardownError::Blocking(format!(
                "{} is in use",
                resource.identifier
            )));
        }
        state.resources.remove(pos);
        Ok(DeleteOutcome::Deleted)
    }

    async fn describe_managed_service(
        &self,
        kind: ManagedServiceKind,
        name: &str,
    ) -> Result<ManagedServiceStatus> {
        self.log.record(format!("cloud.describe {} {}", kind, name));
        self.check_reachable()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .managed
            .get(&kind)
            .cloned()
            .unwrap_or(ManagedServiceStatus::Absent))
    }
}

/// Provisioner returning scripted destroy outcomes in order, then success
#[derive(Clone)]
pub struct ScriptedProvisioner {
    log: CallLog,
    handle: Option<StateHandle>,
    outcomes: Arc<Mutex<VecDeque<Result<()>>>>,
}

impl ScriptedProvisioner {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            handle: Some(StateHandle::new("/work/infra")),
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn without_state(mut self) -> Self {
        self.handle = None;
        self
    }

    pub fn failing_with(self, message: &str) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(TeardownError::CommandFailed(message.to_string())));
        self
    }
}

impl Provisioner for ScriptedProvisioner {
    async fn state_handle(&self) -> Option<StateHandle> {
        self.log.record("provisioner.state_handle");
        self.handle.clone()
    }

    async fn destroy(&self, handle: &StateHandle) -> Result<()> {
        self.log.record(format!("provisioner.destroy {}", handle));
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}
