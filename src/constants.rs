// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Cluster components whose objects block namespace and cluster deletion
pub mod blocking {
    /// Name fragments identifying policy-engine and runtime-security webhooks
    pub const WEBHOOK_OWNERS: &[&str] = &["kyverno", "tetragon"];

    /// Namespaces hosting the policy engine and runtime-security agent
    pub const COMPONENT_NAMESPACES: &[&str] = &["kyverno", "tetragon"];

    /// Namespaces the sweeper refuses to touch
    pub const PROTECTED_NAMESPACES: &[&str] =
        &["default", "kube-system", "kube-public", "kube-node-lease"];

    /// Kinds that hold workload data and are never deleted by the sweeper
    pub const DATA_BEARING_KINDS: &[&str] = &[
        "PersistentVolume",
        "PersistentVolumeClaim",
        "StatefulSet",
        "Secret",
        "ConfigMap",
    ];

    pub const VALIDATING_WEBHOOK: &str = "ValidatingWebhookConfiguration";
    pub const MUTATING_WEBHOOK: &str = "MutatingWebhookConfiguration";
    pub const CLUSTER_POLICY: &str = "ClusterPolicy";
    pub const TRACING_POLICY: &str = "TracingPolicy";
    pub const NAMESPACE: &str = "Namespace";
    pub const SCALED_OBJECT: &str = "ScaledObject";
    pub const SERVICE: &str = "Service";
}

/// Group/version/plural for the custom and admission kinds swept by name
pub mod api {
    /// (kind, group, version, plural, namespaced)
    pub const RESOURCES: &[(&str, &str, &str, &str, bool)] = &[
        (
            super::blocking::VALIDATING_WEBHOOK,
            "admissionregistration.k8s.io",
            "v1",
            "validatingwebhookconfigurations",
            false,
        ),
        (
            super::blocking::MUTATING_WEBHOOK,
            "admissionregistration.k8s.io",
            "v1",
            "mutatingwebhookconfigurations",
            false,
        ),
        (super::blocking::CLUSTER_POLICY, "kyverno.io", "v1", "clusterpolicies", false),
        (super::blocking::TRACING_POLICY, "cilium.io", "v1alpha1", "tracingpolicies", false),
        (super::blocking::SCALED_OBJECT, "keda.sh", "v1alpha1", "scaledobjects", true),
    ];
}

/// Timing defaults, all overridable through configuration
pub mod timing {
    /// Per-call timeout for cluster and cloud API calls
    pub const CALL_TIMEOUT_SECS: u64 = 30;
    /// Attempts for calls failing with a transient error
    pub const TRANSIENT_ATTEMPTS: u32 = 3;
    /// Fixed delay between transient retries
    pub const TRANSIENT_BACKOFF_SECS: u64 = 2;
    /// How long a deleted namespace may stay Terminating before finalizers are cleared
    pub const NAMESPACE_WAIT_SECS: u64 = 30;
    /// Poll interval while waiting for a namespace to go away
    pub const NAMESPACE_POLL_SECS: u64 = 5;
    /// Pause after the last sweep batch so the control plane starts reconciling
    pub const SETTLE_DELAY_SECS: u64 = 10;
    /// Timeout for the declarative destroy command
    pub const DESTROY_TIMEOUT_SECS: u64 = 45 * 60;
    /// Re-list attempts for disks and addresses still in use
    pub const IN_USE_POLLS: u32 = 3;
    /// Delay between in-use re-lists
    pub const IN_USE_POLL_SECS: u64 = 10;
}

/// Process exit codes
pub mod exit_codes {
    pub const CLEAN: u8 = 0;
    pub const INCOMPLETE: u8 = 1;
    pub const CANCELLED: u8 = 3;
    pub const STARTUP_FAILURE: u8 = 4;
}
