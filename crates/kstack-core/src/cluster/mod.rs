//! Narrow interfaces to the orchestrator, the cluster host and the invoking user.
//!
//! The pipeline only talks to the cluster through these traits. Real
//! implementations shell out to `kubectl` and `minikube`; tests use in-memory fakes.

mod identity;
mod kubectl;
mod minikube;

pub use identity::ProcessIdentity;
pub use kubectl::Kubectl;
pub use minikube::MinikubeProbe;

use crate::error::ClusterError;
use crate::types::{ClusterResource, ManifestLocator, NamespacePhase, WorkloadRow};

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Typed operations against the resource orchestrator.
pub trait ClusterClient {
    /// Existence and phase of a namespace; `None` when absent.
    fn namespace_get(&self, namespace: &str) -> ClusterResult<Option<NamespacePhase>>;

    /// Create a namespace. "Already exists" is not an error.
    fn namespace_create(&self, namespace: &str) -> ClusterResult<()>;

    /// Request deletion; returns before the namespace is gone.
    fn namespace_delete(&self, namespace: &str) -> ClusterResult<()>;

    /// Every resource currently in the namespace.
    fn list_resources(&self, namespace: &str) -> ClusterResult<Vec<ClusterResource>>;

    /// Apply a resource definition against a namespace.
    fn apply(&self, manifest: &ManifestLocator, namespace: &str) -> ClusterResult<()>;

    /// Workload rows for readiness, optionally narrowed by a label selector.
    fn list_workloads(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> ClusterResult<Vec<WorkloadRow>>;

    /// Run a command inside a pod.
    fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        command: &[String],
    ) -> ClusterResult<String>;
}

/// Reports the cluster host's status string.
pub trait ClusterProbe {
    fn status(&self) -> ClusterResult<String>;
}

/// Reports who is running the tool.
pub trait IdentitySource {
    fn current(&self) -> anyhow::Result<String>;
}
