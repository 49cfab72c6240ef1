//! Error types for deployments and cluster adapters.

use std::time::Duration;

use thiserror::Error;

use crate::types::WorkloadRow;

/// Result type alias for pipeline operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Coarse failure category, one per class of abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Wrong identity or cluster not live. Nothing was mutated.
    Precondition,
    /// Fetch failed or a file is missing after fetch.
    Artifact,
    /// Namespace lookup, creation or deletion failed.
    Namespace,
    /// An apply, listing or hook was rejected.
    Deployment,
    /// Workloads did not become ready in time.
    Readiness,
    /// The operator prompt could not be answered.
    Operator,
}

/// Fatal pipeline failure.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("must be run as '{expected}', current identity is '{actual}'")]
    WrongIdentity { expected: String, actual: String },

    #[error("could not determine the invoking identity: {reason}")]
    IdentityUnavailable { reason: String },

    #[error("cluster is not running (status: {status})")]
    ClusterNotRunning { status: String },

    #[error("failed to query cluster status: {reason}")]
    ClusterProbeFailed { reason: String },

    #[error("failed to fetch {repository}: {reason}")]
    ArtifactFetchFailed { repository: String, reason: String },

    #[error("required artifact '{name}' not found locally or in the remote source")]
    ArtifactMissing { name: String },

    #[error("failed to copy artifact '{name}': {reason}")]
    ArtifactCopyFailed { name: String, reason: String },

    #[error("failed to look up namespace '{namespace}': {reason}")]
    NamespaceLookupFailed { namespace: String, reason: String },

    #[error("failed to create namespace '{namespace}': {reason}")]
    NamespaceCreateFailed { namespace: String, reason: String },

    #[error("failed to delete namespace '{namespace}': {reason}")]
    NamespaceDeleteFailed { namespace: String, reason: String },

    #[error("namespace '{namespace}' still present after {attempts} checks")]
    NamespaceDeleteTimeout { namespace: String, attempts: u32 },

    #[error("failed to list resources in namespace '{namespace}': {reason}")]
    ResourceListFailed { namespace: String, reason: String },

    #[error("apply failed for stage '{stage}': {reason}")]
    ApplyFailed { stage: String, reason: String },

    #[error("failed to list workloads for stage '{stage}': {reason}")]
    WorkloadListFailed { stage: String, reason: String },

    #[error(
        "stage '{stage}' not ready after {}s; still waiting on: {}",
        .timeout.as_secs(),
        describe_short(.short)
    )]
    ReadinessTimeout {
        stage: String,
        timeout: Duration,
        short: Vec<WorkloadRow>,
    },

    #[error(
        "namespace '{namespace}' already holds this stack's resources but they are not ready \
         (nothing was re-applied): {cause}; run `kstack remove` and deploy again to recover"
    )]
    ExistingNotReady {
        namespace: String,
        cause: Box<DeployError>,
    },

    #[error("hook in pod '{pod}' failed for stage '{stage}': {reason}")]
    HookFailed {
        stage: String,
        pod: String,
        reason: String,
    },

    #[error("no operator decision received: {reason}")]
    OperatorAborted { reason: String },
}

impl DeployError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::WrongIdentity { .. }
            | Self::IdentityUnavailable { .. }
            | Self::ClusterNotRunning { .. }
            | Self::ClusterProbeFailed { .. } => FailureKind::Precondition,
            Self::ArtifactFetchFailed { .. }
            | Self::ArtifactMissing { .. }
            | Self::ArtifactCopyFailed { .. } => FailureKind::Artifact,
            Self::NamespaceLookupFailed { .. }
            | Self::NamespaceCreateFailed { .. }
            | Self::NamespaceDeleteFailed { .. }
            | Self::NamespaceDeleteTimeout { .. } => FailureKind::Namespace,
            Self::ResourceListFailed { .. }
            | Self::ApplyFailed { .. }
            | Self::WorkloadListFailed { .. }
            | Self::HookFailed { .. } => FailureKind::Deployment,
            Self::ReadinessTimeout { .. } | Self::ExistingNotReady { .. } => {
                FailureKind::Readiness
            }
            Self::OperatorAborted { .. } => FailureKind::Operator,
        }
    }
}

fn describe_short(short: &[WorkloadRow]) -> String {
    if short.is_empty() {
        return "no workloads observed".to_string();
    }
    short
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure of a call into the cluster tooling.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("unexpected output from {command}: {reason}")]
    Decode { command: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_timeout_names_every_short_workload() {
        let err = DeployError::ReadinessTimeout {
            stage: "kafka".to_string(),
            timeout: Duration::from_secs(300),
            short: vec![
                WorkloadRow::new("kafka-0", 0, 1, "Pending"),
                WorkloadRow::new("kafka-1", 1, 2, "Running"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "stage 'kafka' not ready after 300s; still waiting on: kafka-0 0/1 (Pending), kafka-1 1/2 (Running)"
        );
        assert_eq!(err.kind(), FailureKind::Readiness);
    }

    #[test]
    fn readiness_timeout_without_rows() {
        let err = DeployError::ReadinessTimeout {
            stage: "mysql".to_string(),
            timeout: Duration::from_secs(30),
            short: Vec::new(),
        };
        assert!(err.to_string().ends_with("no workloads observed"));
    }

    #[test]
    fn existing_not_ready_points_at_remove() {
        let err = DeployError::ExistingNotReady {
            namespace: "streaming".to_string(),
            cause: Box::new(DeployError::ReadinessTimeout {
                stage: "redpanda".to_string(),
                timeout: Duration::from_secs(300),
                short: Vec::new(),
            }),
        };
        let message = err.to_string();
        assert!(message.contains("stage 'redpanda' not ready after 300s"));
        assert!(message.ends_with("run `kstack remove` and deploy again to recover"));
        assert_eq!(err.kind(), FailureKind::Readiness);
    }

    #[test]
    fn failure_kinds_follow_taxonomy() {
        let wrong = DeployError::WrongIdentity {
            expected: "muser".to_string(),
            actual: "root".to_string(),
        };
        assert_eq!(wrong.kind(), FailureKind::Precondition);
        assert_eq!(
            wrong.to_string(),
            "must be run as 'muser', current identity is 'root'"
        );

        let missing = DeployError::ArtifactMissing {
            name: "kafka.yaml".to_string(),
        };
        assert_eq!(missing.kind(), FailureKind::Artifact);

        let apply = DeployError::ApplyFailed {
            stage: "redpanda".to_string(),
            reason: "denied".to_string(),
        };
        assert_eq!(apply.kind(), FailureKind::Deployment);

        let timeout = DeployError::NamespaceDeleteTimeout {
            namespace: "streaming".to_string(),
            attempts: 30,
        };
        assert_eq!(timeout.kind(), FailureKind::Namespace);
    }
}
