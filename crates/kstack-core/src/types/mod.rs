//! Shared core types used across the pipeline, the cluster adapters and configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::git::GitSpec;

/// A named group of resources deployed into one namespace.
///
/// Built once from configuration and never mutated afterwards. Stages apply in
/// declared order; a later stage may assume an earlier stage's resources exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub name: String,
    pub namespace: String,
    /// Local directory holding the stack's artifacts.
    pub directory: PathBuf,
    pub required_artifacts: Vec<ArtifactRequirement>,
    pub stages: Vec<DeployStage>,
    pub naming: NamingConvention,
}

impl DeploymentTarget {
    /// Stage names in apply order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }
}

/// A local file that must exist before deployment, with the remote it can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequirement {
    /// Path of the file relative to the fetched tree (and to the stack directory).
    pub name: String,
    pub local_path: PathBuf,
    pub remote: GitSpec,
}

impl ArtifactRequirement {
    pub fn new(name: impl Into<String>, directory: &Path, remote: GitSpec) -> Self {
        let name = name.into();
        let local_path = directory.join(&name);
        Self {
            name,
            local_path,
            remote,
        }
    }

    pub fn is_present(&self) -> bool {
        self.local_path.is_file()
    }
}

/// One apply-then-wait step of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployStage {
    pub name: String,
    pub manifest: ManifestLocator,
    pub selector: ReadinessSelector,
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Commands run inside pods once the stage is ready.
    pub hooks: Vec<StageHook>,
}

impl DeployStage {
    pub fn new(name: impl Into<String>, manifest: ManifestLocator) -> Self {
        Self {
            name: name.into(),
            manifest,
            selector: ReadinessSelector::Namespace,
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(10),
            hooks: Vec::new(),
        }
    }

    pub fn with_selector(mut self, selector: ReadinessSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_hook(mut self, hook: StageHook) -> Self {
        self.hooks.push(hook);
        self
    }
}

/// Where a stage's resource definition lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLocator {
    File(PathBuf),
    Url(url::Url),
}

impl ManifestLocator {
    /// Resolve a configured manifest string against the stack directory.
    ///
    /// `http://` and `https://` locators stay remote; anything else is a path.
    pub fn resolve(raw: &str, directory: &Path) -> anyhow::Result<Self> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self::Url(url::Url::parse(raw)?));
        }
        let path = Path::new(raw);
        if path.is_absolute() {
            Ok(Self::File(path.to_path_buf()))
        } else {
            Ok(Self::File(directory.join(path)))
        }
    }

    /// The argument handed to the apply operation.
    pub fn as_apply_arg(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Url(url) => url.to_string(),
        }
    }
}

impl fmt::Display for ManifestLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_apply_arg())
    }
}

/// Which workloads belong to a stage for readiness purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessSelector {
    /// Every workload in the namespace.
    Namespace,
    /// Workloads matching a label selector such as `app=kafka`.
    Labels(String),
}

impl ReadinessSelector {
    pub fn label_selector(&self) -> Option<&str> {
        match self {
            Self::Namespace => None,
            Self::Labels(selector) => Some(selector),
        }
    }
}

/// A command executed in a pod after its stage is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHook {
    pub pod: String,
    #[serde(default)]
    pub container: Option<String>,
    pub command: Vec<String>,
}

/// Decides whether a resource name belongs to a deployment.
///
/// A name matches when it equals, or starts with, one of the owned prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamingConvention {
    prefixes: Vec<String>,
}

impl NamingConvention {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn matches(&self, name: &str) -> bool {
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

/// Observed readiness of a cluster resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadyState {
    Unknown,
    NotReady,
    Ready,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "-",
            Self::NotReady => "not ready",
            Self::Ready => "ready",
        };
        f.write_str(label)
    }
}

/// A resource snapshot produced by a listing call; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterResource {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub ready_state: ReadyState,
}

impl ClusterResource {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
            ready_state: ReadyState::Unknown,
        }
    }

    pub fn with_ready_state(mut self, state: ReadyState) -> Self {
        self.ready_state = state;
        self
    }
}

/// Lifecycle phase reported for an existing namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespacePhase {
    Active,
    Terminating,
}

/// One row of a workload listing used for readiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRow {
    pub name: String,
    pub ready: u32,
    pub desired: u32,
    pub phase: String,
}

impl WorkloadRow {
    pub fn new(name: impl Into<String>, ready: u32, desired: u32, phase: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready,
            desired,
            phase: phase.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready == self.desired
    }
}

impl fmt::Display for WorkloadRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{} ({})", self.name, self.ready, self.desired, self.phase)
    }
}

/// Classification of a namespace's existing contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationVerdict {
    /// No resources present.
    Empty,
    /// Every present resource follows the deployment's naming convention.
    ExpectedPresent,
    /// At least one present resource does not.
    Mixed,
}

/// What the pipeline does with a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Proceed,
    Skip,
    RequireDecision,
}

/// Operator answer to a Mixed verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorDecision {
    /// Deploy on top of the existing resources.
    Continue,
    /// Delete the namespace, recreate it, then deploy.
    WipeAndRedeploy,
}

impl OperatorDecision {
    /// Exactly `continue` or `wipe`; surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "continue" => Some(Self::Continue),
            "wipe" => Some(Self::WipeAndRedeploy),
            _ => None,
        }
    }
}
