//! Configuration schema for kstack.toml
//!
//! One file declares the required operator, the cluster tooling and every stack
//! that can be deployed.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::git::GitSpec;
use crate::namespace::DeletePolicy;
use crate::types::{
    ArtifactRequirement, DeployStage, DeploymentTarget, ManifestLocator, NamingConvention,
    ReadinessSelector, StageHook,
};

/// Root configuration structure for kstack.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KstackConfig {
    /// Identity every mutating command must run as (case-sensitive)
    pub operator: String,

    /// Parent of per-stack directories when a stack does not name one
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Deployment log file; no file log when absent
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub cluster: ClusterSettings,

    /// Deployable stacks keyed by name
    #[serde(default)]
    pub stacks: BTreeMap<String, StackConfigEntry>,
}

/// Cluster tooling and namespace deletion polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSettings {
    #[serde(default = "default_kubectl")]
    pub kubectl: String,

    #[serde(default = "default_minikube")]
    pub minikube: String,

    /// git binary used to fetch missing artifacts
    #[serde(default = "default_git")]
    pub git: String,

    /// minikube profile passed to `minikube status`
    #[serde(default)]
    pub profile: Option<String>,

    /// kubeconfig context passed to every kubectl call
    #[serde(default)]
    pub context: Option<String>,

    #[serde(default = "default_delete_poll_attempts")]
    pub delete_poll_attempts: u32,

    #[serde(default = "default_delete_poll_interval_secs")]
    pub delete_poll_interval_secs: u64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            kubectl: default_kubectl(),
            minikube: default_minikube(),
            git: default_git(),
            profile: None,
            context: None,
            delete_poll_attempts: default_delete_poll_attempts(),
            delete_poll_interval_secs: default_delete_poll_interval_secs(),
        }
    }
}

/// One deployable stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfigEntry {
    pub namespace: String,

    /// Local artifact directory (defaults to `<workspace_root>/<namespace>`)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Remote holding the artifacts: URL or `github:org/repo[@ref][/path]`
    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default)]
    pub reference: Option<String>,

    #[serde(default)]
    pub subdir: Option<String>,

    /// Files that must exist in the stack directory before deploying
    #[serde(default)]
    pub artifacts: Vec<String>,

    /// Resource name prefixes that belong to this stack
    #[serde(default)]
    pub owned_prefixes: Vec<String>,

    #[serde(default)]
    pub stages: Vec<StageConfigEntry>,
}

/// One apply-then-wait step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfigEntry {
    pub name: String,

    /// Path relative to the stack directory, absolute path, or http(s) URL
    pub manifest: String,

    /// Label selector scoping readiness; whole namespace when absent
    #[serde(default)]
    pub selector: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub hooks: Vec<StageHook>,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("/opt/minikube/namespaces")
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

fn default_minikube() -> String {
    "minikube".to_string()
}

fn default_git() -> String {
    "git".to_string()
}

fn default_delete_poll_attempts() -> u32 {
    30
}

fn default_delete_poll_interval_secs() -> u64 {
    2
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_poll_interval_secs() -> u64 {
    10
}

impl KstackConfig {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            workspace_root: default_workspace_root(),
            log_file: None,
            cluster: ClusterSettings::default(),
            stacks: BTreeMap::new(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.operator.trim().is_empty() {
            anyhow::bail!("'operator' must not be empty");
        }
        if self.cluster.delete_poll_attempts == 0 {
            anyhow::bail!("'cluster.delete_poll_attempts' must be at least 1");
        }
        for (name, entry) in &self.stacks {
            entry
                .validate()
                .with_context(|| format!("Invalid stack configuration: '{}'", name))?;
        }
        Ok(())
    }

    pub fn stack(&self, name: &str) -> anyhow::Result<&StackConfigEntry> {
        self.stacks.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.stacks.keys().map(String::as_str).collect();
            anyhow::anyhow!(
                "Unknown stack '{}' (configured: {})",
                name,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            )
        })
    }

    /// Build the immutable deployment target for a stack.
    pub fn target(&self, name: &str) -> anyhow::Result<DeploymentTarget> {
        self.stack(name)?
            .to_target(name, &self.workspace_root)
            .with_context(|| format!("Invalid stack configuration: '{}'", name))
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        DeletePolicy {
            attempts: self.cluster.delete_poll_attempts,
            interval: Duration::from_secs(self.cluster.delete_poll_interval_secs),
        }
    }
}

impl StackConfigEntry {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.namespace.trim().is_empty() {
            anyhow::bail!("'namespace' must not be empty");
        }
        if self.stages.is_empty() {
            anyhow::bail!("at least one stage is required");
        }
        if self.owned_prefixes.iter().all(|p| p.trim().is_empty()) {
            anyhow::bail!("at least one non-empty owned prefix is required");
        }
        if !self.artifacts.is_empty() && self.repository.is_none() {
            anyhow::bail!("'repository' is required when artifacts are listed");
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name.as_str()) {
                anyhow::bail!("duplicate stage name '{}'", stage.name);
            }
            stage
                .validate()
                .with_context(|| format!("Invalid stage: '{}'", stage.name))?;
        }
        Ok(())
    }

    pub fn directory(&self, workspace_root: &Path) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| workspace_root.join(&self.namespace))
    }

    pub fn remote(&self) -> anyhow::Result<Option<GitSpec>> {
        let Some(repository) = &self.repository else {
            return Ok(None);
        };
        let mut spec = GitSpec::parse(repository)?;
        if let Some(reference) = &self.reference {
            spec = spec.with_reference(reference);
        }
        if let Some(subdir) = &self.subdir {
            spec = spec.with_subdir(subdir);
        }
        Ok(Some(spec))
    }

    pub fn to_target(&self, name: &str, workspace_root: &Path) -> anyhow::Result<DeploymentTarget> {
        let directory = self.directory(workspace_root);

        let required_artifacts = match self.remote()? {
            Some(remote) => self
                .artifacts
                .iter()
                .map(|artifact| ArtifactRequirement::new(artifact, &directory, remote.clone()))
                .collect(),
            None => Vec::new(),
        };

        let stages = self
            .stages
            .iter()
            .map(|stage| stage.to_stage(&directory))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(DeploymentTarget {
            name: name.to_string(),
            namespace: self.namespace.clone(),
            directory,
            required_artifacts,
            stages,
            naming: NamingConvention::new(
                self.owned_prefixes
                    .iter()
                    .filter(|p| !p.trim().is_empty())
                    .cloned(),
            ),
        })
    }
}

impl StageConfigEntry {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.manifest.trim().is_empty() {
            anyhow::bail!("'manifest' must not be empty");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("'poll_interval_secs' must be greater than zero");
        }
        if self.poll_interval_secs > self.timeout_secs {
            anyhow::bail!(
                "'poll_interval_secs' ({}) exceeds 'timeout_secs' ({})",
                self.poll_interval_secs,
                self.timeout_secs
            );
        }
        for hook in &self.hooks {
            if hook.pod.trim().is_empty() {
                anyhow::bail!("hook 'pod' must not be empty");
            }
            if hook.command.is_empty() {
                anyhow::bail!("hook for pod '{}' has an empty command", hook.pod);
            }
        }
        Ok(())
    }

    fn to_stage(&self, directory: &Path) -> anyhow::Result<DeployStage> {
        let manifest = ManifestLocator::resolve(&self.manifest, directory)
            .with_context(|| format!("Invalid manifest for stage '{}'", self.name))?;
        let selector = match &self.selector {
            Some(selector) if !selector.trim().is_empty() => {
                ReadinessSelector::Labels(selector.trim().to_string())
            }
            _ => ReadinessSelector::Namespace,
        };
        let mut stage = DeployStage::new(&self.name, manifest)
            .with_selector(selector)
            .with_timing(
                Duration::from_secs(self.timeout_secs),
                Duration::from_secs(self.poll_interval_secs),
            );
        for hook in &self.hooks {
            stage = stage.with_hook(hook.clone());
        }
        Ok(stage)
    }
}
