#![allow(dead_code)]

pub mod cluster;
pub mod git;

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use kstack_core::artifacts::ArtifactSource;
use kstack_core::clock::ManualClock;
use kstack_core::cluster::{ClusterProbe, ClusterResult, IdentitySource};
use kstack_core::conflict::{Classification, OperatorPrompt};
use kstack_core::error::{ClusterError, DeployResult};
use kstack_core::git::GitSpec;
use kstack_core::log::{DeployLog, LogLevel, MemorySink};
use kstack_core::namespace::DeletePolicy;
use kstack_core::pipeline::{DeploymentPipeline, Ports};
use kstack_core::types::{
    ArtifactRequirement, DeployStage, DeploymentTarget, ManifestLocator, NamingConvention,
    OperatorDecision, ReadinessSelector, StageHook,
};

#[allow(unused_imports)]
pub use cluster::{Call, FakeCluster};

pub const OPERATOR: &str = "muser";

// =============================================================================
// Fakes
// =============================================================================

pub struct FakeIdentity(pub String);

impl IdentitySource for FakeIdentity {
    fn current(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

pub struct FakeProbe {
    pub status: Option<String>,
    pub calls: Cell<usize>,
}

impl FakeProbe {
    pub fn running() -> Self {
        Self::reporting("Running")
    }

    pub fn reporting(status: &str) -> Self {
        Self {
            status: Some(status.to_string()),
            calls: Cell::new(0),
        }
    }
}

impl ClusterProbe for FakeProbe {
    fn status(&self) -> ClusterResult<String> {
        self.calls.set(self.calls.get() + 1);
        self.status.clone().ok_or_else(|| ClusterError::CommandFailed {
            command: "minikube status".to_string(),
            code: 85,
            stderr: "no such profile".to_string(),
        })
    }
}

/// Remote that contains a fixed set of files.
pub struct FakeSource {
    files: Vec<String>,
    fail: bool,
    fetches: Cell<usize>,
    last_dest: std::cell::RefCell<Option<PathBuf>>,
}

impl FakeSource {
    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            fail: false,
            fetches: Cell::new(0),
            last_dest: std::cell::RefCell::new(None),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Self::with_files(Vec::<String>::new())
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    pub fn last_dest(&self) -> Option<PathBuf> {
        self.last_dest.borrow().clone()
    }
}

impl ArtifactSource for FakeSource {
    fn fetch(&self, remote: &GitSpec, dest: &Path) -> anyhow::Result<PathBuf> {
        self.fetches.set(self.fetches.get() + 1);
        *self.last_dest.borrow_mut() = Some(dest.to_path_buf());
        if self.fail {
            anyhow::bail!("could not resolve host for {}", remote.repo_url);
        }
        std::fs::create_dir_all(dest)?;
        for file in &self.files {
            std::fs::write(dest.join(file), format!("# fetched {}\n", file))?;
        }
        Ok(dest.to_path_buf())
    }
}

/// Returns a fixed decision and counts how often it was asked.
pub struct CountingPrompt {
    decision: OperatorDecision,
    asked: Cell<usize>,
}

impl CountingPrompt {
    pub fn new(decision: OperatorDecision) -> Self {
        Self {
            decision,
            asked: Cell::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.get()
    }
}

impl OperatorPrompt for CountingPrompt {
    fn decide(&self, _conflict: &Classification) -> DeployResult<OperatorDecision> {
        self.asked.set(self.asked.get() + 1);
        Ok(self.decision)
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub cluster: FakeCluster,
    pub probe: FakeProbe,
    pub identity: FakeIdentity,
    pub source: FakeSource,
    pub prompt: CountingPrompt,
    pub clock: ManualClock,
    pub sink: Arc<MemorySink>,
}

impl Harness {
    pub fn new(cluster: FakeCluster) -> Self {
        Self {
            cluster,
            probe: FakeProbe::running(),
            identity: FakeIdentity(OPERATOR.to_string()),
            source: FakeSource::with_files(Vec::<String>::new()),
            prompt: CountingPrompt::new(OperatorDecision::Continue),
            clock: ManualClock::new(),
            sink: Arc::new(MemorySink::new()),
        }
    }

    pub fn with_source(mut self, source: FakeSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_prompt(mut self, decision: OperatorDecision) -> Self {
        self.prompt = CountingPrompt::new(decision);
        self
    }

    pub fn with_identity(mut self, name: &str) -> Self {
        self.identity = FakeIdentity(name.to_string());
        self
    }

    pub fn with_probe(mut self, probe: FakeProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn log(&self) -> DeployLog {
        DeployLog::new(self.sink.clone())
    }

    pub fn pipeline(&self) -> DeploymentPipeline<'_> {
        let ports = Ports {
            cluster: &self.cluster,
            probe: &self.probe,
            identity: &self.identity,
            artifacts: &self.source,
            prompt: &self.prompt,
            clock: &self.clock,
        };
        DeploymentPipeline::new(ports, OPERATOR, self.log()).with_delete_policy(DeletePolicy {
            attempts: 5,
            interval: Duration::from_secs(2),
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.sink.messages(LogLevel::Error)
    }
}

// =============================================================================
// Targets
// =============================================================================

/// Two-stage streaming stack whose artifacts live in `dir`.
pub fn streaming_target(dir: &Path) -> DeploymentTarget {
    let remote = GitSpec::new("https://github.com/TechSavvyRC/streaming.git");
    DeploymentTarget {
        name: "streaming".to_string(),
        namespace: "streaming".to_string(),
        directory: dir.to_path_buf(),
        required_artifacts: vec![
            ArtifactRequirement::new("kafka.yaml", dir, remote.clone()),
            ArtifactRequirement::new("redpanda.yaml", dir, remote),
        ],
        stages: vec![
            DeployStage::new("kafka", ManifestLocator::File(dir.join("kafka.yaml")))
                .with_selector(ReadinessSelector::Labels("app=kafka".to_string()))
                .with_timing(Duration::from_secs(60), Duration::from_secs(10))
                .with_hook(StageHook {
                    pod: "kafka-0".to_string(),
                    container: Some("kafka".to_string()),
                    command: vec![
                        "kafka-topics".to_string(),
                        "--create".to_string(),
                        "--topic".to_string(),
                        "ecom_transactions".to_string(),
                    ],
                }),
            DeployStage::new("redpanda", ManifestLocator::File(dir.join("redpanda.yaml")))
                .with_selector(ReadinessSelector::Labels("app=redpanda".to_string()))
                .with_timing(Duration::from_secs(60), Duration::from_secs(10)),
        ],
        naming: NamingConvention::new(["kafka", "redpanda"]),
    }
}

/// Write every artifact of `target` into its directory.
pub fn stage_artifacts(target: &DeploymentTarget) {
    for requirement in &target.required_artifacts {
        std::fs::write(&requirement.local_path, "# local\n").unwrap();
    }
}
