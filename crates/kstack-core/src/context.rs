//! Application context for dependency injection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::clock::Clock;
use crate::cluster::{Kubectl, MinikubeProbe, ProcessIdentity};
use crate::config::{ConfigStore, KstackConfig};
use crate::conflict::OperatorPrompt;
use crate::git::GitFetcher;
use crate::log::{DeployLog, FileSink};
use crate::pipeline::{DeploymentPipeline, Ports};

/// Loaded configuration plus the real adapters built from it.
///
/// Frontends create this once and borrow the adapters into a
/// [`DeploymentPipeline`](crate::pipeline::DeploymentPipeline).
#[derive(Debug)]
pub struct AppContext {
    config_path: PathBuf,
    config: KstackConfig,
    log: DeployLog,
    kubectl: Kubectl,
    probe: MinikubeProbe,
    identity: ProcessIdentity,
    fetcher: GitFetcher,
}

impl AppContext {
    /// Discover and load the configuration, then build the adapters.
    pub fn load(explicit_config: Option<&Path>) -> anyhow::Result<Self> {
        let store = ConfigStore::discover(explicit_config)?;
        let config = store.load()?;
        Self::from_config(store.config_path().to_path_buf(), config)
    }

    pub fn from_config(config_path: PathBuf, config: KstackConfig) -> anyhow::Result<Self> {
        let log = match config.log_file.as_deref().map(FileSink::open) {
            Some(Ok(sink)) => DeployLog::new(Arc::new(sink)),
            Some(Err(e)) => {
                tracing::warn!(target: "kstack", "File logging disabled: {:#}", e);
                DeployLog::disabled()
            }
            None => DeployLog::disabled(),
        };

        let mut kubectl = Kubectl::new(&config.cluster.kubectl);
        if let Some(context) = &config.cluster.context {
            kubectl = kubectl.with_context(context);
        }
        let probe = MinikubeProbe::new(&config.cluster.minikube, config.cluster.profile.clone());
        let fetcher = GitFetcher::with_program(&config.cluster.git);

        Ok(Self {
            config_path,
            config,
            log,
            kubectl,
            probe,
            identity: ProcessIdentity,
            fetcher,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> &KstackConfig {
        &self.config
    }

    pub fn log(&self) -> &DeployLog {
        &self.log
    }

    /// Pipeline over the real adapters with the caller's prompt and clock.
    pub fn pipeline<'a>(
        &'a self,
        prompt: &'a dyn OperatorPrompt,
        clock: &'a dyn Clock,
    ) -> DeploymentPipeline<'a> {
        let ports = Ports {
            cluster: &self.kubectl,
            probe: &self.probe,
            identity: &self.identity,
            artifacts: &self.fetcher,
            prompt,
            clock,
        };
        DeploymentPipeline::new(ports, self.config.operator.clone(), self.log.clone())
            .with_delete_policy(self.config.delete_policy())
    }
}
