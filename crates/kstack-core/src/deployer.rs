//! Stage application and post-readiness hooks.
//!
//! Failures stop the deployment; nothing already applied is rolled back.

use crate::cluster::ClusterClient;
use crate::error::{DeployError, DeployResult};
use crate::log::DeployLog;
use crate::types::DeployStage;

pub struct Deployer<'a> {
    client: &'a dyn ClusterClient,
    log: DeployLog,
}

impl<'a> Deployer<'a> {
    pub fn new(client: &'a dyn ClusterClient, log: DeployLog) -> Self {
        Self { client, log }
    }

    pub fn apply(&self, namespace: &str, stage: &DeployStage) -> DeployResult<()> {
        self.log.info(format!(
            "Applying stage '{}' from {}",
            stage.name, stage.manifest
        ));
        self.client.apply(&stage.manifest, namespace).map_err(|e| {
            self.log.failure(DeployError::ApplyFailed {
                stage: stage.name.clone(),
                reason: e.to_string(),
            })
        })?;
        self.log.info(format!("Stage '{}' applied", stage.name));
        Ok(())
    }

    /// Run the stage's hooks in declared order, stopping at the first failure.
    pub fn run_hooks(&self, namespace: &str, stage: &DeployStage) -> DeployResult<()> {
        for hook in &stage.hooks {
            self.log.info(format!(
                "Running hook in pod '{}': {}",
                hook.pod,
                hook.command.join(" ")
            ));
            let output = self
                .client
                .exec(namespace, &hook.pod, hook.container.as_deref(), &hook.command)
                .map_err(|e| {
                    self.log.failure(DeployError::HookFailed {
                        stage: stage.name.clone(),
                        pod: hook.pod.clone(),
                        reason: e.to_string(),
                    })
                })?;
            let output = output.trim();
            if !output.is_empty() {
                self.log.debug(format!("Hook output: {}", output));
            }
        }
        Ok(())
    }
}
