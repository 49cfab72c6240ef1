//! Checks that must pass before anything in the cluster is touched.

use crate::cluster::{ClusterProbe, IdentitySource};
use crate::error::{DeployError, DeployResult};
use crate::log::DeployLog;

pub struct EnvironmentPrecondition<'a> {
    identity: &'a dyn IdentitySource,
    probe: &'a dyn ClusterProbe,
    required_identity: String,
    log: DeployLog,
}

impl<'a> EnvironmentPrecondition<'a> {
    pub fn new(
        identity: &'a dyn IdentitySource,
        probe: &'a dyn ClusterProbe,
        required_identity: impl Into<String>,
        log: DeployLog,
    ) -> Self {
        Self {
            identity,
            probe,
            required_identity: required_identity.into(),
            log,
        }
    }

    /// Identity first, then cluster liveness. Read-only.
    pub fn check(&self) -> DeployResult<()> {
        self.verify_identity()?;
        self.verify_cluster()
    }

    /// Case-sensitive comparison against the configured operator.
    pub fn verify_identity(&self) -> DeployResult<()> {
        let actual = self.identity.current().map_err(|e| {
            self.log.failure(DeployError::IdentityUnavailable {
                reason: format!("{:#}", e),
            })
        })?;
        if actual != self.required_identity {
            return Err(self.log.failure(DeployError::WrongIdentity {
                expected: self.required_identity.clone(),
                actual,
            }));
        }
        self.log.debug(format!("Running as '{}'", actual));
        Ok(())
    }

    pub fn verify_cluster(&self) -> DeployResult<()> {
        let status = self.probe.status().map_err(|e| {
            self.log.failure(DeployError::ClusterProbeFailed {
                reason: e.to_string(),
            })
        })?;
        if !is_running(&status) {
            return Err(self.log.failure(DeployError::ClusterNotRunning { status }));
        }
        self.log.debug(format!("Cluster status: {}", status.trim()));
        Ok(())
    }
}

fn is_running(status: &str) -> bool {
    status.to_ascii_lowercase().contains("running")
}
