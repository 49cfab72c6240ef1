//! Namespace existence: idempotent creation and confirmed deletion.

use std::time::Duration;

use crate::clock::Clock;
use crate::cluster::ClusterClient;
use crate::error::{DeployError, DeployResult};
use crate::log::DeployLog;
use crate::types::NamespacePhase;

/// Bounded polling used while waiting for a namespace to disappear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletePolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for DeletePolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyActive,
    Created,
}

pub struct NamespaceReconciler<'a> {
    client: &'a dyn ClusterClient,
    clock: &'a dyn Clock,
    policy: DeletePolicy,
    log: DeployLog,
}

impl<'a> NamespaceReconciler<'a> {
    pub fn new(client: &'a dyn ClusterClient, clock: &'a dyn Clock, log: DeployLog) -> Self {
        Self {
            client,
            clock,
            policy: DeletePolicy::default(),
            log,
        }
    }

    pub fn with_policy(mut self, policy: DeletePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Make sure `namespace` exists and is active.
    ///
    /// An active namespace is left untouched. A namespace still terminating from an
    /// earlier deletion is waited out before it is created again.
    pub fn ensure(&self, namespace: &str) -> DeployResult<EnsureOutcome> {
        match self.lookup(namespace)? {
            Some(NamespacePhase::Active) => {
                self.log
                    .debug(format!("Namespace '{}' already exists", namespace));
                return Ok(EnsureOutcome::AlreadyActive);
            }
            Some(NamespacePhase::Terminating) => {
                self.log.info(format!(
                    "Namespace '{}' is terminating; waiting for it to disappear",
                    namespace
                ));
                self.wait_absent(namespace)?;
            }
            None => {}
        }

        self.client.namespace_create(namespace).map_err(|e| {
            self.log.failure(DeployError::NamespaceCreateFailed {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })
        })?;
        self.log.info(format!("Namespace '{}' created", namespace));
        Ok(EnsureOutcome::Created)
    }

    /// Delete `namespace` and return only once it is confirmed absent.
    pub fn delete(&self, namespace: &str) -> DeployResult<()> {
        if self.lookup(namespace)?.is_none() {
            self.log
                .info(format!("Namespace '{}' does not exist", namespace));
            return Ok(());
        }

        self.log.info(format!("Deleting namespace '{}'", namespace));
        self.client.namespace_delete(namespace).map_err(|e| {
            self.log.failure(DeployError::NamespaceDeleteFailed {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })
        })?;
        self.wait_absent(namespace)?;
        self.log.info(format!("Namespace '{}' deleted", namespace));
        Ok(())
    }

    fn lookup(&self, namespace: &str) -> DeployResult<Option<NamespacePhase>> {
        self.client.namespace_get(namespace).map_err(|e| {
            self.log.failure(DeployError::NamespaceLookupFailed {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })
        })
    }

    fn wait_absent(&self, namespace: &str) -> DeployResult<()> {
        for attempt in 1..=self.policy.attempts {
            let phase = self.client.namespace_get(namespace).map_err(|e| {
                self.log.failure(DeployError::NamespaceDeleteFailed {
                    namespace: namespace.to_string(),
                    reason: e.to_string(),
                })
            })?;
            if phase.is_none() {
                return Ok(());
            }
            self.log.debug(format!(
                "Namespace '{}' still present (check {}/{})",
                namespace, attempt, self.policy.attempts
            ));
            if attempt < self.policy.attempts {
                self.clock.sleep(self.policy.interval);
            }
        }
        Err(self.log.failure(DeployError::NamespaceDeleteTimeout {
            namespace: namespace.to_string(),
            attempts: self.policy.attempts,
        }))
    }
}
