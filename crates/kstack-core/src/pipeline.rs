//! End-to-end deployment of one stack.
//!
//! Order: artifacts, precondition, namespace, conflict check, then per stage apply,
//! wait and hooks, and finally a status snapshot. Any failure aborts the run.

use crate::artifacts::{ArtifactReport, ArtifactResolver, ArtifactSource};
use crate::clock::Clock;
use crate::cluster::{ClusterClient, ClusterProbe, IdentitySource};
use crate::conflict::{ConflictResolver, OperatorPrompt};
use crate::deployer::Deployer;
use crate::error::{DeployError, DeployResult};
use crate::log::DeployLog;
use crate::namespace::{DeletePolicy, NamespaceReconciler};
use crate::precondition::EnvironmentPrecondition;
use crate::readiness::ReadinessWaiter;
use crate::status::{StatusReporter, StatusSnapshot};
use crate::types::{DeploymentTarget, OperatorDecision, ReconciliationVerdict, Resolution};

/// External collaborators the pipeline talks to.
#[derive(Clone, Copy)]
pub struct Ports<'a> {
    pub cluster: &'a dyn ClusterClient,
    pub probe: &'a dyn ClusterProbe,
    pub identity: &'a dyn IdentitySource,
    pub artifacts: &'a dyn ArtifactSource,
    pub prompt: &'a dyn OperatorPrompt,
    pub clock: &'a dyn Clock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Stages were applied and reached readiness.
    Deployed,
    /// The stack was already present and ready; nothing was applied.
    AlreadySatisfied,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub outcome: DeployOutcome,
    pub verdict: ReconciliationVerdict,
    pub decision: Option<OperatorDecision>,
    pub artifacts: ArtifactReport,
    pub applied_stages: Vec<String>,
    pub status: StatusSnapshot,
}

pub struct DeploymentPipeline<'a> {
    ports: Ports<'a>,
    operator: String,
    delete_policy: DeletePolicy,
    log: DeployLog,
}

impl<'a> DeploymentPipeline<'a> {
    pub fn new(ports: Ports<'a>, operator: impl Into<String>, log: DeployLog) -> Self {
        Self {
            ports,
            operator: operator.into(),
            delete_policy: DeletePolicy::default(),
            log,
        }
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn deploy(&self, target: &DeploymentTarget) -> DeployResult<PipelineReport> {
        self.log.info(format!(
            "Deploying stack '{}' into namespace '{}'",
            target.name, target.namespace
        ));

        let artifacts = ArtifactResolver::new(self.ports.artifacts, self.log.clone())
            .ensure(&target.required_artifacts)?;
        self.precondition().check()?;

        let namespaces = self.namespaces();
        namespaces.ensure(&target.namespace)?;

        let resolver = ConflictResolver::new(self.ports.cluster, self.log.clone());
        let classification = resolver.classify(&target.namespace, &target.naming)?;
        let mut decision = None;

        let (outcome, applied_stages) = match resolver.resolve(classification.verdict) {
            Resolution::Skip => {
                self.verify_ready(target)?;
                (DeployOutcome::AlreadySatisfied, Vec::new())
            }
            Resolution::Proceed => (DeployOutcome::Deployed, self.run_stages(target)?),
            Resolution::RequireDecision => {
                let chosen = resolver.decide(&classification, self.ports.prompt)?;
                decision = Some(chosen);
                if chosen == OperatorDecision::WipeAndRedeploy {
                    namespaces.delete(&target.namespace)?;
                    namespaces.ensure(&target.namespace)?;
                }
                (DeployOutcome::Deployed, self.run_stages(target)?)
            }
        };

        let status = self.status(target);
        match outcome {
            DeployOutcome::Deployed => self.log.info(format!(
                "Stack '{}' deployed ({} stages)",
                target.name,
                applied_stages.len()
            )),
            DeployOutcome::AlreadySatisfied => self.log.info(format!(
                "Stack '{}' already deployed and ready",
                target.name
            )),
        }

        Ok(PipelineReport {
            outcome,
            verdict: classification.verdict,
            decision,
            artifacts,
            applied_stages,
            status,
        })
    }

    /// Delete the stack's namespace and wait until it is gone.
    pub fn remove(&self, target: &DeploymentTarget) -> DeployResult<()> {
        self.log.info(format!(
            "Removing stack '{}' from namespace '{}'",
            target.name, target.namespace
        ));
        self.precondition().check()?;
        self.namespaces().delete(&target.namespace)?;
        self.log.info(format!("Stack '{}' removed", target.name));
        Ok(())
    }

    pub fn status(&self, target: &DeploymentTarget) -> StatusSnapshot {
        StatusReporter::new(self.ports.cluster, self.log.clone()).render(&target.namespace)
    }

    /// Identity check alone, without probing the cluster.
    pub fn verify_identity(&self) -> DeployResult<()> {
        self.precondition().verify_identity()
    }

    fn precondition(&self) -> EnvironmentPrecondition<'a> {
        EnvironmentPrecondition::new(
            self.ports.identity,
            self.ports.probe,
            self.operator.clone(),
            self.log.clone(),
        )
    }

    fn namespaces(&self) -> NamespaceReconciler<'a> {
        NamespaceReconciler::new(self.ports.cluster, self.ports.clock, self.log.clone())
            .with_policy(self.delete_policy)
    }

    fn run_stages(&self, target: &DeploymentTarget) -> DeployResult<Vec<String>> {
        let deployer = Deployer::new(self.ports.cluster, self.log.clone());
        let waiter = ReadinessWaiter::new(self.ports.cluster, self.ports.clock, self.log.clone());
        let mut applied = Vec::with_capacity(target.stages.len());
        for stage in &target.stages {
            deployer.apply(&target.namespace, stage)?;
            applied.push(stage.name.clone());
            waiter.wait(&target.namespace, stage)?;
            deployer.run_hooks(&target.namespace, stage)?;
        }
        Ok(applied)
    }

    /// Matching names are not proof of health: every stage must still be ready.
    fn verify_ready(&self, target: &DeploymentTarget) -> DeployResult<()> {
        let waiter = ReadinessWaiter::new(self.ports.cluster, self.ports.clock, self.log.clone());
        for stage in &target.stages {
            waiter.wait(&target.namespace, stage).map_err(|cause| {
                self.log.failure(DeployError::ExistingNotReady {
                    namespace: target.namespace.clone(),
                    cause: Box::new(cause),
                })
            })?;
        }
        Ok(())
    }
}
