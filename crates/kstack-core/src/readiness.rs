//! Polling until a stage's workloads report ready, bounded by a hard deadline.
//!
//! Each tick lists the stage's workloads and feeds the rows to [`evaluate`]. An
//! empty listing counts as not ready yet: the controller may not have created any
//! pods. The wait never retries a failed listing.

use std::time::Duration;

use crate::clock::Clock;
use crate::cluster::ClusterClient;
use crate::error::{DeployError, DeployResult};
use crate::log::DeployLog;
use crate::types::{DeployStage, WorkloadRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitState {
    /// Still waiting; `short` lists the workloads not yet ready.
    Polling { short: Vec<WorkloadRow> },
    AllReady,
    /// Deadline reached with `short` still not ready.
    TimedOut { short: Vec<WorkloadRow> },
}

/// Transition for one tick.
///
/// `AllReady` requires a non-empty listing in which every row is ready on this
/// tick. Otherwise the state is `TimedOut` once `elapsed` reaches `timeout`, and
/// `Polling` before that.
pub fn evaluate(rows: &[WorkloadRow], elapsed: Duration, timeout: Duration) -> WaitState {
    let short: Vec<WorkloadRow> = rows.iter().filter(|r| !r.is_ready()).cloned().collect();
    if !rows.is_empty() && short.is_empty() {
        WaitState::AllReady
    } else if elapsed >= timeout {
        WaitState::TimedOut { short }
    } else {
        WaitState::Polling { short }
    }
}

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitReport {
    pub ticks: u32,
    pub elapsed: Duration,
}

pub struct ReadinessWaiter<'a> {
    client: &'a dyn ClusterClient,
    clock: &'a dyn Clock,
    log: DeployLog,
}

impl<'a> ReadinessWaiter<'a> {
    pub fn new(client: &'a dyn ClusterClient, clock: &'a dyn Clock, log: DeployLog) -> Self {
        Self { client, clock, log }
    }

    pub fn wait(&self, namespace: &str, stage: &DeployStage) -> DeployResult<WaitReport> {
        let selector = stage.selector.label_selector();
        let start = self.clock.now();
        let mut ticks = 0;
        self.log.info(format!(
            "Waiting up to {}s for stage '{}' to become ready",
            stage.timeout.as_secs(),
            stage.name
        ));

        loop {
            let elapsed = self.clock.now().saturating_sub(start);
            ticks += 1;
            let rows = self
                .client
                .list_workloads(namespace, selector)
                .map_err(|e| {
                    self.log.failure(DeployError::WorkloadListFailed {
                        stage: stage.name.clone(),
                        reason: e.to_string(),
                    })
                })?;

            match evaluate(&rows, elapsed, stage.timeout) {
                WaitState::AllReady => {
                    self.log.info(format!(
                        "Stage '{}' ready: {} workloads after {}s",
                        stage.name,
                        rows.len(),
                        elapsed.as_secs()
                    ));
                    return Ok(WaitReport { ticks, elapsed });
                }
                WaitState::TimedOut { short } => {
                    return Err(self.log.failure(DeployError::ReadinessTimeout {
                        stage: stage.name.clone(),
                        timeout: stage.timeout,
                        short,
                    }));
                }
                WaitState::Polling { short } => {
                    if short.is_empty() {
                        self.log.info(format!(
                            "Stage '{}': no workloads listed yet",
                            stage.name
                        ));
                    } else {
                        let names: Vec<String> = short.iter().map(ToString::to_string).collect();
                        self.log.info(format!(
                            "Stage '{}' waiting on: {}",
                            stage.name,
                            names.join(", ")
                        ));
                    }
                    let remaining = stage.timeout.saturating_sub(elapsed);
                    self.clock.sleep(stage.poll_interval.min(remaining));
                }
            }
        }
    }
}
