//! Classification of a namespace's existing contents and the operator decision
//! that settles a conflict.
//!
//! The verdict is recomputed from a fresh listing on every call and never cached.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};

use crate::cluster::ClusterClient;
use crate::error::{DeployError, DeployResult};
use crate::log::DeployLog;
use crate::types::{
    ClusterResource, NamingConvention, OperatorDecision, ReconciliationVerdict, Resolution,
};

/// A verdict together with the listing it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub namespace: String,
    pub verdict: ReconciliationVerdict,
    pub resources: Vec<ClusterResource>,
    /// Resources that do not follow the naming convention.
    pub foreign: Vec<ClusterResource>,
}

/// Pure classification of a listing against a naming convention.
pub fn classify_resources(
    resources: &[ClusterResource],
    naming: &NamingConvention,
) -> ReconciliationVerdict {
    if resources.is_empty() {
        ReconciliationVerdict::Empty
    } else if resources.iter().all(|r| naming.matches(&r.name)) {
        ReconciliationVerdict::ExpectedPresent
    } else {
        ReconciliationVerdict::Mixed
    }
}

/// Policy applied to each verdict.
pub fn resolve(verdict: ReconciliationVerdict) -> Resolution {
    match verdict {
        ReconciliationVerdict::Empty => Resolution::Proceed,
        ReconciliationVerdict::ExpectedPresent => Resolution::Skip,
        ReconciliationVerdict::Mixed => Resolution::RequireDecision,
    }
}

pub struct ConflictResolver<'a> {
    client: &'a dyn ClusterClient,
    log: DeployLog,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(client: &'a dyn ClusterClient, log: DeployLog) -> Self {
        Self { client, log }
    }

    pub fn classify(
        &self,
        namespace: &str,
        naming: &NamingConvention,
    ) -> DeployResult<Classification> {
        let resources = self.client.list_resources(namespace).map_err(|e| {
            self.log.failure(DeployError::ResourceListFailed {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })
        })?;
        let verdict = classify_resources(&resources, naming);
        let foreign: Vec<ClusterResource> = resources
            .iter()
            .filter(|r| !naming.matches(&r.name))
            .cloned()
            .collect();

        match verdict {
            ReconciliationVerdict::Empty => {
                self.log
                    .info(format!("Namespace '{}' has no resources", namespace));
            }
            ReconciliationVerdict::ExpectedPresent => self.log.info(format!(
                "Namespace '{}' already holds {} resources of this stack",
                namespace,
                resources.len()
            )),
            ReconciliationVerdict::Mixed => self.log.info(format!(
                "Namespace '{}' holds {} resources not owned by this stack: {}",
                namespace,
                foreign.len(),
                foreign
                    .iter()
                    .map(|r| format!("{}/{}", r.kind, r.name))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }

        Ok(Classification {
            namespace: namespace.to_string(),
            verdict,
            resources,
            foreign,
        })
    }

    pub fn resolve(&self, verdict: ReconciliationVerdict) -> Resolution {
        let resolution = resolve(verdict);
        self.log
            .debug(format!("Verdict {:?} resolves to {:?}", verdict, resolution));
        resolution
    }

    /// Ask the operator how to settle a Mixed namespace.
    pub fn decide(
        &self,
        classification: &Classification,
        prompt: &dyn OperatorPrompt,
    ) -> DeployResult<OperatorDecision> {
        let decision = prompt
            .decide(classification)
            .map_err(|e| self.log.failure(e))?;
        self.log.info(format!(
            "Operator chose {:?} for namespace '{}'",
            decision, classification.namespace
        ));
        Ok(decision)
    }
}

/// Source of the operator's answer to a Mixed verdict.
pub trait OperatorPrompt {
    fn decide(&self, conflict: &Classification) -> DeployResult<OperatorDecision>;
}

/// Answers every conflict the same way; used for scripted runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub OperatorDecision);

impl OperatorPrompt for FixedDecision {
    fn decide(&self, _conflict: &Classification) -> DeployResult<OperatorDecision> {
        Ok(self.0)
    }
}

/// Line-based prompt. Accepts `continue` or `wipe` and asks again on anything else.
pub struct TerminalPrompt<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    pub fn into_output(self) -> W {
        self.output.into_inner()
    }

    fn describe(&self, conflict: &Classification) -> io::Result<()> {
        let mut out = self.output.borrow_mut();
        writeln!(
            out,
            "Namespace '{}' contains resources that are not part of this stack:",
            conflict.namespace
        )?;
        for resource in &conflict.foreign {
            writeln!(out, "  {}/{}", resource.kind, resource.name)?;
        }
        Ok(())
    }

    fn ask(&self) -> io::Result<Option<String>> {
        {
            let mut out = self.output.borrow_mut();
            write!(
                out,
                "Type 'continue' to deploy alongside them or 'wipe' to delete the namespace and redeploy: "
            )?;
            out.flush()?;
        }
        let mut line = String::new();
        if self.input.borrow_mut().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

impl<R: BufRead, W: Write> OperatorPrompt for TerminalPrompt<R, W> {
    fn decide(&self, conflict: &Classification) -> DeployResult<OperatorDecision> {
        let aborted = |e: io::Error| DeployError::OperatorAborted {
            reason: e.to_string(),
        };
        self.describe(conflict).map_err(aborted)?;
        loop {
            let Some(line) = self.ask().map_err(aborted)? else {
                return Err(DeployError::OperatorAborted {
                    reason: "input closed".to_string(),
                });
            };
            if let Some(decision) = OperatorDecision::parse(&line) {
                return Ok(decision);
            }
            writeln!(
                self.output.borrow_mut(),
                "'{}' is not a valid choice.",
                line.trim()
            )
            .map_err(aborted)?;
        }
    }
}
