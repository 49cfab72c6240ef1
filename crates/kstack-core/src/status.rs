//! Read-only snapshot of a namespace for operator confirmation.
//!
//! Listing failures are recorded as warnings on the snapshot instead of failing:
//! the report runs after the real work is done.

use std::fmt;

use serde::Serialize;

use crate::cluster::ClusterClient;
use crate::log::DeployLog;
use crate::types::{ClusterResource, WorkloadRow};

// =============================================================================
// Data Structures
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub namespace: String,
    pub resources: Vec<ClusterResource>,
    pub workloads: Vec<WorkloadRow>,
    pub warnings: Vec<String>,
}

impl StatusSnapshot {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.workloads.is_empty()
    }

    /// Number of workloads reporting ready.
    pub fn ready_workloads(&self) -> usize {
        self.workloads.iter().filter(|w| w.is_ready()).count()
    }
}

// =============================================================================
// Reporter
// =============================================================================

pub struct StatusReporter<'a> {
    client: &'a dyn ClusterClient,
    log: DeployLog,
}

impl<'a> StatusReporter<'a> {
    pub fn new(client: &'a dyn ClusterClient, log: DeployLog) -> Self {
        Self { client, log }
    }

    pub fn render(&self, namespace: &str) -> StatusSnapshot {
        let mut warnings = Vec::new();

        let resources = match self.client.list_resources(namespace) {
            Ok(resources) => resources,
            Err(e) => {
                let warning = format!("could not list resources: {}", e);
                self.log.error(format!("Status of '{}': {}", namespace, warning));
                warnings.push(warning);
                Vec::new()
            }
        };
        let workloads = match self.client.list_workloads(namespace, None) {
            Ok(rows) => rows,
            Err(e) => {
                let warning = format!("could not list workloads: {}", e);
                self.log.error(format!("Status of '{}': {}", namespace, warning));
                warnings.push(warning);
                Vec::new()
            }
        };

        let snapshot = StatusSnapshot {
            namespace: namespace.to_string(),
            resources,
            workloads,
            warnings,
        };
        self.log.debug(format!(
            "Status of '{}': {} resources, {}/{} workloads ready",
            namespace,
            snapshot.resources.len(),
            snapshot.ready_workloads(),
            snapshot.workloads.len()
        ));
        snapshot
    }
}

// =============================================================================
// Rendering
// =============================================================================

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Namespace: {}", self.namespace)?;
        if self.is_empty() {
            writeln!(f, "  (no resources)")?;
        }

        if !self.resources.is_empty() {
            let rows: Vec<[String; 3]> = self
                .resources
                .iter()
                .map(|r| [r.kind.clone(), r.name.clone(), r.ready_state.to_string()])
                .collect();
            write_table(f, ["KIND", "NAME", "STATE"], &rows)?;
        }

        if !self.workloads.is_empty() {
            writeln!(f)?;
            let rows: Vec<[String; 3]> = self
                .workloads
                .iter()
                .map(|w| {
                    [
                        w.name.clone(),
                        format!("{}/{}", w.ready, w.desired),
                        w.phase.clone(),
                    ]
                })
                .collect();
            write_table(f, ["POD", "READY", "PHASE"], &rows)?;
        }

        for warning in &self.warnings {
            writeln!(f, "warning: {}", warning)?;
        }
        Ok(())
    }
}

fn write_table(
    f: &mut fmt::Formatter<'_>,
    header: [&str; 3],
    rows: &[[String; 3]],
) -> fmt::Result {
    let mut widths = header.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }
    writeln!(
        f,
        "  {:<w0$}  {:<w1$}  {}",
        header[0],
        header[1],
        header[2],
        w0 = widths[0],
        w1 = widths[1]
    )?;
    for row in rows {
        writeln!(
            f,
            "  {:<w0$}  {:<w1$}  {}",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1]
        )?;
    }
    Ok(())
}
