//! `kubectl` implementation of [`ClusterClient`].
//!
//! Every listing uses `-o json` and is decoded into typed rows.

use std::process::Command;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ClusterError;
use crate::types::{ClusterResource, ManifestLocator, NamespacePhase, ReadyState, WorkloadRow};

use super::{ClusterClient, ClusterResult};

#[derive(Debug, Clone)]
pub struct Kubectl {
    program: String,
    context: Option<String>,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl Kubectl {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            context: None,
        }
    }

    /// Pin every call to a kubeconfig context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    fn run(&self, args: Vec<String>) -> ClusterResult<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(context) = &self.context {
            full.push("--context".to_string());
            full.push(context.clone());
        }
        full.extend(args);

        let output = Command::new(&self.program)
            .args(&full)
            .output()
            .map_err(|source| ClusterError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ClusterError::CommandFailed {
                command: self.command_line(&full),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn is_reason(err: &ClusterError, reason: &str) -> bool {
    matches!(err, ClusterError::CommandFailed { stderr, .. } if stderr.contains(reason))
}

impl ClusterClient for Kubectl {
    fn namespace_get(&self, namespace: &str) -> ClusterResult<Option<NamespacePhase>> {
        let stdout = self.run(args([
            "get",
            "namespace",
            namespace,
            "--ignore-not-found",
            "-o",
            "json",
        ]))?;
        parse_namespace(&stdout).map_err(|reason| ClusterError::Decode {
            command: format!("get namespace {}", namespace),
            reason,
        })
    }

    fn namespace_create(&self, namespace: &str) -> ClusterResult<()> {
        match self.run(args(["create", "namespace", namespace])) {
            Ok(_) => Ok(()),
            Err(err) if is_reason(&err, "AlreadyExists") => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn namespace_delete(&self, namespace: &str) -> ClusterResult<()> {
        match self.run(args(["delete", "namespace", namespace, "--wait=false"])) {
            Ok(_) => Ok(()),
            Err(err) if is_reason(&err, "NotFound") => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn list_resources(&self, namespace: &str) -> ClusterResult<Vec<ClusterResource>> {
        let stdout = self.run(args(["get", "all", "-n", namespace, "-o", "json"]))?;
        parse_resources(&stdout, namespace).map_err(|reason| ClusterError::Decode {
            command: format!("get all -n {}", namespace),
            reason,
        })
    }

    fn apply(&self, manifest: &ManifestLocator, namespace: &str) -> ClusterResult<()> {
        let target = manifest.as_apply_arg();
        self.run(args(["apply", "-f", &target, "-n", namespace]))?;
        Ok(())
    }

    fn list_workloads(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> ClusterResult<Vec<WorkloadRow>> {
        let mut call = args(["get", "pods", "-n", namespace, "-o", "json"]);
        if let Some(selector) = selector {
            call.push("-l".to_string());
            call.push(selector.to_string());
        }
        let stdout = self.run(call)?;
        parse_workloads(&stdout).map_err(|reason| ClusterError::Decode {
            command: format!("get pods -n {}", namespace),
            reason,
        })
    }

    fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        command: &[String],
    ) -> ClusterResult<String> {
        let mut call = args(["exec", "-n", namespace, pod]);
        if let Some(container) = container {
            call.push("-c".to_string());
            call.push(container.to_string());
        }
        call.push("--".to_string());
        call.extend(command.iter().cloned());
        self.run(call)
    }
}

#[derive(Debug, Deserialize)]
struct ItemList {
    #[serde(default)]
    items: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    #[serde(default)]
    kind: String,
    metadata: RawMetadata,
    #[serde(default)]
    spec: Value,
    #[serde(default)]
    status: Value,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

fn parse_namespace(stdout: &str) -> Result<Option<NamespacePhase>, String> {
    if stdout.trim().is_empty() {
        return Ok(None);
    }
    let object: RawObject = serde_json::from_str(stdout).map_err(|e| e.to_string())?;
    let phase = object
        .status
        .get("phase")
        .and_then(Value::as_str)
        .unwrap_or("Active");
    Ok(Some(match phase {
        "Terminating" => NamespacePhase::Terminating,
        _ => NamespacePhase::Active,
    }))
}

fn parse_resources(stdout: &str, namespace: &str) -> Result<Vec<ClusterResource>, String> {
    let list: ItemList = serde_json::from_str(stdout).map_err(|e| e.to_string())?;
    Ok(list
        .items
        .into_iter()
        .map(|object| {
            let ready_state = ready_state_of(&object);
            ClusterResource {
                namespace: object
                    .metadata
                    .namespace
                    .unwrap_or_else(|| namespace.to_string()),
                kind: object.kind,
                name: object.metadata.name,
                ready_state,
            }
        })
        .collect())
}

fn parse_workloads(stdout: &str) -> Result<Vec<WorkloadRow>, String> {
    let list: ItemList = serde_json::from_str(stdout).map_err(|e| e.to_string())?;
    Ok(list.items.iter().map(pod_row).collect())
}

fn pod_row(pod: &RawObject) -> WorkloadRow {
    let desired = pod
        .spec
        .get("containers")
        .and_then(Value::as_array)
        .map(|c| c.len() as u32)
        .unwrap_or(0);
    let ready = pod
        .status
        .get("containerStatuses")
        .and_then(Value::as_array)
        .map(|statuses| {
            statuses
                .iter()
                .filter(|s| s.get("ready").and_then(Value::as_bool).unwrap_or(false))
                .count() as u32
        })
        .unwrap_or(0);
    let phase = pod
        .status
        .get("phase")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    WorkloadRow::new(pod.metadata.name.clone(), ready, desired, phase)
}

fn count(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

fn ready_state_of(object: &RawObject) -> ReadyState {
    let (ready, desired) = match object.kind.as_str() {
        "Pod" => {
            let row = pod_row(object);
            (u64::from(row.ready), u64::from(row.desired))
        }
        "Deployment" | "StatefulSet" | "ReplicaSet" => (
            count(&object.status, "readyReplicas").unwrap_or(0),
            count(&object.spec, "replicas").unwrap_or(1),
        ),
        "DaemonSet" => (
            count(&object.status, "numberReady").unwrap_or(0),
            count(&object.status, "desiredNumberScheduled").unwrap_or(0),
        ),
        _ => return ReadyState::Unknown,
    };
    if ready == desired {
        ReadyState::Ready
    } else {
        ReadyState::NotReady
    }
}
