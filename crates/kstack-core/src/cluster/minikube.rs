//! Cluster liveness through `minikube status`.

use std::process::Command;

use crate::error::ClusterError;

use super::{ClusterProbe, ClusterResult};

#[derive(Debug, Clone)]
pub struct MinikubeProbe {
    program: String,
    profile: Option<String>,
}

impl MinikubeProbe {
    pub fn new(program: impl Into<String>, profile: Option<String>) -> Self {
        Self {
            program: program.into(),
            profile,
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec!["status".to_string(), "--format={{.Host}}".to_string()];
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args
    }
}

impl Default for MinikubeProbe {
    fn default() -> Self {
        Self::new("minikube", None)
    }
}

impl ClusterProbe for MinikubeProbe {
    /// Returns the host state (e.g. `Running`, `Stopped`).
    ///
    /// `minikube status` exits non-zero for a stopped host while still printing
    /// its state, so stdout is preferred over the exit code when present.
    fn status(&self) -> ClusterResult<String> {
        let args = self.args();
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ClusterError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !stdout.is_empty() {
            return Ok(stdout);
        }
        if output.status.success() {
            return Ok(String::new());
        }
        Err(ClusterError::CommandFailed {
            command: format!("{} {}", self.program, args.join(" ")),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
