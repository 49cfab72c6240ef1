//! Identity of the invoking process.

use std::process::Command;

use anyhow::Context;

use super::IdentitySource;

/// Reads the login name from `$USER`, falling back to `id -un`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessIdentity;

impl IdentitySource for ProcessIdentity {
    fn current(&self) -> anyhow::Result<String> {
        if let Ok(user) = std::env::var("USER")
            && !user.trim().is_empty()
        {
            return Ok(user.trim().to_string());
        }

        let output = Command::new("id")
            .arg("-un")
            .output()
            .context("Failed to run id -un")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("id -un failed: {}", stderr.trim());
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if name.is_empty() {
            anyhow::bail!("id -un returned an empty name");
        }
        Ok(name)
    }
}
