//! Git fetcher producing shallow snapshots of artifact repositories.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;

use super::GitSpec;

/// Clones repositories into caller-owned directories.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl GitFetcher {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Use a different git binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Ensure git version is 2.25+ (required for sparse checkout).
    pub fn ensure_git_version(&self) -> anyhow::Result<()> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .with_context(|| format!("Failed to invoke {} --version", self.program))?;
        if !output.status.success() {
            anyhow::bail!("Failed to run {} --version", self.program);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout
            .split_whitespace()
            .nth(2)
            .ok_or_else(|| anyhow::anyhow!("Unexpected git version output: {}", stdout))?;
        if Self::supports_sparse(version)? {
            return Ok(());
        }
        anyhow::bail!("Git 2.25+ is required for sparse checkout. Please upgrade git.");
    }

    pub(super) fn supports_sparse(version: &str) -> anyhow::Result<bool> {
        let mut parts = version.split('.');
        let major: u32 = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Invalid git version: {}", version))?
            .parse()?;
        let minor: u32 = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Invalid git version: {}", version))?
            .parse()?;
        Ok(major > 2 || (major == 2 && minor >= 25))
    }

    /// Clone `spec` into `dest` with a single shallow clone.
    ///
    /// Only the subdirectory is checked out when the spec names one. Returns the
    /// directory the artifacts live in (`dest` or `dest/<subdir>`). `dest` must not
    /// exist yet; the caller owns its cleanup.
    pub fn snapshot(&self, spec: &GitSpec, dest: &Path) -> anyhow::Result<PathBuf> {
        let dest_str = dest
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid snapshot dir: {}", dest.display()))?;

        let mut args = vec!["clone", "--depth", "1", "--quiet"];
        if let Some(reference) = spec.reference.as_deref() {
            args.extend(["--branch", reference]);
        }

        if let Some(subdir) = spec.subdir.as_deref() {
            self.ensure_git_version()?;
            args.extend(["--filter=blob:none", "--sparse"]);
            args.extend([spec.repo_url.as_str(), dest_str]);
            self.run_git(None, &args)?;
            self.run_git(Some(dest), &["sparse-checkout", "set", subdir])?;
        } else {
            args.extend([spec.repo_url.as_str(), dest_str]);
            self.run_git(None, &args)?;
        }

        let root = match spec.subdir.as_deref() {
            Some(subdir) => dest.join(subdir),
            None => dest.to_path_buf(),
        };
        if !root.is_dir() {
            anyhow::bail!(
                "Git checkout did not create expected path: {}",
                root.display()
            );
        }
        Ok(root)
    }

    /// Run a git command.
    fn run_git(&self, cwd: Option<&Path>, args: &[&str]) -> anyhow::Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .with_context(|| format!("Failed to run git {:?}", args))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Git command failed {:?}: {}", args, stderr.trim());
        }
        Ok(())
    }
}
