//! Local presence of the files a deployment needs.
//!
//! Missing files are fetched from their remote into a temporary workspace that is
//! removed on every exit path. Each distinct remote is fetched at most once and
//! every missing file is located in the fetched trees before anything is copied,
//! so a failed run never leaves a partial set behind.

use std::path::{Path, PathBuf};

use crate::error::{DeployError, DeployResult};
use crate::git::{GitFetcher, GitSpec};
use crate::log::DeployLog;
use crate::types::ArtifactRequirement;

/// Produces a local directory tree for a remote locator.
pub trait ArtifactSource {
    /// Snapshot `remote` under `dest` and return the directory holding its files
    /// (the subpath when the locator names one).
    fn fetch(&self, remote: &GitSpec, dest: &Path) -> anyhow::Result<PathBuf>;
}

impl ArtifactSource for GitFetcher {
    fn fetch(&self, remote: &GitSpec, dest: &Path) -> anyhow::Result<PathBuf> {
        self.snapshot(remote, dest)
    }
}

/// Files copied into place by one `ensure` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactReport {
    pub fetched_remotes: usize,
    pub copied: Vec<String>,
}

impl ArtifactReport {
    pub fn is_noop(&self) -> bool {
        self.fetched_remotes == 0
    }
}

pub struct ArtifactResolver<'a> {
    source: &'a dyn ArtifactSource,
    log: DeployLog,
}

impl<'a> ArtifactResolver<'a> {
    pub fn new(source: &'a dyn ArtifactSource, log: DeployLog) -> Self {
        Self { source, log }
    }

    pub fn ensure(&self, requirements: &[ArtifactRequirement]) -> DeployResult<ArtifactReport> {
        let missing: Vec<&ArtifactRequirement> =
            requirements.iter().filter(|r| !r.is_present()).collect();
        if missing.is_empty() {
            self.log.debug(format!(
                "All {} required artifacts present locally",
                requirements.len()
            ));
            return Ok(ArtifactReport::default());
        }

        for requirement in &missing {
            self.log.info(format!(
                "Artifact '{}' missing at {}",
                requirement.name,
                requirement.local_path.display()
            ));
        }

        let groups = group_by_remote(&missing);
        let workspace = tempfile::Builder::new()
            .prefix("kstack-fetch-")
            .tempdir()
            .map_err(|e| {
                self.log.failure(DeployError::ArtifactFetchFailed {
                    repository: groups[0].0.to_string(),
                    reason: format!("failed to create fetch workspace: {}", e),
                })
            })?;

        let mut located: Vec<(PathBuf, &ArtifactRequirement)> = Vec::with_capacity(missing.len());
        for (index, (remote, wanted)) in groups.iter().enumerate() {
            let dest = workspace.path().join(format!("remote-{}", index));
            self.log.info(format!("Fetching {}", remote));
            let tree = self.source.fetch(remote, &dest).map_err(|e| {
                self.log.failure(DeployError::ArtifactFetchFailed {
                    repository: remote.to_string(),
                    reason: format!("{:#}", e),
                })
            })?;

            for &requirement in wanted {
                let candidate = tree.join(&requirement.name);
                if !candidate.is_file() {
                    return Err(self.log.failure(DeployError::ArtifactMissing {
                        name: requirement.name.clone(),
                    }));
                }
                located.push((candidate, requirement));
            }
        }

        let mut report = ArtifactReport {
            fetched_remotes: groups.len(),
            copied: Vec::with_capacity(located.len()),
        };
        for (from, requirement) in located {
            copy_into_place(&from, &requirement.local_path).map_err(|reason| {
                self.log.failure(DeployError::ArtifactCopyFailed {
                    name: requirement.name.clone(),
                    reason,
                })
            })?;
            self.log.info(format!(
                "Copied '{}' to {}",
                requirement.name,
                requirement.local_path.display()
            ));
            report.copied.push(requirement.name.clone());
        }
        Ok(report)
    }
}

/// Missing requirements grouped by remote, in first-seen order.
fn group_by_remote<'r>(
    missing: &[&'r ArtifactRequirement],
) -> Vec<(&'r GitSpec, Vec<&'r ArtifactRequirement>)> {
    let mut groups: Vec<(&GitSpec, Vec<&ArtifactRequirement>)> = Vec::new();
    for &requirement in missing {
        match groups.iter_mut().find(|(remote, _)| *remote == &requirement.remote) {
            Some((_, wanted)) => wanted.push(requirement),
            None => groups.push((&requirement.remote, vec![requirement])),
        }
    }
    groups
}

fn copy_into_place(from: &Path, to: &Path) -> Result<(), String> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| format!("failed to copy {} to {}: {}", from.display(), to.display(), e))
}
