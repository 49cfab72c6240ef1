//! Git source specification types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Specification for a git source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitSpec {
    /// Repository URL (e.g., "https://github.com/org/repo.git")
    pub repo_url: String,
    /// Git reference (branch or tag)
    pub reference: Option<String>,
    /// Subdirectory within the repository holding the artifacts
    pub subdir: Option<String>,
}

impl GitSpec {
    /// Create a new GitSpec with just a repo URL.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            reference: None,
            subdir: None,
        }
    }

    /// Set the git reference (branch or tag).
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Set the subdirectory path.
    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }

    /// Parse a git source string into a GitSpec.
    ///
    /// Supports formats:
    /// - `https://github.com/org/repo.git`
    /// - `github:org/repo`
    /// - `github:org/repo@ref`
    /// - `github:org/repo@ref/path`
    /// - `https://github.com/org/repo/tree/ref/path`
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let raw = source.trim();
        if raw.is_empty() {
            anyhow::bail!("Git source is empty");
        }

        if let Some(shorthand) = raw.strip_prefix("github:") {
            return Self::parse_github_shorthand(shorthand);
        }

        if let Some((repo, reference, subdir)) = Self::split_tree_path(raw) {
            if subdir.is_empty() {
                anyhow::bail!("Git URL is missing a path after /tree/<ref>/");
            }
            return Ok(Self {
                repo_url: repo,
                reference: Some(reference),
                subdir: Some(subdir),
            });
        }

        Ok(Self::new(raw))
    }

    /// Expand github shorthand like "org/repo@ref/path".
    fn parse_github_shorthand(shorthand: &str) -> anyhow::Result<Self> {
        let (repo_part, rest) = match shorthand.split_once('@') {
            Some((repo, rest)) => (repo, Some(rest)),
            None => (shorthand, None),
        };
        if repo_part.split('/').filter(|s| !s.is_empty()).count() != 2 {
            anyhow::bail!("GitHub shorthand must be org/repo: {}", shorthand);
        }
        let mut spec = Self::new(format!("https://github.com/{}.git", repo_part));
        if let Some(rest) = rest {
            match rest.split_once('/') {
                Some((reference, path)) if !path.is_empty() => {
                    spec.reference = Some(reference.to_string());
                    spec.subdir = Some(path.to_string());
                }
                Some((reference, _)) => spec.reference = Some(reference.to_string()),
                None => spec.reference = Some(rest.to_string()),
            }
        }
        Ok(spec)
    }

    /// Split a URL with /tree/ pattern into (repo, ref, subdir).
    fn split_tree_path(raw: &str) -> Option<(String, String, String)> {
        let marker = "/tree/";
        let idx = raw.find(marker)?;
        let repo = raw[..idx].to_string();
        let rest = &raw[idx + marker.len()..];
        let mut parts = rest.splitn(2, '/');
        let reference = parts.next()?.to_string();
        let subdir = parts.next().unwrap_or("").trim_end_matches('/').to_string();
        Some((repo, reference, subdir))
    }
}

impl fmt::Display for GitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repo_url)?;
        if let Some(reference) = &self.reference {
            write!(f, "@{}", reference)?;
        }
        if let Some(subdir) = &self.subdir {
            write!(f, " ({})", subdir)?;
        }
        Ok(())
    }
}
