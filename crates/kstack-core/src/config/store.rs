//! Config store for locating and loading kstack.toml.

use std::path::{Path, PathBuf};

use super::paths::{CONFIG_ENV_VAR, resolve_config_path};
use super::{KstackConfig, parser};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Locate the config from an optional `--config` value, `$KSTACK_CONFIG`, the
    /// working directory and the user config directory, in that order.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let env_value = std::env::var(CONFIG_ENV_VAR).ok();
        let user_dir = dirs::config_dir();
        let config_path =
            resolve_config_path(explicit, env_value.as_deref(), &cwd, user_dir.as_deref())
                .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(Self { config_path })
    }

    pub fn from_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> anyhow::Result<KstackConfig> {
        if !self.config_path.exists() {
            anyhow::bail!(
                "Config file not found: {} (pass --config or set {})",
                self.config_path.display(),
                CONFIG_ENV_VAR
            );
        }
        parser::parse_kstack_toml(&self.config_path)
    }
}
