//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "kstack.toml";
pub const CONFIG_ENV_VAR: &str = "KSTACK_CONFIG";

/// Pick the configuration file.
///
/// An explicit path wins, then the environment variable, then `kstack.toml` in the
/// working directory if it exists, then the per-user config directory.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    env_value: Option<&str>,
    cwd: &Path,
    user_config_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value
        && !value.trim().is_empty()
    {
        return Some(PathBuf::from(value.trim()));
    }
    let local = cwd.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    user_config_dir.map(|dir| dir.join("kstack").join(CONFIG_FILE_NAME))
}
