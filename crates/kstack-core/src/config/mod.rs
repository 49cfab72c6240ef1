//! Configuration loading
//!
//! A single `kstack.toml` names the operator, the cluster tooling and the stacks.
//! Stacks are turned into immutable [`DeploymentTarget`](crate::types::DeploymentTarget)s
//! before any pipeline step runs.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_kstack_toml, parse_kstack_toml_str, to_toml};
pub use paths::resolve_config_path;
pub use schema::{ClusterSettings, KstackConfig, StackConfigEntry, StageConfigEntry};
pub use store::ConfigStore;
