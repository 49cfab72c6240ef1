//! kstack Core Library
//!
//! Deploys named stacks of cluster resources: makes sure their artifacts are
//! present, checks the environment, reconciles the target namespace against what
//! is already running, applies each stage and waits for its workloads to become
//! ready.

pub mod artifacts;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod conflict;
pub mod context;
pub mod deployer;
pub mod error;
pub mod git;
pub mod log;
pub mod menu;
pub mod namespace;
pub mod pipeline;
pub mod precondition;
pub mod readiness;
pub mod status;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, KstackConfig, StackConfigEntry};
    pub use crate::context::AppContext;

    // Pipeline
    pub use crate::pipeline::{DeployOutcome, DeploymentPipeline, PipelineReport, Ports};
    pub use crate::status::StatusSnapshot;

    // Ports
    pub use crate::artifacts::ArtifactSource;
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::cluster::{ClusterClient, ClusterProbe, IdentitySource};
    pub use crate::conflict::{FixedDecision, OperatorPrompt, TerminalPrompt};

    // Errors and logging
    pub use crate::error::{DeployError, DeployResult, FailureKind};
    pub use crate::log::{DeployLog, FileSink, LogLevel, MemorySink};

    // Domain types
    pub use crate::menu::{MainEntry, MenuAction};
    pub use crate::types::{
        DeployStage, DeploymentTarget, NamingConvention, OperatorDecision,
        ReconciliationVerdict, Resolution,
    };
}
