//! kstack - cluster stack deployer
//!
//! Usage:
//!   kstack                          # Interactive menu (default)
//!   kstack list                     # Configured stacks
//!   kstack deploy <stack>           # Deploy a stack and wait for readiness
//!   kstack remove <stack>           # Delete a stack's namespace
//!   kstack status <stack> [--json]  # Namespace snapshot

mod interactive;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kstack_core::clock::SystemClock;
use kstack_core::conflict::{FixedDecision, OperatorPrompt, TerminalPrompt};
use kstack_core::context::AppContext;
use kstack_core::error::DeployError;
use kstack_core::pipeline::{DeployOutcome, PipelineReport};
use kstack_core::types::OperatorDecision;

use crate::interactive::MenuSession;

#[derive(Parser)]
#[command(name = "kstack")]
#[command(about = "Deploy application stacks into a local cluster", long_about = None)]
struct Cli {
    /// Path to kstack.toml (overrides KSTACK_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured stacks
    List,

    /// Deploy a stack and wait until its workloads are ready
    Deploy {
        /// Stack name from kstack.toml
        stack: String,

        /// Answer a namespace conflict without prompting (continue or wipe)
        #[arg(long, value_name = "DECISION", value_parser = parse_decision)]
        on_conflict: Option<OperatorDecision>,
    },

    /// Delete a stack's namespace and wait until it is gone
    #[command(alias = "rm")]
    Remove {
        /// Stack name from kstack.toml
        stack: String,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show resources and workloads in a stack's namespace
    Status {
        /// Stack name from kstack.toml
        stack: String,

        /// Machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "kstack=debug"
    } else {
        "kstack=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::load(cli.config.as_deref())?;
    tracing::debug!(target: "kstack", config = %ctx.config_path().display(), "configuration loaded");

    match cli.command {
        None => MenuSession::new(&ctx).run(),
        Some(Commands::List) => {
            run_list(&ctx);
            Ok(())
        }
        Some(Commands::Deploy { stack, on_conflict }) => run_deploy(&ctx, &stack, on_conflict),
        Some(Commands::Remove { stack, yes }) => run_remove(&ctx, &stack, yes),
        Some(Commands::Status { stack, json }) => run_status(&ctx, &stack, json),
    }
}

/// 1 for a failed deployment step, 2 for configuration and usage problems.
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<DeployError>().is_some() {
        1
    } else {
        2
    }
}

fn parse_decision(value: &str) -> std::result::Result<OperatorDecision, String> {
    OperatorDecision::parse(value)
        .ok_or_else(|| format!("expected 'continue' or 'wipe', got '{}'", value))
}

// =============================================================================
// Commands
// =============================================================================

fn run_list(ctx: &AppContext) {
    let config = ctx.config();
    if config.stacks.is_empty() {
        println!("No stacks configured in {}", ctx.config_path().display());
        return;
    }

    let width = config.stacks.keys().map(String::len).max().unwrap_or(0);
    for (name, entry) in &config.stacks {
        let stages: Vec<&str> = entry.stages.iter().map(|s| s.name.as_str()).collect();
        println!(
            "{:<width$}  namespace={}  stages={}",
            style(name).bold(),
            entry.namespace,
            stages.join(","),
            width = width
        );
    }
}

fn run_deploy(ctx: &AppContext, stack: &str, on_conflict: Option<OperatorDecision>) -> Result<()> {
    let target = ctx.config().target(stack)?;
    let clock = SystemClock::new();

    let fixed;
    let terminal;
    let prompt: &dyn OperatorPrompt = match on_conflict {
        Some(decision) => {
            fixed = FixedDecision(decision);
            &fixed
        }
        None => {
            terminal = TerminalPrompt::stdio();
            &terminal
        }
    };

    let report = ctx.pipeline(prompt, &clock).deploy(&target)?;
    print_deploy_report(&mut io::stdout(), stack, &report)?;
    Ok(())
}

fn run_remove(ctx: &AppContext, stack: &str, yes: bool) -> Result<()> {
    let target = ctx.config().target(stack)?;

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete namespace '{}' and everything in it?",
                target.namespace
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let clock = SystemClock::new();
    let prompt = FixedDecision(OperatorDecision::Continue);
    ctx.pipeline(&prompt, &clock).remove(&target)?;
    println!(
        "{} Stack '{}' removed (namespace '{}')",
        style("✓").green(),
        stack,
        target.namespace
    );
    Ok(())
}

fn run_status(ctx: &AppContext, stack: &str, json: bool) -> Result<()> {
    let target = ctx.config().target(stack)?;
    let clock = SystemClock::new();
    let prompt = FixedDecision(OperatorDecision::Continue);
    let snapshot = ctx.pipeline(&prompt, &clock).status(&target);

    if json {
        let output = serde_json::json!({
            "schema_version": 1,
            "stack": stack,
            "status": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", snapshot);
    }
    Ok(())
}

// =============================================================================
// Output
// =============================================================================

pub(crate) fn print_deploy_report(
    out: &mut impl Write,
    stack: &str,
    report: &PipelineReport,
) -> io::Result<()> {
    if !report.artifacts.is_noop() {
        writeln!(
            out,
            "Fetched {} from {} remote(s)",
            report.artifacts.copied.join(", "),
            report.artifacts.fetched_remotes
        )?;
    }
    match report.outcome {
        DeployOutcome::Deployed => writeln!(
            out,
            "{} Stack '{}' deployed: {}",
            style("✓").green(),
            stack,
            report.applied_stages.join(" -> ")
        )?,
        DeployOutcome::AlreadySatisfied => writeln!(
            out,
            "{} Stack '{}' already deployed and ready",
            style("✓").green(),
            stack
        )?,
    }
    writeln!(out)?;
    write!(out, "{}", report.status)
}
