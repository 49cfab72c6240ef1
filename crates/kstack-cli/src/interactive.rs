//! Interactive menu.
//!
//! Top level picks a stack, the second level picks a [`MenuAction`] for it.
//! Both levels are finite tables from `kstack_core::menu`; dialoguer only maps
//! a selection back to an index.

use std::io::{self, Write};

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Select, theme::ColorfulTheme};

use kstack_core::clock::SystemClock;
use kstack_core::conflict::{Classification, OperatorPrompt};
use kstack_core::context::AppContext;
use kstack_core::error::{DeployError, DeployResult};
use kstack_core::menu::{MainEntry, MenuAction};
use kstack_core::pipeline::DeploymentPipeline;
use kstack_core::types::{DeploymentTarget, OperatorDecision};

use crate::print_deploy_report;

/// Menu loop over the configured stacks.
pub struct MenuSession<'a, W: Write = io::Stdout> {
    ctx: &'a AppContext,
    /// Output writer (for testing)
    writer: W,
    theme: ColorfulTheme,
}

impl<'a> MenuSession<'a, io::Stdout> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self {
            ctx,
            writer: io::stdout(),
            theme: ColorfulTheme::default(),
        }
    }
}

impl<'a, W: Write> MenuSession<'a, W> {
    #[cfg(test)]
    pub fn with_writer(ctx: &'a AppContext, writer: W) -> Self {
        Self {
            ctx,
            writer,
            theme: ColorfulTheme::default(),
        }
    }

    /// Verify the operator identity once, then loop until Exit is chosen.
    ///
    /// A failed action is reported and the menu continues; only identity,
    /// configuration and terminal errors end the session.
    pub fn run(&mut self) -> Result<()> {
        self.print_header()?;

        let ctx = self.ctx;
        let clock = SystemClock::new();
        let prompt = SelectPrompt::default();
        let pipeline = ctx.pipeline(&prompt, &clock);
        pipeline.verify_identity()?;
        ctx.log().info("Menu started");

        let entries = MainEntry::table(ctx.config().stacks.keys().cloned());
        loop {
            let labels: Vec<String> = entries.iter().map(ToString::to_string).collect();
            let index = Select::with_theme(&self.theme)
                .with_prompt("Select a stack")
                .items(&labels)
                .default(0)
                .interact()
                .context("Failed to read menu selection")?;

            match entries.get(index) {
                Some(MainEntry::Stack(name)) => self.stack_menu(&pipeline, name)?,
                Some(MainEntry::Exit) | None => break,
            }
        }

        ctx.log().info("Menu exited");
        Ok(())
    }

    fn stack_menu(&mut self, pipeline: &DeploymentPipeline<'_>, name: &str) -> Result<()> {
        let target = self.ctx.config().target(name)?;
        self.print_stack_summary(&target)?;

        loop {
            let index = Select::with_theme(&self.theme)
                .with_prompt(format!("{} ({})", name, target.namespace))
                .items(&MenuAction::labels())
                .default(0)
                .interact()
                .context("Failed to read menu selection")?;
            let Some(action) = MenuAction::from_index(index) else {
                continue;
            };
            if action == MenuAction::Back {
                return Ok(());
            }
            if action.is_mutating() && !self.confirm(action, &target)? {
                writeln!(self.writer, "Cancelled.")?;
                continue;
            }

            match action {
                MenuAction::Deploy => match pipeline.deploy(&target) {
                    Ok(report) => print_deploy_report(&mut self.writer, name, &report)?,
                    Err(e) => self.print_failure(&e)?,
                },
                MenuAction::Remove => match pipeline.remove(&target) {
                    Ok(()) => writeln!(
                        self.writer,
                        "{} Stack '{}' removed",
                        style("✓").green(),
                        name
                    )?,
                    Err(e) => self.print_failure(&e)?,
                },
                MenuAction::Status => write!(self.writer, "{}", pipeline.status(&target))?,
                MenuAction::Back => {}
            }
            writeln!(self.writer)?;
        }
    }

    fn confirm(&self, action: MenuAction, target: &DeploymentTarget) -> Result<bool> {
        let question = match action {
            MenuAction::Remove => format!(
                "Delete namespace '{}' and everything in it?",
                target.namespace
            ),
            _ => format!("{} '{}' into namespace '{}'?", action, target.name, target.namespace),
        };
        Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .default(action != MenuAction::Remove)
            .interact()
            .context("Failed to read confirmation")
    }

    fn print_header(&mut self) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", style("  kstack").bold().cyan())?;
        writeln!(
            self.writer,
            "  config: {}",
            style(self.ctx.config_path().display()).dim()
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_stack_summary(&mut self, target: &DeploymentTarget) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", style(format!("  {}", target.name)).bold())?;
        writeln!(self.writer, "  ───────────────────────────")?;
        writeln!(
            self.writer,
            "  Namespace: {}",
            style(&target.namespace).green()
        )?;
        writeln!(
            self.writer,
            "  Directory: {}",
            style(target.directory.display()).green()
        )?;
        writeln!(
            self.writer,
            "  Stages:    {}",
            style(target.stage_names().join(" -> ")).green()
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_failure(&mut self, err: &DeployError) -> Result<()> {
        writeln!(
            self.writer,
            "{} {} ({:?})",
            style("✗").red(),
            err,
            err.kind()
        )?;
        Ok(())
    }
}

/// Conflict prompt rendered as a dialoguer selection.
#[derive(Default)]
pub struct SelectPrompt {
    theme: ColorfulTheme,
}

impl OperatorPrompt for SelectPrompt {
    fn decide(&self, conflict: &Classification) -> DeployResult<OperatorDecision> {
        eprintln!(
            "{} namespace '{}' contains resources that are not part of this stack:",
            style("!").yellow().bold(),
            conflict.namespace
        );
        for resource in &conflict.foreign {
            eprintln!("    {}/{}", resource.kind, resource.name);
        }

        let choices = ["Continue alongside them", "Wipe the namespace and redeploy"];
        let selection = Select::with_theme(&self.theme)
            .with_prompt("How should the deployment proceed?")
            .items(&choices)
            .default(0)
            .interact_opt()
            .map_err(|e| DeployError::OperatorAborted {
                reason: e.to_string(),
            })?;

        match selection {
            Some(0) => Ok(OperatorDecision::Continue),
            Some(_) => Ok(OperatorDecision::WipeAndRedeploy),
            None => Err(DeployError::OperatorAborted {
                reason: "selection cancelled".to_string(),
            }),
        }
    }
}
