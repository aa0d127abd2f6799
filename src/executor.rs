//! Sequential execution of a planned slice of the task graph.
mod diagnostics;

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use anyhow::anyhow;
#[cfg(feature = "progress")]
use indicatif::ProgressStyle;
use petgraph::graph::NodeIndex;
#[cfg(feature = "progress")]
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::classpath::ClasspathResolver;
use crate::core::Classpath;
use crate::error::{ActionError, ExecutionError};
use crate::graph::{Task, TaskGraph};
use crate::project::Project;
use crate::task::{DeferredAction, PrimaryTask, SecondaryTask};

pub use diagnostics::{Diagnostics, TaskExecution, TaskOutcome};

/// The work behind each kind of task. Compilation itself is delegated to the
/// implementor.
pub trait TaskActions {
    fn run_primary(&self, _task: &PrimaryTask) -> Result<(), ActionError> {
        Ok(())
    }

    fn run_task(&self, _name: &str) -> Result<(), ActionError> {
        Ok(())
    }

    /// Called with the classpath already finalized.
    fn compile(&self, task: &SecondaryTask) -> Result<(), ActionError>;
}

/// Runs `targets` with everything they pull in, in dependency order.
///
/// Deferred actions of a secondary task are applied right before it compiles.
/// A failing task is never retried. Tasks waiting on it, directly or through
/// a finalizer edge, are skipped, while unrelated tasks keep running.
pub fn execute<A>(project: &mut Project, targets: &[&str], actions: &A) -> Result<Diagnostics, ExecutionError>
where
    A: TaskActions + ?Sized,
{
    let plan = project.tasks.plan(targets)?;

    let root_span = tracing::info_span!("executing_tasks");
    #[cfg(feature = "progress")]
    {
        root_span.pb_set_length(plan.len() as u64);
        root_span.pb_set_style(
            &ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("=>-"),
        );
        root_span.pb_set_message("Executing tasks...");
    }
    let _enter = root_span.enter();

    #[cfg(feature = "progress")]
    let task_style = ProgressStyle::with_template("{spinner:.blue} {msg}")?;

    let mut diagnostics = Diagnostics::default();
    let mut blocked: HashSet<NodeIndex> = HashSet::new();

    for index in plan {
        let name = project.tasks.node(index).name().to_string();
        let start = Instant::now();

        let cause = project
            .tasks
            .predecessors(index)
            .find(|predecessor| blocked.contains(predecessor));

        let outcome = if let Some(cause) = cause {
            blocked.insert(index);
            let cause = project.tasks.node(cause).name().to_string();
            tracing::warn!("skipping {name}, {cause} did not complete");
            TaskOutcome::Skipped { cause }
        } else if !project.tasks.node(index).is_enabled() {
            tracing::debug!("{name} is disabled");
            TaskOutcome::Disabled
        } else {
            let span = tracing::info_span!("task", name = %name);
            #[cfg(feature = "progress")]
            {
                span.pb_set_style(&task_style);
                span.pb_set_message(&format!("Running {name}"));
            }
            let _enter = span.enter();

            match run(project, index, actions) {
                Ok(()) => TaskOutcome::Succeeded,
                Err(err) => {
                    tracing::error!("{name} failed: {err:#}");
                    blocked.insert(index);
                    TaskOutcome::Failed(err)
                }
            }
        };

        diagnostics.executions.push(TaskExecution {
            index,
            name,
            outcome,
            start,
            duration: start.elapsed(),
        });

        #[cfg(feature = "progress")]
        root_span.pb_inc(1);
    }

    if diagnostics.is_success() {
        tracing::info!("Execution complete!");
    }

    Ok(diagnostics)
}

fn run<A>(project: &mut Project, index: NodeIndex, actions: &A) -> Result<(), ActionError>
where
    A: TaskActions + ?Sized,
{
    let Project { tasks, platform, .. } = project;

    if matches!(tasks.node(index), Task::Secondary(_)) {
        apply_deferred(tasks, index, &platform.boot_classpath)?;
    }

    // Task actions are user code, a panic fails only the task.
    let result = catch_unwind(AssertUnwindSafe(|| match tasks.node(index) {
        Task::Primary(task) => actions.run_primary(task),
        Task::Secondary(task) => actions.compile(task),
        Task::Generic(task) => actions.run_task(&task.name),
    }));

    match result {
        Ok(result) => result,
        Err(panic) => {
            let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                format!("Task panicked: {s}")
            } else if let Some(s) = panic.downcast_ref::<String>() {
                format!("Task panicked: {s}")
            } else {
                String::from("Task panicked with unknown payload")
            };
            Err(anyhow!(msg))
        }
    }
}

/// Applies the deferred actions of the secondary task at `index`, reading the
/// primary task and boot classpath as they are now.
fn apply_deferred(tasks: &mut TaskGraph, index: NodeIndex, boot_classpath: &Classpath) -> Result<(), ActionError> {
    let Task::Secondary(task) = tasks.node(index) else {
        return Ok(());
    };

    if task.deferred_actions().is_empty() {
        return Ok(());
    }

    let primary = tasks
        .primary(&task.primary)
        .cloned()
        .ok_or_else(|| anyhow!("primary task '{}' of '{}' is gone", task.primary, task.name))?;

    let Task::Secondary(task) = tasks.node_mut(index) else {
        return Ok(());
    };

    for action in task.deferred_actions().to_vec() {
        match action {
            DeferredAction::FinalizeClasspath => ClasspathResolver.finalize(task, &primary, boot_classpath),
        }
    }

    Ok(())
}
