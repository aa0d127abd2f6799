use std::fmt::{self, Display, Formatter, Write};
use std::time::{Duration, Instant};

use console::style;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::error::ActionError;
use crate::graph::TaskGraph;

#[derive(Debug)]
pub enum TaskOutcome {
    Succeeded,
    /// The task is disabled and was not run. Its dependents still run.
    Disabled,
    Failed(ActionError),
    /// Not run because a task it waits for failed or was skipped.
    Skipped { cause: String },
}

#[derive(Debug)]
pub struct TaskExecution {
    pub index: NodeIndex,
    pub name: String,
    pub outcome: TaskOutcome,
    pub start: Instant,
    pub duration: Duration,
}

impl TaskExecution {
    /// Whether the task's action was invoked.
    pub fn ran(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Succeeded | TaskOutcome::Failed(_))
    }
}

/// Execution report, in execution order.
///
/// This struct is returned by [`crate::execute`] and holds the outcome and
/// duration of every planned task.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub executions: Vec<TaskExecution>,
}

impl Diagnostics {
    pub fn get(&self, name: &str) -> Option<&TaskExecution> {
        self.executions.iter().find(|execution| execution.name == name)
    }

    /// Names of the tasks whose action was invoked, in order.
    pub fn ran(&self) -> Vec<&str> {
        self.executions
            .iter()
            .filter(|execution| execution.ran())
            .map(|execution| execution.name.as_str())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskExecution> {
        self.executions
            .iter()
            .filter(|execution| matches!(execution.outcome, TaskOutcome::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Renders the task graph as a Mermaid diagram, color-coded by outcome and
    /// duration.
    ///
    /// * **Green** to **Red**: fast to slow
    /// * **Grey**: disabled
    /// * **Orange**: skipped
    /// * **Blue**: not planned
    pub fn render_mermaid(&self, graph: &TaskGraph) -> String {
        let mut f = String::new();
        let _ = writeln!(f, "graph LR");

        let ran = || self.executions.iter().filter(|execution| execution.ran());
        let min_time = ran()
            .map(|execution| execution.duration.as_secs_f64())
            .fold(f64::MAX, f64::min);
        let max_time = ran()
            .map(|execution| execution.duration.as_secs_f64())
            .fold(f64::MIN, f64::max);

        let (min_time, max_time) = if min_time > max_time {
            (0.0, 1.0)
        } else if (max_time - min_time).abs() < f64::EPSILON {
            (min_time, min_time + 1.0)
        } else {
            (min_time, max_time)
        };

        let inner = graph.inner();
        for index in inner.node_indices() {
            let name = inner[index].name().replace('"', "\\\"");
            let execution = self.executions.iter().find(|execution| execution.index == index);

            let (label, color) = match execution.map(|execution| (&execution.outcome, execution.duration)) {
                Some((TaskOutcome::Succeeded | TaskOutcome::Failed(_), duration)) => {
                    let t = (duration.as_secs_f64() - min_time) / (max_time - min_time);
                    (format!("{duration:.2?}"), gradient(t))
                }
                Some((TaskOutcome::Disabled, _)) => ("Disabled".to_string(), "#D3D3D3".to_string()),
                Some((TaskOutcome::Skipped { .. }, _)) => ("Skipped".to_string(), "#FFA500".to_string()),
                None => ("Not planned".to_string(), "#ADD8E6".to_string()),
            };

            let _ = writeln!(f, "    {}[\"{}\\n{}\"]", index.index(), name, label);
            let _ = writeln!(f, "    style {} fill:{}", index.index(), color);
        }

        for edge in inner.edge_references() {
            let _ = writeln!(
                f,
                "    {} -- \"{}\" --> {}",
                edge.source().index(),
                edge.weight(),
                edge.target().index()
            );
        }

        f
    }
}

/// Green at 0.0, yellow at 0.5, red at 1.0.
fn gradient(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let (r, g) = if t < 0.5 {
        ((255.0 * t * 2.0) as u8, 255)
    } else {
        (255, (255.0 * (1.0 - (t - 0.5) * 2.0)) as u8)
    };
    format!("#{r:02X}{g:02X}00")
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for execution in &self.executions {
            match &execution.outcome {
                TaskOutcome::Succeeded => writeln!(
                    f,
                    "{} {} ({:.2?})",
                    style("ok").green(),
                    execution.name,
                    execution.duration
                )?,
                TaskOutcome::Disabled => {
                    writeln!(f, "{} {}", style("disabled").dim(), execution.name)?
                }
                TaskOutcome::Failed(err) => writeln!(
                    f,
                    "{} {}: {:#}",
                    style("failed").red().bold(),
                    execution.name,
                    err
                )?,
                TaskOutcome::Skipped { cause } => writeln!(
                    f,
                    "{} {} (after {})",
                    style("skipped").yellow(),
                    execution.name,
                    cause
                )?,
            }
        }
        Ok(())
    }
}
