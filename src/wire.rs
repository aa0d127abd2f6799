//! Insertion of synthesized tasks into the host task graph.
use crate::error::GraphError;
use crate::graph::TaskGraph;
use crate::task::{SecondaryTask, TaskState};
use crate::variant::capitalize;

/// A host task that consumes compiled classes without declaring it.
///
/// Newer host versions fail validation when such a task reads the output of
/// a task it does not depend on, so an explicit edge onto the secondary task
/// is added whenever a task with the derived name exists. `{}` stands for the
/// capitalised variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownstreamTask {
    pub pattern: &'static str,
    /// First host version whose implicit-dependency validation rejects the
    /// build without the edge. Older hosts accept the edge as well.
    pub since: &'static str,
}

impl DownstreamTask {
    pub fn task_name(&self, variant: &str) -> String {
        self.pattern.replace("{}", &capitalize(variant))
    }
}

pub const DOWNSTREAM_TASKS: &[DownstreamTask] = &[
    DownstreamTask {
        pattern: "process{}JavaRes",
        since: "8.0",
    },
    DownstreamTask {
        pattern: "merge{}JavaResource",
        since: "8.0",
    },
    DownstreamTask {
        pattern: "dexBuilder{}",
        since: "8.0",
    },
    DownstreamTask {
        pattern: "transform{}ClassesWithAsm",
        since: "8.0",
    },
    DownstreamTask {
        pattern: "lintVitalAnalyze{}",
        since: "8.0",
    },
];

/// What wiring did for one secondary task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wiring {
    pub task: String,
    pub enabled: bool,
    /// Existing downstream tasks that now depend on the secondary task.
    pub downstream: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphWirer;

impl GraphWirer {
    /// Inserts `secondary` and connects it to `primary`.
    ///
    /// A task with no secondary sources is inserted disabled and receives no
    /// finalizer or downstream edge.
    pub fn wire(
        &self,
        mut secondary: SecondaryTask,
        primary: &str,
        graph: &mut TaskGraph,
    ) -> Result<Wiring, GraphError> {
        if !graph.contains(primary) {
            return Err(GraphError::UnknownTask(primary.to_string()));
        }

        if secondary.sources.is_empty() {
            tracing::debug!("no secondary sources for {}, disabling {}", secondary.variant, secondary.name);
            secondary.disable();
        }

        secondary.state = TaskState::Wired;
        let name = secondary.name.clone();
        let variant = secondary.variant.clone();
        let enabled = secondary.is_enabled();
        let declared = secondary.depends_on.clone();

        graph.insert_secondary(secondary)?;

        for dependency in &declared {
            if graph.contains(dependency) {
                graph.depends_on(&name, dependency)?;
            }
        }

        let mut downstream = Vec::new();
        if enabled {
            graph.finalized_by(primary, &name)?;

            for candidate in DOWNSTREAM_TASKS {
                let task = candidate.task_name(&variant);
                if graph.contains(&task) {
                    graph.depends_on(&task, &name)?;
                    downstream.push(task);
                }
            }
        }

        tracing::debug!("wired {name} after {primary}, downstream: {downstream:?}");

        Ok(Wiring {
            task: name,
            enabled,
            downstream,
        })
    }

    /// Makes each unit-test counterpart depend on the task it mirrors:
    /// `compileDebugUnitTestScala` depends on `compileDebugScala`.
    ///
    /// Runs after every variant is wired, since the counterpart may be
    /// synthesized after the task it depends on.
    pub fn wire_test_counterparts(
        &self,
        wired: &[(String, Wiring)],
        graph: &mut TaskGraph,
    ) -> Result<Vec<(String, String)>, GraphError> {
        let mut edges = Vec::new();

        for (variant, wiring) in wired {
            let capitalized = capitalize(variant);
            if capitalized.is_empty() || !wiring.task.contains(&capitalized) {
                continue;
            }

            let counterpart = wiring
                .task
                .replacen(&capitalized, &format!("{capitalized}UnitTest"), 1);

            let enabled = graph
                .secondary(&counterpart)
                .is_some_and(SecondaryTask::is_enabled);

            if counterpart != wiring.task && enabled {
                graph.depends_on(&counterpart, &wiring.task)?;
                edges.push((counterpart, wiring.task.clone()));
            }
        }

        Ok(edges)
    }
}
