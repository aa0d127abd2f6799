//! The host task graph.
//!
//! Tasks are stored in a [`petgraph::Graph`] and looked up by their unique
//! name. An edge always points from the task that runs first to the task that
//! runs after it:
//!
//! * `depends_on(a, b)` adds `b -> a`: `b` must run before `a`.
//! * `finalized_by(a, f)` adds `a -> f`: `f` runs after `a` and is scheduled
//!   whenever `a` is.
//!
//! Edges that would close a cycle are rejected, and adding an edge twice is a
//! no-op.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::Direction;
use petgraph::Graph;
use petgraph::algo::has_path_connecting;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::error::{DuplicateTaskError, GraphError};
use crate::task::{PrimaryTask, SecondaryTask};

/// Any other host task, known only by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTask {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub enum Task {
    Primary(PrimaryTask),
    Secondary(SecondaryTask),
    Generic(GenericTask),
}

impl Task {
    pub fn name(&self) -> &str {
        match self {
            Task::Primary(task) => &task.name,
            Task::Secondary(task) => &task.name,
            Task::Generic(task) => &task.name,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Task::Primary(_) => true,
            Task::Secondary(task) => task.is_enabled(),
            Task::Generic(task) => task.enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    DependsOn,
    FinalizedBy,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::DependsOn => write!(f, "dependsOn"),
            EdgeKind::FinalizedBy => write!(f, "finalizedBy"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    graph: Graph<Task, EdgeKind>,
    names: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, task: Task) -> Result<NodeIndex, DuplicateTaskError> {
        if self.names.contains_key(task.name()) {
            return Err(DuplicateTaskError(task.name().to_string()));
        }
        let name = task.name().to_string();
        let index = self.graph.add_node(task);
        self.names.insert(name, index);
        Ok(index)
    }

    /// Registers a task the orchestrator knows only by name.
    pub fn add_task(&mut self, name: impl Into<String>) -> Result<NodeIndex, DuplicateTaskError> {
        self.insert(Task::Generic(GenericTask {
            name: name.into(),
            enabled: true,
        }))
    }

    pub fn add_primary(&mut self, task: PrimaryTask) -> Result<NodeIndex, DuplicateTaskError> {
        self.insert(Task::Primary(task))
    }

    pub fn insert_secondary(&mut self, task: SecondaryTask) -> Result<NodeIndex, DuplicateTaskError> {
        self.insert(Task::Secondary(task))
    }

    pub fn index(&self, name: &str) -> Option<NodeIndex> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index(name).map(|index| &self.graph[index])
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Task> {
        self.index(name).map(|index| &mut self.graph[index])
    }

    pub(crate) fn node(&self, index: NodeIndex) -> &Task {
        &self.graph[index]
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> &mut Task {
        &mut self.graph[index]
    }

    pub fn primary(&self, name: &str) -> Option<&PrimaryTask> {
        match self.get(name)? {
            Task::Primary(task) => Some(task),
            _ => None,
        }
    }

    pub fn primary_mut(&mut self, name: &str) -> Option<&mut PrimaryTask> {
        match self.get_mut(name)? {
            Task::Primary(task) => Some(task),
            _ => None,
        }
    }

    pub fn secondary(&self, name: &str) -> Option<&SecondaryTask> {
        match self.get(name)? {
            Task::Secondary(task) => Some(task),
            _ => None,
        }
    }

    pub fn secondary_mut(&mut self, name: &str) -> Option<&mut SecondaryTask> {
        match self.get_mut(name)? {
            Task::Secondary(task) => Some(task),
            _ => None,
        }
    }

    pub fn secondaries(&self) -> impl Iterator<Item = &SecondaryTask> {
        self.graph.node_weights().filter_map(|task| match task {
            Task::Secondary(task) => Some(task),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn require(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.index(name)
            .ok_or_else(|| GraphError::UnknownTask(name.to_string()))
    }

    fn connect(&mut self, before: NodeIndex, after: NodeIndex, kind: EdgeKind) -> Result<(), GraphError> {
        if self
            .graph
            .edges_connecting(before, after)
            .any(|edge| *edge.weight() == kind)
        {
            return Ok(());
        }

        if before == after || has_path_connecting(&self.graph, after, before, None) {
            return Err(GraphError::Cycle {
                from: self.graph[before].name().to_string(),
                to: self.graph[after].name().to_string(),
            });
        }

        self.graph.add_edge(before, after, kind);
        Ok(())
    }

    /// `dependent` requires `dependency` to run first.
    pub fn depends_on(&mut self, dependent: &str, dependency: &str) -> Result<(), GraphError> {
        let dependent = self.require(dependent)?;
        let dependency = self.require(dependency)?;
        self.connect(dependency, dependent, EdgeKind::DependsOn)
    }

    /// `finalizer` runs after `task`, whenever `task` is scheduled.
    pub fn finalized_by(&mut self, task: &str, finalizer: &str) -> Result<(), GraphError> {
        let task = self.require(task)?;
        let finalizer = self.require(finalizer)?;
        self.connect(task, finalizer, EdgeKind::FinalizedBy)
    }

    fn neighbours(&self, name: &str, direction: Direction, kind: EdgeKind) -> Vec<&str> {
        let Some(index) = self.index(name) else {
            return Vec::new();
        };

        let mut names: Vec<_> = self
            .graph
            .edges_directed(index, direction)
            .filter(|edge| *edge.weight() == kind)
            .map(|edge| match direction {
                Direction::Incoming => edge.source(),
                Direction::Outgoing => edge.target(),
            })
            .map(|index| self.graph[index].name())
            .collect();
        names.sort_unstable();
        names
    }

    /// Tasks `name` depends on.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Incoming, EdgeKind::DependsOn)
    }

    /// Tasks that depend on `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Outgoing, EdgeKind::DependsOn)
    }

    /// Tasks finalizing `name`.
    pub fn finalizers_of(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Outgoing, EdgeKind::FinalizedBy)
    }

    /// Every task that must run when `targets` are requested, in execution
    /// order: the targets, their dependencies and their finalizers,
    /// transitively.
    pub fn plan(&self, targets: &[&str]) -> Result<Vec<NodeIndex>, GraphError> {
        let mut scheduled = HashSet::new();
        let mut stack = targets
            .iter()
            .map(|name| self.require(name))
            .collect::<Result<Vec<_>, _>>()?;

        while let Some(index) = stack.pop() {
            if !scheduled.insert(index) {
                continue;
            }
            for edge in self.graph.edges_directed(index, Direction::Incoming) {
                if *edge.weight() == EdgeKind::DependsOn {
                    stack.push(edge.source());
                }
            }
            for edge in self.graph.edges_directed(index, Direction::Outgoing) {
                if *edge.weight() == EdgeKind::FinalizedBy {
                    stack.push(edge.target());
                }
            }
        }

        let order = petgraph::algo::toposort(&self.graph, None).map_err(|cycle| {
            let name = self.graph[cycle.node_id()].name().to_string();
            GraphError::Cycle {
                from: name.clone(),
                to: name,
            }
        })?;

        Ok(order
            .into_iter()
            .filter(|index| scheduled.contains(index))
            .collect())
    }

    pub(crate) fn inner(&self) -> &Graph<Task, EdgeKind> {
        &self.graph
    }

    /// Predecessors of `index` in execution order, of both edge kinds.
    pub(crate) fn predecessors(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(index, Direction::Incoming)
    }
}

/// Renders the graph as a Mermaid flowchart. Disabled tasks are drawn with a
/// dashed border.
impl fmt::Display for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph LR")?;

        for index in self.graph.node_indices() {
            let task = &self.graph[index];
            let name = task.name().replace('"', "\\\"");
            if task.is_enabled() {
                writeln!(f, "    {}[\"{}\"]", index.index(), name)?;
            } else {
                writeln!(f, "    {}[\"{}\"]:::disabled", index.index(), name)?;
            }
        }

        for edge in self.graph.edge_references() {
            writeln!(
                f,
                "    {} -- \"{}\" --> {}",
                edge.source().index(),
                edge.weight(),
                edge.target().index()
            )?;
        }

        writeln!(f, "    classDef disabled stroke-dasharray: 5 5")
    }
}
