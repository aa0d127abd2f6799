//! The host project the orchestrator is applied to.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

use crate::core::{BuildLayout, Classpath};
use crate::error::ScalaroidError;
use crate::graph::TaskGraph;
use crate::variant::Variant;

/// Callback run once, after the host has enumerated every variant.
pub type LifecycleHook = Box<dyn FnOnce(&mut Project) -> Result<(), ScalaroidError>>;

/// Host-wide options, as read from the host's properties file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectOptions {
    pub enable_jetifier: bool,
    pub jetifier_ignore_list: Option<String>,
}

/// Target platform of the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Platform {
    /// Boot classpath entries. The host may still change them after
    /// configuration, so they are read when a task executes.
    pub boot_classpath: Classpath,
}

pub struct Project {
    pub dir: Utf8PathBuf,
    pub layout: BuildLayout,
    pub plugins: BTreeSet<String>,
    pub options: ProjectOptions,
    /// Named file collections, such as compiler toolchains.
    pub configurations: BTreeMap<String, Classpath>,
    pub platform: Platform,
    pub variants: Vec<Variant>,
    pub tasks: TaskGraph,
    hooks: Vec<LifecycleHook>,
    evaluated: bool,
}

impl Project {
    /// A project rooted at `dir`, building into `dir/build`.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            layout: BuildLayout::new(dir.join("build")),
            dir,
            plugins: BTreeSet::new(),
            options: ProjectOptions::default(),
            configurations: BTreeMap::new(),
            platform: Platform::default(),
            variants: Vec::new(),
            tasks: TaskGraph::new(),
            hooks: Vec::new(),
            evaluated: false,
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    pub fn with_layout(mut self, layout: BuildLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_plugin(mut self, id: impl Into<String>) -> Self {
        self.plugins.insert(id.into());
        self
    }

    pub fn with_configuration(mut self, name: impl Into<String>, files: Classpath) -> Self {
        self.configurations.insert(name.into(), files);
        self
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.plugins.contains(id)
    }

    /// Variants in processing order: grouped by kind, in registration order
    /// within a kind.
    pub fn variants_in_order(&self) -> Vec<&Variant> {
        let mut variants: Vec<_> = self.variants.iter().collect();
        variants.sort_by_key(|variant| variant.kind);
        variants
    }

    /// Registers a hook for [`Project::evaluate`]. Hooks registered after
    /// evaluation are never run.
    pub fn after_evaluate<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Project) -> Result<(), ScalaroidError> + 'static,
    {
        if self.evaluated {
            tracing::warn!("project {} is already evaluated, hook ignored", self.dir);
            return;
        }
        self.hooks.push(Box::new(hook));
    }

    /// Marks configuration as finished and runs the registered hooks once, in
    /// registration order. The first failing hook aborts evaluation.
    pub fn evaluate(&mut self) -> Result<(), ScalaroidError> {
        if self.evaluated {
            return Ok(());
        }
        self.evaluated = true;

        for hook in std::mem::take(&mut self.hooks) {
            hook(self)?;
        }

        Ok(())
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("dir", &self.dir)
            .field("plugins", &self.plugins)
            .field("variants", &self.variants.len())
            .field("tasks", &self.tasks.len())
            .field("hooks", &self.hooks.len())
            .field("evaluated", &self.evaluated)
            .finish()
    }
}
