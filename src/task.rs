//! Compile task descriptors living in the task graph.
use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::core::{Classpath, JavaVersion, Staged};
use crate::error::SourceError;
use crate::sources::{MergedSourceSet, SourceFilter, scan_root};

/// A compile task owned by the host. The orchestrator reads it and only ever
/// writes to its exclusion list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryTask {
    pub name: String,
    pub output_dir: Utf8PathBuf,
    pub classpath: Classpath,
    pub annotation_processor_path: Classpath,
    /// Declared, explicit dependencies by task name.
    pub depends_on: Vec<String>,
    pub source_compatibility: JavaVersion,
    pub target_compatibility: JavaVersion,
    pub source_roots: Vec<Utf8PathBuf>,
    excludes: BTreeSet<Utf8PathBuf>,
}

impl PrimaryTask {
    pub fn new(name: impl Into<String>, output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            output_dir: output_dir.into(),
            classpath: Classpath::new(),
            annotation_processor_path: Classpath::new(),
            depends_on: Vec::new(),
            source_compatibility: JavaVersion::VERSION_1_8,
            target_compatibility: JavaVersion::VERSION_1_8,
            source_roots: Vec::new(),
            excludes: BTreeSet::new(),
        }
    }

    pub fn with_classpath(mut self, classpath: Classpath) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn with_annotation_processor_path(mut self, path: Classpath) -> Self {
        self.annotation_processor_path = path;
        self
    }

    pub fn with_dependency(mut self, task: impl Into<String>) -> Self {
        self.depends_on.push(task.into());
        self
    }

    pub fn with_compatibility(mut self, source: JavaVersion, target: JavaVersion) -> Self {
        self.source_compatibility = source;
        self.target_compatibility = target;
        self
    }

    pub fn with_source_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.source_roots.push(root.into());
        self
    }

    /// Extends the exclusion list, returning how many paths were new.
    pub fn exclude(&mut self, paths: impl IntoIterator<Item = Utf8PathBuf>) -> usize {
        paths
            .into_iter()
            .filter(|path| self.excludes.insert(path.clone()))
            .count()
    }

    pub fn excludes(&self) -> &BTreeSet<Utf8PathBuf> {
        &self.excludes
    }

    pub fn is_excluded(&self, path: impl AsRef<Utf8Path>) -> bool {
        self.excludes.contains(path.as_ref())
    }

    /// Files under the existing source roots accepted by `filter` and not
    /// excluded, as absolute paths.
    pub fn remaining_inputs(&self, filter: &SourceFilter) -> Result<Vec<Utf8PathBuf>, SourceError> {
        let mut inputs = Vec::new();
        for root in self.source_roots.iter().filter(|root| root.is_dir()) {
            for path in scan_root(root, filter, &[])? {
                if !self.is_excluded(&path) && !inputs.contains(&path) {
                    inputs.push(path);
                }
            }
        }
        Ok(inputs)
    }
}

/// How the secondary compiler daemon is kept around between compilations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeepAliveMode {
    #[default]
    Session,
    Daemon,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub additional_parameters: Vec<String>,
    pub keep_alive: KeepAliveMode,
}

/// Files consumed by the external incremental compiler. The orchestrator
/// never reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalOptions {
    pub analysis_file: Utf8PathBuf,
    pub classfile_backup: Utf8PathBuf,
}

impl IncrementalOptions {
    /// `<tmp>/<lang>/compilerAnalysis/<task>.analysis` and
    /// `<tmp>/<lang>/classfileBackup/<task>.bak`.
    pub fn derive(tmp_dir: &Utf8Path, language_dir: &str, task: &str) -> Self {
        let base = tmp_dir.join(language_dir);
        Self {
            analysis_file: base.join("compilerAnalysis").join(format!("{task}.analysis")),
            classfile_backup: base.join("classfileBackup").join(format!("{task}.bak")),
        }
    }
}

/// Work attached to a secondary task that the executor performs immediately
/// before the task's first execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Replace the initial classpath with platform boot entries plus the
    /// primary task's final classpath, and copy its annotation processor path.
    FinalizeClasspath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Synthesized, not yet part of the graph.
    Configuring,
    /// Inserted and connected.
    Wired,
}

/// A compile task for the secondary language, mirroring a primary task.
#[derive(Debug, Clone)]
pub struct SecondaryTask {
    pub name: String,
    pub variant: String,
    pub primary: String,
    pub output_dir: Utf8PathBuf,
    pub classpath: Staged<Classpath>,
    pub annotation_processor_path: Option<Classpath>,
    pub depends_on: Vec<String>,
    pub source_compatibility: JavaVersion,
    pub target_compatibility: JavaVersion,
    pub options: CompileOptions,
    pub incremental: IncrementalOptions,
    /// Version of the secondary toolchain found on the primary classpath.
    pub toolchain_version: Option<String>,
    pub compiler_classpath: Classpath,
    pub compiler_plugins: Classpath,
    pub sources: MergedSourceSet,
    pub(crate) enabled: bool,
    pub(crate) state: TaskState,
    pub(crate) deferred: Vec<DeferredAction>,
}

impl SecondaryTask {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Marks the task as non-executable. It stays in the graph.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn deferred_actions(&self) -> &[DeferredAction] {
        &self.deferred
    }

    pub(crate) fn defer(&mut self, action: DeferredAction) {
        if !self.deferred.contains(&action) {
            self.deferred.push(action);
        }
    }
}
