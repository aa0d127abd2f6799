//! Per-variant orchestration, run once after the host enumerated its variants.
use std::fmt;

use crate::classpath::ClasspathResolver;
use crate::core::Staged;
use crate::error::{ConfigurationError, DuplicateTaskError, ScalaroidError};
use crate::graph::TaskGraph;
use crate::project::Project;
use crate::settings::{COMPILER_CONFIGURATION, COMPILER_PLUGINS_CONFIGURATION, Settings};
use crate::sources::SourceProviderMerger;
use crate::synth::{ConfigureHook, TaskSynthesizer};
use crate::task::{CompileOptions, DeferredAction};
use crate::variant::Variant;
use crate::wire::{GraphWirer, Wiring};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The variant declares no primary compile task.
    NoPrimaryTask,
    /// The declared primary compile task is not in the graph.
    MissingPrimaryTask(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPrimaryTask => write!(f, "no primary compile task"),
            SkipReason::MissingPrimaryTask(name) => write!(f, "primary task '{name}' not found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantOutcome {
    /// An enabled secondary task was wired.
    Wired(Wiring),
    /// A secondary task exists but has nothing to compile.
    Disabled(Wiring),
    Skipped(SkipReason),
}

impl VariantOutcome {
    pub fn task(&self) -> Option<&str> {
        match self {
            VariantOutcome::Wired(wiring) | VariantOutcome::Disabled(wiring) => Some(&wiring.task),
            VariantOutcome::Skipped(_) => None,
        }
    }
}

/// Outcome of one driver run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub outcomes: Vec<(String, VariantOutcome)>,
    /// `(unit test task, task it depends on)` edges added after every variant
    /// was processed.
    pub test_edges: Vec<(String, String)>,
}

impl DriverReport {
    pub fn outcome(&self, variant: &str) -> Option<&VariantOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == variant)
            .map(|(_, outcome)| outcome)
    }

    /// Names of the enabled secondary tasks.
    pub fn wired(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|(_, outcome)| match outcome {
            VariantOutcome::Wired(wiring) => Some(wiring.task.as_str()),
            _ => None,
        })
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, VariantOutcome::Skipped(_)))
            .count()
    }
}

pub struct VariantDriver {
    merger: SourceProviderMerger,
    synthesizer: TaskSynthesizer,
    resolver: ClasspathResolver,
    wirer: GraphWirer,
}

impl VariantDriver {
    pub fn new(merger: SourceProviderMerger, synthesizer: TaskSynthesizer) -> Self {
        Self {
            merger,
            synthesizer,
            resolver: ClasspathResolver,
            wirer: GraphWirer,
        }
    }

    /// Driver configured from `settings` and the named configurations of
    /// `project` as they are right now.
    pub fn from_settings(
        settings: &Settings,
        project: &Project,
        configure: Option<ConfigureHook>,
    ) -> Result<Self, ConfigurationError> {
        let merger = SourceProviderMerger::new(settings.source_filter()?);

        let options = CompileOptions {
            additional_parameters: settings.additional_parameters.clone(),
            keep_alive: settings.keep_alive,
        };

        let configuration = |name: &str| {
            project
                .configurations
                .get(name)
                .cloned()
                .unwrap_or_default()
        };

        let synthesizer = TaskSynthesizer::new(settings.languages.clone(), &project.layout)
            .with_options(options)
            .with_baseline(settings.baseline_target)
            .with_compiler_classpath(configuration(COMPILER_CONFIGURATION))
            .with_compiler_plugins(configuration(COMPILER_PLUGINS_CONFIGURATION))
            .with_configure(configure);

        Ok(Self::new(merger, synthesizer))
    }

    /// Processes every variant of `project` in order. Fails on the first
    /// fatal error, leaving already wired variants in place.
    pub fn run(&self, project: &mut Project) -> Result<DriverReport, ScalaroidError> {
        let variants: Vec<Variant> = project.variants_in_order().into_iter().cloned().collect();
        let mut report = DriverReport::default();

        for variant in &variants {
            let span = tracing::debug_span!("variant", name = %variant.name);
            let _enter = span.enter();

            let outcome = self.process(variant, &mut project.tasks)?;
            report.outcomes.push((variant.name.clone(), outcome));
        }

        let wired: Vec<(String, Wiring)> = report
            .outcomes
            .iter()
            .filter_map(|(variant, outcome)| match outcome {
                VariantOutcome::Wired(wiring) => Some((variant.clone(), wiring.clone())),
                _ => None,
            })
            .collect();

        report.test_edges = self.wirer.wire_test_counterparts(&wired, &mut project.tasks)?;

        tracing::debug!(
            "processed {} variants, {} skipped",
            report.outcomes.len(),
            report.skipped()
        );

        Ok(report)
    }

    fn process(&self, variant: &Variant, graph: &mut TaskGraph) -> Result<VariantOutcome, ScalaroidError> {
        let Some(primary_name) = &variant.primary_task else {
            tracing::info!("variant {} has no primary compile task, skipping", variant.name);
            return Ok(VariantOutcome::Skipped(SkipReason::NoPrimaryTask));
        };

        let Some(primary) = graph.primary(primary_name) else {
            tracing::info!("primary task {primary_name} of {} not found, skipping", variant.name);
            return Ok(VariantOutcome::Skipped(SkipReason::MissingPrimaryTask(
                primary_name.clone(),
            )));
        };

        let merged = self
            .merger
            .merge(&variant.providers, &variant.extra_primary_roots)
            .map_err(|err| ScalaroidError::Sources(variant.name.clone(), err))?;

        let mut task = self.synthesizer.synthesize(&variant.name, primary)?;
        task.classpath = Staged::new(self.resolver.initial_classpath(primary));

        if graph.contains(&task.name) {
            return Err(DuplicateTaskError(task.name).into());
        }

        task.sources = merged.clone();
        let wiring = self.wirer.wire(task, primary_name, graph)?;

        // Only a wired task takes files away from the primary one.
        if let Some(primary) = graph.primary_mut(primary_name) {
            let excluded = self.merger.exclude_from(&merged, primary);
            tracing::debug!("excluded {excluded} files from {primary_name}");
        }

        if !wiring.enabled {
            return Ok(VariantOutcome::Disabled(wiring));
        }

        if let Some(task) = graph.secondary_mut(&wiring.task) {
            task.defer(DeferredAction::FinalizeClasspath);
        }

        Ok(VariantOutcome::Wired(wiring))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Classpath;
    use crate::error::GraphError;
    use crate::task::PrimaryTask;
    use crate::variant::{SourceProvider, VariantKind};
    use camino::Utf8PathBuf;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn project_with_sources() -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().canonicalize().unwrap()).unwrap();
        fs::create_dir_all(root.join("src/main/scala")).unwrap();
        fs::write(root.join("src/main/scala/A.scala"), "").unwrap();

        let mut project = Project::new(&root)
            .with_configuration(COMPILER_CONFIGURATION, Classpath::from_iter(["zinc.jar"]))
            .with_variant(
                Variant::new("debug", VariantKind::Application)
                    .with_provider(SourceProvider::conventional(&root, "main", "scala"))
                    .with_primary_task("compileDebugJava"),
            )
            .with_variant(Variant::new("debugAndroidTest", VariantKind::AndroidTest));

        project
            .tasks
            .add_primary(PrimaryTask::new("compileDebugJava", "out").with_classpath(Classpath::from_iter(["a.jar"])))
            .unwrap();

        (dir, project)
    }

    fn driver(project: &Project) -> VariantDriver {
        VariantDriver::from_settings(&Settings::default(), project, None).unwrap()
    }

    #[test]
    fn test_run_reports_outcomes() {
        let (_dir, mut project) = project_with_sources();
        let report = driver(&project).run(&mut project).unwrap();

        assert_eq!(report.wired().collect::<Vec<_>>(), vec!["compileDebugScala"]);
        assert_eq!(
            report.outcome("debugAndroidTest"),
            Some(&VariantOutcome::Skipped(SkipReason::NoPrimaryTask))
        );
        assert_eq!(report.skipped(), 1);

        let task = project.tasks.secondary("compileDebugScala").unwrap();
        assert_eq!(task.classpath.initial(), &Classpath::from_iter(["a.jar"]));
        assert_eq!(task.compiler_classpath, Classpath::from_iter(["zinc.jar"]));
        assert_eq!(task.deferred_actions(), &[DeferredAction::FinalizeClasspath]);
    }

    #[test]
    fn test_excludes_secondary_files_from_primary() {
        let (_dir, mut project) = project_with_sources();
        driver(&project).run(&mut project).unwrap();

        let primary = project.tasks.primary("compileDebugJava").unwrap();
        assert_eq!(primary.excludes().len(), 1);
        assert!(primary.excludes().iter().all(|p| p.as_str().ends_with("A.scala")));
    }

    #[test]
    fn test_missing_primary_is_skipped() {
        let mut project = Project::new("app").with_variant(
            Variant::new("release", VariantKind::Application).with_primary_task("compileReleaseJava"),
        );
        let report = driver(&project).run(&mut project).unwrap();

        assert_eq!(
            report.outcome("release"),
            Some(&VariantOutcome::Skipped(SkipReason::MissingPrimaryTask(
                "compileReleaseJava".into()
            )))
        );
        assert!(project.tasks.secondary("compileReleaseScala").is_none());
    }

    #[test]
    fn test_failed_wiring_leaves_primary_inputs_alone() {
        let (_dir, mut project) = project_with_sources();
        project.tasks = TaskGraph::new();
        project
            .tasks
            .add_primary(PrimaryTask::new("compileDebugJava", "out").with_dependency("dexBuilderDebug"))
            .unwrap();
        project.tasks.add_task("dexBuilderDebug").unwrap();

        let err = driver(&project).run(&mut project).unwrap_err();

        assert!(matches!(err, ScalaroidError::Graph(GraphError::Cycle { .. })));
        assert!(project.tasks.primary("compileDebugJava").unwrap().excludes().is_empty());
    }

    #[test]
    fn test_unexpected_primary_name_is_an_identity_error() {
        let (_dir, mut project) = project_with_sources();
        project.variants[0].primary_task = Some("compileDebugKotlin".into());
        project.tasks.add_primary(PrimaryTask::new("compileDebugKotlin", "out")).unwrap();

        let err = driver(&project).run(&mut project).unwrap_err();

        assert!(matches!(err, ScalaroidError::Identity(_)));
        assert_eq!(project.tasks.secondaries().count(), 0);
        assert!(project.tasks.primary("compileDebugKotlin").unwrap().excludes().is_empty());
    }

    #[test]
    fn test_second_run_is_a_duplicate() {
        let (_dir, mut project) = project_with_sources();
        let driver = driver(&project);
        driver.run(&mut project).unwrap();

        assert!(matches!(
            driver.run(&mut project),
            Err(ScalaroidError::DuplicateTask(DuplicateTaskError(name))) if name == "compileDebugScala"
        ));
    }
}
