use std::fs;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use scalaroid::{
    ActionError, COMPILER_CONFIGURATION, COMPILER_PLUGINS_CONFIGURATION, Classpath, DuplicateTaskError,
    HOST_PLUGIN_IDS, Plugin, PrimaryTask, Project, ScalaroidError, SecondaryTask, Settings, SourceFilter,
    SourceProvider, TaskActions, TaskOutcome, Variant, VariantKind, execute,
};

struct Fixture {
    _dir: tempfile::TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().canonicalize().unwrap()).unwrap();
        Self { _dir: dir, root }
    }

    fn write(&self, relative: &str) -> Utf8PathBuf {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        path
    }

    fn project(&self) -> Project {
        Project::new(&self.root)
            .with_plugin(HOST_PLUGIN_IDS[0])
            .with_configuration(COMPILER_CONFIGURATION, Classpath::from_iter(["zinc.jar"]))
            .with_configuration(COMPILER_PLUGINS_CONFIGURATION, Classpath::new())
    }
}

fn variant(name: &str, kind: VariantKind, providers: &[&str], primary: &str) -> Variant {
    providers
        .iter()
        .fold(Variant::new(name, kind), |variant, provider| {
            variant.with_provider(SourceProvider::new(*provider))
        })
        .with_primary_task(primary)
}

fn primary(root: &Utf8Path, name: &str, providers: &[&str]) -> PrimaryTask {
    providers.iter().fold(
        PrimaryTask::new(name, root.join("build/intermediates/javac")),
        |task, provider| task.with_source_root(root.join("src").join(provider).join("java")),
    )
}

/// Records what each compile saw.
#[derive(Default)]
struct Recorder {
    compiled: Mutex<Vec<(String, Classpath)>>,
}

impl TaskActions for Recorder {
    fn compile(&self, task: &SecondaryTask) -> Result<(), ActionError> {
        let classpath = task.classpath.current().clone();
        self.compiled.lock().unwrap().push((task.name.clone(), classpath));
        Ok(())
    }
}

#[test]
fn scenario_a_main_sources_enable_the_task() {
    let fixture = Fixture::new();
    fixture.write("src/main/scala/App.scala");

    let mut project = fixture
        .project()
        .with_variant(variant("debug", VariantKind::Application, &["main", "debug"], "compileDebugJava"));
    project
        .tasks
        .add_primary(primary(&fixture.root, "compileDebugJava", &["main", "debug"]))
        .unwrap();
    project.tasks.add_task("dexBuilderDebug").unwrap();

    Plugin::new(Settings::default()).apply(&mut project).unwrap();
    project.evaluate().unwrap();

    let task = project.tasks.secondary("compileDebugScala").unwrap();
    assert!(task.is_enabled());
    assert_eq!(task.primary, "compileDebugJava");
    assert_eq!(
        task.incremental.analysis_file,
        fixture.root.join("build/tmp/scala/compilerAnalysis/compileDebugScala.analysis")
    );
    assert!(
        task.incremental
            .analysis_file
            .ends_with("tmp/scala/compilerAnalysis/compileDebugScala.analysis")
    );
    assert_eq!(task.sources.secondary_files().len(), 1);

    assert_eq!(project.tasks.finalizers_of("compileDebugJava"), vec!["compileDebugScala"]);
    assert_eq!(project.tasks.dependencies_of("dexBuilderDebug"), vec!["compileDebugScala"]);
}

#[test]
fn scenario_b_no_sources_disable_the_task() {
    let fixture = Fixture::new();
    fixture.write("src/main/java/App.java");

    let mut project = fixture
        .project()
        .with_variant(variant("release", VariantKind::Application, &["main", "release"], "compileReleaseJava"));
    project
        .tasks
        .add_primary(primary(&fixture.root, "compileReleaseJava", &["main", "release"]))
        .unwrap();
    project.tasks.add_task("dexBuilderRelease").unwrap();
    project.tasks.add_task("lintVitalAnalyzeRelease").unwrap();

    Plugin::new(Settings::default()).apply(&mut project).unwrap();
    project.evaluate().unwrap();

    let task = project.tasks.secondary("compileReleaseScala").unwrap();
    assert!(!task.is_enabled());
    assert!(project.tasks.finalizers_of("compileReleaseJava").is_empty());
    assert!(project.tasks.dependencies_of("dexBuilderRelease").is_empty());
    assert!(project.tasks.dependencies_of("lintVitalAnalyzeRelease").is_empty());
    assert!(project.tasks.primary("compileReleaseJava").unwrap().excludes().is_empty());
}

#[test]
fn scenario_c_colliding_name_aborts_before_wiring() {
    let fixture = Fixture::new();
    fixture.write("src/main/scala/App.scala");
    fixture.write("src/test/scala/AppTest.scala");

    let mut project = fixture
        .project()
        .with_variant(variant("debug", VariantKind::Application, &["main"], "compileDebugJava"))
        .with_variant(variant("debugUnitTest", VariantKind::UnitTest, &["test"], "compileDebugJava"));
    project
        .tasks
        .add_primary(primary(&fixture.root, "compileDebugJava", &["main"]))
        .unwrap();

    Plugin::new(Settings::default()).apply(&mut project).unwrap();
    let err = project.evaluate().unwrap_err();

    assert!(matches!(
        err,
        ScalaroidError::DuplicateTask(DuplicateTaskError(ref name)) if name == "compileDebugScala"
    ));
    assert_eq!(project.tasks.secondaries().count(), 1);

    // The colliding variant left the primary task untouched.
    let primary = project.tasks.primary("compileDebugJava").unwrap();
    assert_eq!(primary.excludes().len(), 1);
    assert!(!primary.is_excluded(fixture.root.join("src/test/scala/AppTest.scala")));
}

#[test]
fn unit_test_tasks_depend_on_their_counterpart() {
    let fixture = Fixture::new();
    fixture.write("src/main/scala/App.scala");
    fixture.write("src/test/scala/AppTest.scala");

    let mut project = fixture
        .project()
        .with_variant(variant("debugUnitTest", VariantKind::UnitTest, &["test"], "compileDebugUnitTestJava"))
        .with_variant(variant("debug", VariantKind::Application, &["main"], "compileDebugJava"));
    project
        .tasks
        .add_primary(primary(&fixture.root, "compileDebugJava", &["main"]))
        .unwrap();
    project
        .tasks
        .add_primary(primary(&fixture.root, "compileDebugUnitTestJava", &["test"]))
        .unwrap();

    Plugin::new(Settings::default()).apply(&mut project).unwrap();
    project.evaluate().unwrap();

    assert_eq!(
        project.tasks.dependencies_of("compileDebugUnitTestScala"),
        vec!["compileDebugScala"]
    );
}

#[test]
fn secondary_sources_never_reach_the_primary_compiler() {
    let fixture = Fixture::new();
    fixture.write("src/main/java/Main.java");
    fixture.write("src/main/scala/Bridge.java");
    fixture.write("src/main/scala/App.scala");

    let mut project = fixture
        .project()
        .with_variant(variant("debug", VariantKind::Application, &["main"], "compileDebugJava"));
    project
        .tasks
        .add_primary(
            primary(&fixture.root, "compileDebugJava", &["main"])
                .with_source_root(fixture.root.join("src/main/scala")),
        )
        .unwrap();

    Plugin::new(Settings::default()).apply(&mut project).unwrap();
    project.evaluate().unwrap();

    let secondary = project.tasks.secondary("compileDebugScala").unwrap();
    let primary = project.tasks.primary("compileDebugJava").unwrap();
    let remaining = primary.remaining_inputs(&SourceFilter::default()).unwrap();

    assert_eq!(remaining, vec![fixture.root.join("src/main/java/Main.java")]);
    assert!(remaining.iter().all(|path| !secondary.sources.contains(path)));
    assert_eq!(secondary.sources.secondary_files().len(), 2);
}

#[cfg(unix)]
#[test]
fn exclusions_use_the_project_path_as_given() {
    let fixture = Fixture::new();
    fixture.write("real/src/main/java/Main.java");
    fixture.write("real/src/main/scala/App.scala");
    std::os::unix::fs::symlink(fixture.root.join("real"), fixture.root.join("link")).unwrap();

    let project_dir = fixture.root.join("link");
    let mut project = Project::new(&project_dir)
        .with_plugin(HOST_PLUGIN_IDS[0])
        .with_configuration(COMPILER_CONFIGURATION, Classpath::new())
        .with_configuration(COMPILER_PLUGINS_CONFIGURATION, Classpath::new())
        .with_variant(variant("debug", VariantKind::Application, &["main"], "compileDebugJava"));
    project
        .tasks
        .add_primary(
            primary(&project_dir, "compileDebugJava", &["main"]).with_source_root(project_dir.join("src/main/scala")),
        )
        .unwrap();

    Plugin::new(Settings::default()).apply(&mut project).unwrap();
    project.evaluate().unwrap();

    let primary = project.tasks.primary("compileDebugJava").unwrap();
    assert!(primary.is_excluded(project_dir.join("src/main/scala/App.scala")));
    assert_eq!(
        primary.remaining_inputs(&SourceFilter::default()).unwrap(),
        vec![project_dir.join("src/main/java/Main.java")]
    );
}

#[test]
fn execution_sees_classpath_entries_added_after_configuration() {
    let fixture = Fixture::new();
    fixture.write("src/main/scala/App.scala");

    let mut project = fixture
        .project()
        .with_variant(variant("debug", VariantKind::Application, &["main"], "compileDebugJava"));
    project
        .tasks
        .add_primary(
            primary(&fixture.root, "compileDebugJava", &["main"])
                .with_classpath(Classpath::from_iter(["libs/scala-library-2.13.12.jar"])),
        )
        .unwrap();

    Plugin::new(Settings::default()).apply(&mut project).unwrap();
    project.evaluate().unwrap();

    let task = project.tasks.secondary("compileDebugScala").unwrap();
    assert_eq!(task.toolchain_version.as_deref(), Some("2.13.12"));
    assert!(!task.classpath.is_final());

    project.platform.boot_classpath.push("android.jar");
    project
        .tasks
        .primary_mut("compileDebugJava")
        .unwrap()
        .classpath
        .push("build/generated/R.jar");

    let recorder = Recorder::default();
    let diagnostics = execute(&mut project, &["compileDebugJava"], &recorder).unwrap();

    assert!(diagnostics.is_success());
    assert!(matches!(
        diagnostics.get("compileDebugScala").unwrap().outcome,
        TaskOutcome::Succeeded
    ));

    let compiled = recorder.compiled.lock().unwrap();
    assert_eq!(
        compiled.as_slice(),
        &[(
            "compileDebugScala".to_string(),
            Classpath::from_iter(["android.jar", "libs/scala-library-2.13.12.jar", "build/generated/R.jar"]),
        )]
    );
}

#[test]
fn target_parameter_raises_compatibility() {
    let fixture = Fixture::new();
    fixture.write("src/main/scala/App.scala");

    let mut project = fixture
        .project()
        .with_variant(variant("debug", VariantKind::Application, &["main"], "compileDebugJava"));
    project
        .tasks
        .add_primary(primary(&fixture.root, "compileDebugJava", &["main"]))
        .unwrap();

    let settings = Settings::default().with_additional_parameter("-target:jvm-17");
    Plugin::new(settings)
        .configure(|task| task.options.additional_parameters.push("-feature".into()))
        .apply(&mut project)
        .unwrap();
    project.evaluate().unwrap();

    let task = project.tasks.secondary("compileDebugScala").unwrap();
    assert_eq!(task.target_compatibility.to_string(), "17");
    assert_eq!(
        task.options.additional_parameters,
        vec!["-target:jvm-17".to_string(), "-feature".to_string()]
    );
}
