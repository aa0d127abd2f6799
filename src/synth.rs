//! Derivation of secondary compile tasks from primary ones.
use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::core::{BuildLayout, Classpath, JavaVersion, Languages, Staged};
use crate::error::IdentityError;
use crate::sources::MergedSourceSet;
use crate::task::{CompileOptions, IncrementalOptions, PrimaryTask, SecondaryTask, TaskState};
use crate::toolchain;

/// User hook run on every synthesized task, after everything else is copied.
pub type ConfigureHook = Arc<dyn Fn(&mut SecondaryTask) + Send + Sync>;

/// Target version requested through the compiler parameters.
///
/// The first parameter containing `target:` wins. The text after its first
/// `:` is parsed as a version. A parameter without a value, a value that does
/// not parse, or no such parameter at all yields `baseline`.
pub fn detect_target_version(parameters: &[String], baseline: JavaVersion) -> JavaVersion {
    let Some(parameter) = parameters.iter().find(|p| p.contains("target:")) else {
        return baseline;
    };

    match parameter.split(':').nth(1) {
        Some(value) if !value.is_empty() => match value.parse() {
            Ok(version) => version,
            Err(err) => {
                tracing::warn!("{err} in '{parameter}', assuming {baseline}");
                baseline
            }
        },
        _ => baseline,
    }
}

pub struct TaskSynthesizer {
    languages: Languages,
    tmp_dir: Utf8PathBuf,
    options: CompileOptions,
    baseline: JavaVersion,
    compiler_classpath: Classpath,
    compiler_plugins: Classpath,
    configure: Option<ConfigureHook>,
}

impl TaskSynthesizer {
    pub fn new(languages: Languages, layout: &BuildLayout) -> Self {
        Self {
            languages,
            tmp_dir: layout.tmp_dir(),
            options: CompileOptions::default(),
            baseline: JavaVersion::VERSION_1_8,
            compiler_classpath: Classpath::new(),
            compiler_plugins: Classpath::new(),
            configure: None,
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_baseline(mut self, baseline: JavaVersion) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_compiler_classpath(mut self, classpath: Classpath) -> Self {
        self.compiler_classpath = classpath;
        self
    }

    pub fn with_compiler_plugins(mut self, plugins: Classpath) -> Self {
        self.compiler_plugins = plugins;
        self
    }

    pub fn with_configure(mut self, hook: Option<ConfigureHook>) -> Self {
        self.configure = hook;
        self
    }

    /// Swaps every primary marker in `primary` for the secondary marker:
    /// `compileDebugJavaWithJavac` becomes `compileDebugScalaWithScalac`.
    pub fn derive_name(&self, primary: &str) -> Result<String, IdentityError> {
        let from = &self.languages.primary.marker;
        let to = &self.languages.secondary.marker;

        if from.is_empty() || !primary.contains(from.as_str()) {
            return Err(IdentityError {
                task: primary.to_string(),
                marker: from.clone(),
            });
        }

        Ok(primary.replace(from.as_str(), to))
    }

    pub fn synthesize(&self, variant: &str, primary: &PrimaryTask) -> Result<SecondaryTask, IdentityError> {
        let name = self.derive_name(&primary.name)?;

        let required = detect_target_version(&self.options.additional_parameters, self.baseline);
        tracing::info!("detected target platform version {required} for {name}");

        let toolchain_version = toolchain::detect_version(&primary.classpath);
        if let Some(version) = &toolchain_version {
            tracing::debug!("{name} compiles with toolchain {version}");
        }

        let incremental =
            IncrementalOptions::derive(&self.tmp_dir, &self.languages.secondary.directory, &name);

        let mut task = SecondaryTask {
            variant: variant.to_string(),
            primary: primary.name.clone(),
            output_dir: primary.output_dir.clone(),
            classpath: Staged::default(),
            annotation_processor_path: None,
            depends_on: primary.depends_on.clone(),
            source_compatibility: primary.source_compatibility.max(required),
            target_compatibility: primary.target_compatibility.max(required),
            options: self.options.clone(),
            incremental,
            toolchain_version,
            compiler_classpath: self.compiler_classpath.clone(),
            compiler_plugins: self.compiler_plugins.clone(),
            sources: MergedSourceSet::default(),
            enabled: true,
            state: TaskState::Configuring,
            deferred: Vec::new(),
            name,
        };

        if let Some(configure) = &self.configure {
            configure(&mut task);
        }

        Ok(task)
    }
}
