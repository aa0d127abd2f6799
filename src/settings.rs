//! User-facing configuration of the orchestrator.
use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::core::{JavaVersion, Languages};
use crate::error::ConfigurationError;
use crate::sources::SourceFilter;
use crate::task::KeepAliveMode;

/// Host plugin identifiers that make a project eligible.
pub const HOST_PLUGIN_IDS: &[&str] = &[
    "com.android.internal.application",
    "com.android.internal.library",
    "com.android.internal.test",
];

/// Name of the configuration holding the incremental compiler.
pub const COMPILER_CONFIGURATION: &str = "zinc";

/// Name of the configuration holding secondary compiler plugins.
pub const COMPILER_PLUGINS_CONFIGURATION: &str = "scalaCompilerPlugins";

/// Settings read from JSON, e.g.
///
/// ```json
/// {
///   "baseline-target": "1.8",
///   "additional-parameters": ["-target:jvm-11"],
///   "source-sets": { "main": ["src/shared/scala"] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub languages: Languages,
    /// Target version assumed when the compiler parameters name none.
    pub baseline_target: JavaVersion,
    pub additional_parameters: Vec<String>,
    pub keep_alive: KeepAliveMode,
    /// Include globs deciding which files under a secondary root count.
    pub include: Vec<String>,
    /// Extra secondary roots per provider name, relative to the project.
    pub source_sets: BTreeMap<String, Vec<Utf8PathBuf>>,
    pub required_configurations: Vec<String>,
    pub host_plugins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            languages: Languages::default(),
            baseline_target: JavaVersion::VERSION_1_8,
            additional_parameters: Vec::new(),
            keep_alive: KeepAliveMode::default(),
            include: vec!["**/*.java".into(), "**/*.scala".into()],
            source_sets: BTreeMap::new(),
            required_configurations: vec![
                COMPILER_CONFIGURATION.into(),
                COMPILER_PLUGINS_CONFIGURATION.into(),
            ],
            host_plugins: HOST_PLUGIN_IDS.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|error| ConfigurationError::SettingsRead {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_json(&text)
    }

    pub fn with_additional_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.additional_parameters.push(parameter.into());
        self
    }

    pub fn with_source_set(mut self, provider: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        self.source_sets
            .entry(provider.into())
            .or_default()
            .push(root.into());
        self
    }

    pub fn with_baseline_target(mut self, version: JavaVersion) -> Self {
        self.baseline_target = version;
        self
    }

    pub fn with_required_configurations<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.required_configurations = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn source_filter(&self) -> Result<SourceFilter, ConfigurationError> {
        Ok(SourceFilter::new(&self.include)?)
    }
}
