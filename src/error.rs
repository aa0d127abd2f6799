use camino::Utf8PathBuf;
use thiserror::Error;

pub use anyhow::Error as ActionError;

/// Umbrella error returned by the lifecycle entry points.
#[derive(Debug, Error)]
pub enum ScalaroidError {
    #[error("Configuration error:\n{0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    DuplicateTask(#[from] DuplicateTaskError),

    #[error("Error while wiring the task graph:\n{0}")]
    Graph(#[from] GraphError),

    #[error("Variant '{0}': {1}")]
    Sources(String, SourceError),
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "You must apply one of the host plugins {} before using this plugin",
        expected.join(", ")
    )]
    MissingPlugin { expected: Vec<String> },

    #[error("Required configuration '{0}' is not defined")]
    MissingConfiguration(String),

    #[error(
        "If jetifier is enabled, \"android.jetifier.ignorelist={0}\" should be defined in gradle.properties."
    )]
    Jetifier(String),

    #[error("Couldn't read settings file {path}.\n{error}")]
    SettingsRead {
        path: Utf8PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid settings.\n{0}")]
    Settings(#[from] serde_json::Error),

    #[error("Couldn't compile source filter pattern.\n{0}")]
    FilterPattern(#[from] glob::PatternError),
}

/// The primary task name carries no marker that could be swapped for the
/// secondary language.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Task '{task}' has no '{marker}' marker to derive a task name from")]
pub struct IdentityError {
    pub task: String,
    pub marker: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Task '{0}' already exists in the task graph")]
pub struct DuplicateTaskError(pub String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Task '{0}' not found")]
    UnknownTask(String),

    #[error("Edge {from} -> {to} would introduce a cycle")]
    Cycle { from: String, to: String },

    #[error(transparent)]
    Duplicate(#[from] DuplicateTaskError),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Couldn't read source root {path}.\n{error}")]
    Io {
        path: Utf8PathBuf,
        error: std::io::Error,
    },

    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}

impl SourceError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Couldn't plan execution:\n{0}")]
    Plan(#[from] GraphError),

    #[cfg(feature = "progress")]
    #[error("Invalid progress bar template.\n{0}")]
    Progress(#[from] indicatif::style::TemplateError),
}
