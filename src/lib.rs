#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod classpath;
mod core;
mod driver;
mod error;
mod executor;
mod graph;
mod plugin;
mod project;
mod settings;
mod sources;
mod synth;
mod task;
pub mod toolchain;
mod variant;
mod wire;

pub use crate::classpath::{ClasspathResolver, Finalized};
pub use crate::core::{BuildLayout, Classpath, JavaVersion, JavaVersionError, Language, Languages, Staged};
pub use crate::driver::{DriverReport, SkipReason, VariantDriver, VariantOutcome};
pub use crate::error::*;
pub use crate::executor::{Diagnostics, TaskActions, TaskExecution, TaskOutcome, execute};
pub use crate::graph::{EdgeKind, GenericTask, Task, TaskGraph};
pub use crate::plugin::{Plugin, SourceSetRegistry};
pub use crate::project::{LifecycleHook, Platform, Project, ProjectOptions};
pub use crate::settings::{COMPILER_CONFIGURATION, COMPILER_PLUGINS_CONFIGURATION, HOST_PLUGIN_IDS, Settings};
pub use crate::sources::{MergedSourceSet, Origin, SourceFile, SourceFilter, SourceProviderMerger};
pub use crate::synth::{ConfigureHook, TaskSynthesizer, detect_target_version};
pub use crate::task::{
    CompileOptions, DeferredAction, IncrementalOptions, KeepAliveMode, PrimaryTask, SecondaryTask, TaskState,
};
pub use crate::variant::{SourceProvider, Variant, VariantKind};
pub use crate::wire::{DOWNSTREAM_TASKS, DownstreamTask, GraphWirer, Wiring};

/// Installs a global `tracing` subscriber printing to stderr, filtered by
/// `RUST_LOG` (default `info`). With the `progress` feature, spans of the
/// executor are drawn as progress bars.
#[cfg(feature = "logging")]
pub fn init_logging() -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(feature = "progress")]
    let result = {
        let indicatif = tracing_indicatif::IndicatifLayer::new();
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(indicatif.get_stderr_writer()))
            .with(indicatif)
            .try_init()
    };

    #[cfg(not(feature = "progress"))]
    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();

    result
}
