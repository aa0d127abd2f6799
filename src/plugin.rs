//! Entry point applied to a host project.
use std::collections::BTreeMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::driver::VariantDriver;
use crate::error::{ConfigurationError, ScalaroidError};
use crate::project::Project;
use crate::settings::Settings;
use crate::synth::ConfigureHook;
use crate::task::SecondaryTask;
use crate::variant::Variant;

/// Secondary roots per source provider name, built once from the
/// `src/<provider>/<dir>` convention and the user's settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSetRegistry {
    roots: BTreeMap<String, Vec<Utf8PathBuf>>,
}

impl SourceSetRegistry {
    /// Registry for every provider of `variants`. Relative roots from
    /// `settings` are resolved against `project_dir`.
    pub fn new(project_dir: &Utf8Path, variants: &[Variant], settings: &Settings) -> Self {
        let mut registry = Self::default();
        let directory = &settings.languages.secondary.directory;

        for provider in variants.iter().flat_map(|variant| &variant.providers) {
            let root = project_dir.join("src").join(&provider.name).join(directory);
            registry.register(&provider.name, root);
        }

        for (provider, roots) in &settings.source_sets {
            for root in roots {
                registry.register(provider, project_dir.join(root));
            }
        }

        registry
    }

    pub fn register(&mut self, provider: &str, root: Utf8PathBuf) {
        let roots = self.roots.entry(provider.to_string()).or_default();
        if !roots.contains(&root) {
            roots.push(root);
        }
    }

    pub fn roots(&self, provider: &str) -> &[Utf8PathBuf] {
        self.roots.get(provider).map(Vec::as_slice).unwrap_or_default()
    }

    /// Adds the registered roots to the matching providers of `variants` as
    /// secondary roots. Primary-language files under them are compiled by the
    /// secondary task together with the secondary sources.
    pub fn attach(&self, variants: &mut [Variant]) {
        for provider in variants.iter_mut().flat_map(|variant| &mut variant.providers) {
            for root in self.roots(&provider.name) {
                provider.attach_secondary_root(root.clone());
            }
        }
    }
}

pub struct Plugin {
    settings: Settings,
    configure: Option<ConfigureHook>,
}

impl Plugin {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            configure: None,
        }
    }

    /// Registers a hook run on every synthesized task.
    pub fn configure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut SecondaryTask) + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(hook));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validates the host and registers the variant processing to run once the
    /// project is evaluated.
    pub fn apply(self, project: &mut Project) -> Result<(), ScalaroidError> {
        self.check_host(project)?;

        let registry = SourceSetRegistry::new(&project.dir, &project.variants, &self.settings);
        registry.attach(&mut project.variants);

        let Plugin { settings, configure } = self;
        project.after_evaluate(move |project| {
            let driver = VariantDriver::from_settings(&settings, project, configure)?;
            let report = driver.run(project)?;

            tracing::info!(
                "wired {} secondary tasks across {} variants",
                report.wired().count(),
                report.outcomes.len()
            );

            Ok(())
        });

        Ok(())
    }

    fn check_host(&self, project: &Project) -> Result<(), ConfigurationError> {
        let settings = &self.settings;

        if !settings.host_plugins.iter().any(|id| project.has_plugin(id)) {
            return Err(ConfigurationError::MissingPlugin {
                expected: settings.host_plugins.clone(),
            });
        }

        if let Some(missing) = settings
            .required_configurations
            .iter()
            .find(|name| !project.configurations.contains_key(name.as_str()))
        {
            return Err(ConfigurationError::MissingConfiguration(missing.clone()));
        }

        let directory = &settings.languages.secondary.directory;
        if project.options.enable_jetifier {
            let ignored = project
                .options
                .jetifier_ignore_list
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .any(|entry| entry.trim().contains(directory.as_str()));

            if !ignored {
                return Err(ConfigurationError::Jetifier(directory.clone()));
            }
        }

        Ok(())
    }
}
