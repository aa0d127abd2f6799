//! Variants and the source providers contributing to them.
use camino::{Utf8Path, Utf8PathBuf};

/// Which variant collection of the host a variant was enumerated from.
///
/// The order of the enum is the order variants are processed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariantKind {
    Application,
    Library,
    TestApplication,
    AndroidTest,
    UnitTest,
}

/// A named bundle of source roots contributed by one configuration axis, such
/// as `main`, a product flavor or a build type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceProvider {
    pub name: String,
    /// Roots holding secondary-language sources. Empty when the provider has
    /// none. Roots are not required to exist.
    pub secondary_roots: Vec<Utf8PathBuf>,
    /// Glob patterns, relative to a root, of files this provider excludes.
    pub excludes: Vec<String>,
}

impl SourceProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secondary_roots: Vec::new(),
            excludes: Vec::new(),
        }
    }

    /// Provider with the conventional `src/<name>/<dir>` secondary root under
    /// `project_dir`.
    pub fn conventional(project_dir: &Utf8Path, name: impl Into<String>, secondary_dir: &str) -> Self {
        let name = name.into();
        let root = project_dir.join("src").join(&name).join(secondary_dir);
        Self {
            secondary_roots: vec![root],
            excludes: Vec::new(),
            name,
        }
    }

    pub fn with_secondary_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.secondary_roots.push(root.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Adds a secondary root unless it is already registered.
    pub(crate) fn attach_secondary_root(&mut self, root: Utf8PathBuf) {
        if !self.secondary_roots.contains(&root) {
            self.secondary_roots.push(root);
        }
    }

    pub fn has_secondary_roots(&self) -> bool {
        !self.secondary_roots.is_empty()
    }
}

/// One independently buildable output configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub kind: VariantKind,
    /// Ordered, most specific last.
    pub providers: Vec<SourceProvider>,
    /// Name of the primary compile task, if the variant has one.
    pub primary_task: Option<String>,
    /// Extra primary-language roots, usually generated sources.
    pub extra_primary_roots: Vec<Utf8PathBuf>,
}

impl Variant {
    pub fn new(name: impl Into<String>, kind: VariantKind) -> Self {
        Self {
            name: name.into(),
            kind,
            providers: Vec::new(),
            primary_task: None,
            extra_primary_roots: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: SourceProvider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_primary_task(mut self, task: impl Into<String>) -> Self {
        self.primary_task = Some(task.into());
        self
    }

    pub fn with_extra_primary_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.extra_primary_roots.push(root.into());
        self
    }

    /// The variant name with its first character upper-cased, as embedded in
    /// host task names (`debug` -> `Debug`).
    pub fn capitalized_name(&self) -> String {
        capitalize(&self.name)
    }
}

pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
