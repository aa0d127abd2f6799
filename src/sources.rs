//! Merging of per-provider source roots into one source set per variant.
use std::collections::{BTreeSet, HashSet};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use glob::{Pattern, glob};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::SourceError;
use crate::task::PrimaryTask;
use crate::variant::SourceProvider;

/// Decides which files under a source root count as compilable sources.
///
/// A path, relative to its root, is rejected if it matches any exclude
/// pattern. Otherwise it is accepted if it matches any include pattern.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    include: Vec<Pattern>,
}

impl SourceFilter {
    pub fn new<S: AsRef<str>>(include: &[S]) -> Result<Self, glob::PatternError> {
        Ok(Self {
            include: include
                .iter()
                .map(|p| Pattern::new(p.as_ref()))
                .collect::<Result<_, _>>()?,
        })
    }

    /// The filter applied to secondary roots: both languages may live there.
    pub fn secondary() -> Self {
        Self::new(&["**/*.java", "**/*.scala"]).expect("static patterns are valid")
    }

    pub fn matches(&self, relative: &Utf8Path, excludes: &[Pattern]) -> bool {
        let path = relative.as_str();
        if excludes.iter().any(|p| p.matches(path)) {
            return false;
        }
        self.include.iter().any(|p| p.matches(path))
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::secondary()
    }
}

/// Where a merged file came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A secondary root of the named provider.
    Provider(String),
    /// One of the variant's extra primary-language roots.
    Extra,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path.
    pub path: Utf8PathBuf,
    pub origin: Origin,
}

impl SourceFile {
    pub fn is_secondary(&self) -> bool {
        matches!(self.origin, Origin::Provider(_))
    }
}

/// Deduplicated union of a variant's secondary roots and extra primary roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedSourceSet {
    roots: Vec<(Origin, Utf8PathBuf)>,
    files: Vec<SourceFile>,
}

impl MergedSourceSet {
    /// Existing roots that took part in the merge, in merge order.
    pub fn roots(&self) -> &[(Origin, Utf8PathBuf)] {
        &self.roots
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Absolute paths drawn from true secondary roots only.
    pub fn secondary_files(&self) -> BTreeSet<Utf8PathBuf> {
        self.files
            .iter()
            .filter(|file| file.is_secondary())
            .map(|file| file.path.clone())
            .collect()
    }

    pub fn contains(&self, path: impl AsRef<Utf8Path>) -> bool {
        self.files.iter().any(|file| file.path == path.as_ref())
    }

    /// True when no secondary-language source was found. Extra primary roots
    /// alone never make a set worth compiling.
    pub fn is_empty(&self) -> bool {
        !self.files.iter().any(SourceFile::is_secondary)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// Merges the source providers of a variant.
#[derive(Debug, Clone, Default)]
pub struct SourceProviderMerger {
    filter: SourceFilter,
}

impl SourceProviderMerger {
    pub fn new(filter: SourceFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &SourceFilter {
        &self.filter
    }

    /// Merges the secondary roots of `providers`, in order, with the extra
    /// primary roots. Roots that do not exist right now are skipped.
    pub fn merge(
        &self,
        providers: &[SourceProvider],
        extra_primary_roots: &[Utf8PathBuf],
    ) -> Result<MergedSourceSet, SourceError> {
        let mut plan = Vec::new();
        let mut seen_roots = HashSet::new();

        for provider in providers {
            let excludes = compile_excludes(&provider.excludes)?;
            for root in &provider.secondary_roots {
                if !root.is_dir() {
                    tracing::debug!(
                        "secondary root of {} does not exist: {}",
                        provider.name,
                        root
                    );
                    continue;
                }
                let root = absolute(root)?;
                if seen_roots.insert(root.clone()) {
                    plan.push((Origin::Provider(provider.name.clone()), root, excludes.clone()));
                }
            }
        }

        for root in extra_primary_roots {
            if !root.is_dir() {
                tracing::debug!("extra source root does not exist: {}", root);
                continue;
            }
            let root = absolute(root)?;
            if seen_roots.insert(root.clone()) {
                plan.push((Origin::Extra, root, Vec::new()));
            }
        }

        // Scanning runs in parallel, collecting keeps the plan order.
        let scanned = plan
            .par_iter()
            .map(|(_, root, excludes)| scan_root(root, &self.filter, excludes))
            .collect::<Result<Vec<_>, _>>()?;

        let mut merged = MergedSourceSet::default();
        let mut seen_files = HashSet::new();

        for ((origin, root, _), paths) in plan.into_iter().zip(scanned) {
            for path in paths {
                if seen_files.insert(path.clone()) {
                    merged.files.push(SourceFile {
                        path,
                        origin: origin.clone(),
                    });
                }
            }
            merged.roots.push((origin, root));
        }

        tracing::debug!(
            "merged {} source files from {} roots",
            merged.files.len(),
            merged.roots.len()
        );

        Ok(merged)
    }

    /// Adds every secondary-only file of `merged` to the exclusion list of the
    /// primary task, so no file is compiled by both tasks. Returns how many
    /// paths were newly excluded.
    pub fn exclude_from(&self, merged: &MergedSourceSet, primary: &mut PrimaryTask) -> usize {
        primary.exclude(merged.secondary_files())
    }
}

fn compile_excludes(patterns: &[String]) -> Result<Vec<Pattern>, SourceError> {
    Ok(patterns
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<Result<_, _>>()?)
}

/// Makes `root` absolute against the working directory without following
/// symlinks, so scanned paths keep the spelling the host uses for them.
fn absolute(root: &Utf8Path) -> Result<Utf8PathBuf, SourceError> {
    if root.is_absolute() {
        return Ok(normalize_path(root));
    }
    let cwd = std::env::current_dir().map_err(|error| SourceError::io(root, error))?;
    let cwd = Utf8PathBuf::try_from(cwd)?;
    Ok(normalize_path(&cwd.join(root)))
}

/// Lexically resolves `.` and `..` components.
fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut components = path.components().peekable();
    let mut ret = if let Some(c @ Utf8Component::Prefix(..)) = components.peek().cloned() {
        components.next();
        Utf8PathBuf::from(c.as_str())
    } else {
        Utf8PathBuf::new()
    };

    for component in components {
        match component {
            Utf8Component::Prefix(..) => {}
            Utf8Component::RootDir => ret.push(Utf8Component::RootDir),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if ret.ends_with(Utf8Component::ParentDir) || (!ret.pop() && !ret.has_root()) {
                    ret.push(Utf8Component::ParentDir);
                }
            }
            Utf8Component::Normal(c) => ret.push(c),
        }
    }

    ret
}

/// Lists the files under `root` accepted by `filter`, as absolute paths in
/// lexical order.
pub(crate) fn scan_root(
    root: &Utf8Path,
    filter: &SourceFilter,
    excludes: &[Pattern],
) -> Result<Vec<Utf8PathBuf>, SourceError> {
    let root = absolute(root)?;
    let pattern = format!("{}/**/*", Pattern::escape(root.as_str()));

    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        let path = Utf8PathBuf::try_from(entry?)?;
        if !path.is_file() {
            continue;
        }
        let Ok(relative) = path.strip_prefix(&root) else {
            continue;
        };
        if filter.matches(relative, excludes) {
            files.push(path);
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn touch(path: &Utf8Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().canonicalize().unwrap()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_filter_includes_both_languages() {
        let filter = SourceFilter::secondary();
        assert!(filter.matches(Utf8Path::new("a/B.scala"), &[]));
        assert!(filter.matches(Utf8Path::new("A.java"), &[]));
        assert!(!filter.matches(Utf8Path::new("a/notes.txt"), &[]));
        assert!(!filter.matches(Utf8Path::new("a/B.kt"), &[]));
    }

    #[test]
    fn test_filter_excludes_win() {
        let filter = SourceFilter::secondary();
        let excludes = vec![Pattern::new("legacy/**").unwrap()];
        assert!(!filter.matches(Utf8Path::new("legacy/Old.scala"), &excludes));
        assert!(filter.matches(Utf8Path::new("modern/New.scala"), &excludes));
    }

    #[test]
    fn test_missing_roots_are_skipped() {
        let (_dir, root) = temp_root();
        let provider = SourceProvider::new("main").with_secondary_root(root.join("absent"));

        let merged = SourceProviderMerger::default()
            .merge(&[provider], &[root.join("also-absent")])
            .unwrap();

        assert!(merged.is_empty());
        assert!(merged.roots().is_empty());
    }

    #[test]
    fn test_root_created_later_is_picked_up() {
        let (_dir, root) = temp_root();
        let scala = root.join("src/main/scala");
        let provider = SourceProvider::new("main").with_secondary_root(&scala);
        let merger = SourceProviderMerger::default();

        assert!(merger.merge(&[provider.clone()], &[]).unwrap().is_empty());

        touch(&scala.join("App.scala"));
        let merged = merger.merge(&[provider], &[]).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_same_relative_path_in_two_providers() {
        let (_dir, root) = temp_root();
        touch(&root.join("src/main/scala/pkg/A.scala"));
        touch(&root.join("src/debug/scala/pkg/A.scala"));

        let providers = [
            SourceProvider::new("main").with_secondary_root(root.join("src/main/scala")),
            SourceProvider::new("debug").with_secondary_root(root.join("src/debug/scala")),
        ];

        let merged = SourceProviderMerger::default().merge(&providers, &[]).unwrap();
        let files: Vec<_> = merged.files().iter().cloned().collect();

        assert_eq!(
            files,
            vec![
                SourceFile {
                    path: root.join("src/main/scala/pkg/A.scala"),
                    origin: Origin::Provider("main".into()),
                },
                SourceFile {
                    path: root.join("src/debug/scala/pkg/A.scala"),
                    origin: Origin::Provider("debug".into()),
                },
            ]
        );
    }

    #[test]
    fn test_extra_roots_are_not_secondary() {
        let (_dir, root) = temp_root();
        touch(&root.join("src/main/scala/A.scala"));
        touch(&root.join("build/generated/R.java"));

        let providers = [SourceProvider::new("main").with_secondary_root(root.join("src/main/scala"))];
        let merged = SourceProviderMerger::default()
            .merge(&providers, &[root.join("build/generated")])
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert!(merged.contains(root.join("build/generated/R.java")));
        assert_eq!(
            merged.secondary_files().into_iter().collect::<Vec<_>>(),
            vec![root.join("src/main/scala/A.scala")]
        );
    }

    #[test]
    fn test_only_generated_sources_is_empty() {
        let (_dir, root) = temp_root();
        touch(&root.join("build/generated/R.java"));

        let merged = SourceProviderMerger::default()
            .merge(&[], &[root.join("build/generated")])
            .unwrap();

        assert!(merged.is_empty());
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let (_dir, root) = temp_root();
        for name in ["b/B.scala", "a/A.scala", "c/C.java", "z.scala"] {
            touch(&root.join("src/main/scala").join(name));
        }
        touch(&root.join("src/debug/scala/D.scala"));

        let providers = [
            SourceProvider::new("main").with_secondary_root(root.join("src/main/scala")),
            SourceProvider::new("debug").with_secondary_root(root.join("src/debug/scala")),
        ];
        let merger = SourceProviderMerger::default();

        let first = merger.merge(&providers, &[]).unwrap();
        let second = merger.merge(&providers, &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_keeps_its_spelling() {
        let (_dir, root) = temp_root();
        touch(&root.join("real/src/main/scala/A.scala"));
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let provider = SourceProvider::new("main").with_secondary_root(root.join("link/src/main/scala"));
        let merged = SourceProviderMerger::default().merge(&[provider], &[]).unwrap();

        assert_eq!(
            merged.secondary_files().into_iter().collect::<Vec<_>>(),
            vec![root.join("link/src/main/scala/A.scala")]
        );
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Utf8Path::new("/a/./b/../c")), Utf8PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Utf8Path::new("/../a")), Utf8PathBuf::from("/a"));
        assert_eq!(normalize_path(Utf8Path::new("../a/../../b")), Utf8PathBuf::from("../../b"));
    }

    #[test]
    fn test_shared_root_is_merged_once() {
        let (_dir, root) = temp_root();
        touch(&root.join("shared/S.scala"));

        let providers = [
            SourceProvider::new("main").with_secondary_root(root.join("shared")),
            SourceProvider::new("debug").with_secondary_root(root.join("shared")),
        ];
        let merged = SourceProviderMerger::default().merge(&providers, &[]).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.roots().len(), 1);
    }

    #[test]
    fn test_provider_excludes_apply() {
        let (_dir, root) = temp_root();
        touch(&root.join("src/main/scala/keep/K.scala"));
        touch(&root.join("src/main/scala/skip/S.scala"));

        let providers = [SourceProvider::new("main")
            .with_secondary_root(root.join("src/main/scala"))
            .with_exclude("skip/**")];
        let merged = SourceProviderMerger::default().merge(&providers, &[]).unwrap();

        assert_eq!(merged.len(), 1);
        assert!(merged.contains(root.join("src/main/scala/keep/K.scala")));
    }
}
