use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// One source language known to the orchestrator.
///
/// The `marker` is the token embedded in compile task names (`compileDebugJava`),
/// `directory` is the conventional source directory name (`src/main/java`) and
/// also the namespace used for incremental metadata under the build temp root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub marker: String,
    pub directory: String,
}

impl Language {
    pub fn new(marker: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            directory: directory.into(),
        }
    }

    pub fn java() -> Self {
        Self::new("Java", "java")
    }

    pub fn scala() -> Self {
        Self::new("Scala", "scala")
    }
}

/// The dominant language compiled by the host, and the language this crate
/// adds tasks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Languages {
    pub primary: Language,
    pub secondary: Language,
}

impl Default for Languages {
    fn default() -> Self {
        Self {
            primary: Language::java(),
            secondary: Language::scala(),
        }
    }
}

/// JVM compatibility level, stored as the feature release number (`1.8` is 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JavaVersion(u16);

impl JavaVersion {
    pub const VERSION_1_8: JavaVersion = JavaVersion(8);
    pub const VERSION_11: JavaVersion = JavaVersion(11);
    pub const VERSION_17: JavaVersion = JavaVersion(17);

    pub const fn new(feature: u16) -> Self {
        Self(feature)
    }

    pub fn feature(self) -> u16 {
        self.0
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 <= 8 {
            write!(f, "1.{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid JVM version")]
pub struct JavaVersionError(pub String);

impl FromStr for JavaVersion {
    type Err = JavaVersionError;

    /// Accepts `1.8`, `8`, `11`, `jvm-1.8`, `jvm-17` and `17.0.2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix("jvm-").unwrap_or(trimmed);
        let bare = bare.strip_prefix("1.").unwrap_or(bare);
        let head = bare.split('.').next().unwrap_or_default();

        match head.parse::<u16>() {
            Ok(feature) if feature > 0 => Ok(Self(feature)),
            _ => Err(JavaVersionError(s.to_string())),
        }
    }
}

impl TryFrom<String> for JavaVersion {
    type Error = JavaVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JavaVersion> for String {
    fn from(value: JavaVersion) -> Self {
        value.to_string()
    }
}

/// Ordered, duplicate-free list of classpath entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Classpath(Vec<Utf8PathBuf>);

impl Classpath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry unless it is already present.
    pub fn push(&mut self, entry: impl Into<Utf8PathBuf>) -> &mut Self {
        let entry = entry.into();
        if !self.0.contains(&entry) {
            self.0.push(entry);
        }
        self
    }

    /// Entries of `self` followed by the entries of `other` not already present.
    pub fn union(&self, other: &Classpath) -> Classpath {
        let mut merged = self.clone();
        merged.extend(other.iter().cloned());
        merged
    }

    pub fn contains(&self, entry: impl AsRef<Utf8Path>) -> bool {
        self.0.iter().any(|e| e == entry.as_ref())
    }

    pub fn contains_all(&self, other: &Classpath) -> bool {
        other.iter().all(|entry| self.contains(entry))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Utf8PathBuf> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<Utf8PathBuf> for Classpath {
    fn extend<T: IntoIterator<Item = Utf8PathBuf>>(&mut self, iter: T) {
        for entry in iter {
            self.push(entry);
        }
    }
}

impl<P: Into<Utf8PathBuf>> FromIterator<P> for Classpath {
    fn from_iter<T: IntoIterator<Item = P>>(iter: T) -> Self {
        let mut classpath = Classpath::new();
        classpath.extend(iter.into_iter().map(Into::into));
        classpath
    }
}

impl<'a> IntoIterator for &'a Classpath {
    type Item = &'a Utf8PathBuf;
    type IntoIter = std::slice::Iter<'a, Utf8PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Classpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<_> = self.0.iter().map(|entry| entry.as_str()).collect();
        write!(f, "{}", joined.join(":"))
    }
}

/// A value with two phases.
///
/// The `initial` value is known while the graph is being configured. The
/// `finalized` value is set once, by an explicit resolver run by the executor
/// right before the owning task executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged<T> {
    initial: T,
    finalized: Option<T>,
}

impl<T> Staged<T> {
    pub fn new(initial: T) -> Self {
        Self {
            initial,
            finalized: None,
        }
    }

    pub fn initial(&self) -> &T {
        &self.initial
    }

    pub fn finalized(&self) -> Option<&T> {
        self.finalized.as_ref()
    }

    /// The finalized value if resolved, the initial value otherwise.
    pub fn current(&self) -> &T {
        self.finalized.as_ref().unwrap_or(&self.initial)
    }

    pub fn is_final(&self) -> bool {
        self.finalized.is_some()
    }

    pub fn finalize(&mut self, value: T) {
        self.finalized = Some(value);
    }
}

impl<T: Default> Default for Staged<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Build directory layout of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    build_dir: Utf8PathBuf,
}

impl BuildLayout {
    pub fn new(build_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }

    pub fn build_dir(&self) -> &Utf8Path {
        &self.build_dir
    }

    /// Build-scoped temporary directory root.
    pub fn tmp_dir(&self) -> Utf8PathBuf {
        self.build_dir.join("tmp")
    }
}
