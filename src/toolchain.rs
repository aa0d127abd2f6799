//! Detection of secondary-toolchain jars on a classpath.
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::core::Classpath;

/// `scala-<appendix>-<version>.jar`, e.g. `scala-library-2.13.12.jar`.
static TOOLCHAIN_JAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*?scala-(\w.*?)-(\d.*)\.jar$").expect("toolchain jar pattern is valid")
});

/// Version embedded in a toolchain jar's file name.
pub fn jar_version(jar: &Utf8Path) -> Option<&str> {
    let name = jar.file_name()?;
    TOOLCHAIN_JAR
        .captures(name)
        .and_then(|captures| captures.get(2))
        .map(|m| m.as_str())
}

/// First entry of `classpath` that is the toolchain jar with `appendix`
/// (`library`, `reflect`, `compiler`).
pub fn find_jar<'a>(classpath: &'a Classpath, appendix: &str) -> Option<&'a Utf8PathBuf> {
    classpath.iter().find(|entry| {
        entry
            .file_name()
            .and_then(|name| TOOLCHAIN_JAR.captures(name))
            .and_then(|captures| captures.get(1))
            .is_some_and(|m| m.as_str() == appendix)
    })
}

/// Toolchain version inferred from the runtime library on `classpath`.
pub fn detect_version(classpath: &Classpath) -> Option<String> {
    find_jar(classpath, "library")
        .and_then(|jar| jar_version(jar))
        .map(str::to_string)
}
