use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use stratum_api::BuildSystemKind;

pub const MAVEN_MARKER: &str = "pom.xml";
pub const GRADLE_MARKERS: [&str; 2] = ["build.gradle", "build.gradle.kts"];

/// Nested module expansion stops here.
const MAX_MODULE_DEPTH: usize = 8;

static MODULES_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<modules\s*>").expect("static regex")
});

static POM_PACKAGING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<packaging>\s*pom\s*</packaging>").expect("static regex")
});

static MODULE_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<module>\s*([^<]+?)\s*</module>").expect("static regex")
});

/// Classifies a source tree from its marker files. Never fails: unreadable or
/// malformed descriptors read as "no modules" and missing markers as `Unknown`.
pub struct BuildSystemDetector;

impl BuildSystemDetector {
    pub fn detect(path: &Path) -> BuildSystemKind {
        if path.join(MAVEN_MARKER).is_file() {
            BuildSystemKind::Maven
        } else if GRADLE_MARKERS.iter().any(|m| path.join(m).is_file()) {
            BuildSystemKind::Gradle
        } else {
            BuildSystemKind::Unknown
        }
    }

    /// Maven aggregators only. A line scan, not a descriptor parse.
    pub fn is_multi_module(path: &Path) -> bool {
        if Self::detect(path) != BuildSystemKind::Maven {
            return false;
        }
        let Some(pom) = read_pom(path) else {
            return false;
        };
        MODULES_ELEMENT.is_match(&pom) || POM_PACKAGING.is_match(&pom)
    }

    /// Declared module directory names that exist on disk, in declaration order.
    pub fn list_modules(path: &Path) -> Vec<String> {
        let Some(pom) = read_pom(path) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        MODULE_ENTRY
            .captures_iter(&pom)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().trim().to_string()))
            .filter(|name| !name.is_empty() && path.join(name).is_dir())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Every module below `path`, depth first, as `/`-joined paths relative to `path`.
    pub fn module_tree(path: &Path) -> Vec<String> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(canonical(path));
        collect_modules(path, "", 0, &mut visited, &mut out);
        out
    }
}

fn collect_modules(
    dir: &Path,
    prefix: &str,
    depth: usize,
    visited: &mut HashSet<PathBuf>,
    out: &mut Vec<String>,
) {
    if depth >= MAX_MODULE_DEPTH || !BuildSystemDetector::is_multi_module(dir) {
        return;
    }
    for name in BuildSystemDetector::list_modules(dir) {
        let child = dir.join(&name);
        if !visited.insert(canonical(&child)) {
            continue;
        }
        let logical = if prefix.is_empty() {
            name.trim_end_matches('/').to_string()
        } else {
            format!("{}/{}", prefix, name.trim_end_matches('/'))
        };
        out.push(logical.clone());
        collect_modules(&child, &logical, depth + 1, visited, out);
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn read_pom(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path.join(MAVEN_MARKER)) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::debug!("Cannot read {} in {}: {}", MAVEN_MARKER, path.display(), e);
            None
        }
    }
}
