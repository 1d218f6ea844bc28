//! Classpath assembly without running a build.
//!
//! Source roots come from conventional layouts per module; binary dependencies
//! come from the build tool (Maven) or from previously compiled output
//! (Gradle). Every failure here degrades to fewer entries instead of failing
//! the load.

use super::detect::BuildSystemDetector;
use super::jdk;
use crate::config::ServiceConfig;
use crate::process::{CommandSpec, run_with_timeout};
use indexmap::IndexSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratum_api::{BuildSystemKind, ClasspathEntry, RuntimeContainer, SourceRoot};
use tokio_util::sync::CancellationToken;

/// Conventional layouts, highest priority first. The first layout with at
/// least one existing directory supplies all of its existing directories.
pub const SOURCE_LAYOUTS: &[&[&str]] = &[
    &["src/main/java", "src/test/java"],
    &["src/java", "test/java"],
    &["java"],
];

/// Used only for modules that match no layout.
pub const FALLBACK_SOURCE_DIR: &str = "src";

pub const MAVEN_OUTPUT_DIRS: &[&str] = &["target/classes", "target/test-classes"];
pub const GRADLE_OUTPUT_DIRS: &[&str] = &[
    "build/classes/java/main",
    "build/classes/java/test",
    "build/resources/main",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathAssembly {
    pub kind: BuildSystemKind,
    /// CONTAINER, SOURCE, LIBRARY, compiled output; no duplicates.
    pub entries: Vec<ClasspathEntry>,
    pub source_roots: Vec<SourceRoot>,
    /// Dependency resolution failed; the classpath is smaller than the build's.
    pub degraded: bool,
}

impl ClasspathAssembly {
    pub fn library_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, ClasspathEntry::Library { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyResolution {
    pub libraries: Vec<PathBuf>,
    pub degraded: bool,
}

impl DependencyResolution {
    fn failed() -> Self {
        Self {
            libraries: Vec::new(),
            degraded: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClasspathAssembler {
    maven_command: String,
    timeout: Duration,
    container: Option<RuntimeContainer>,
    cancel: CancellationToken,
}

impl ClasspathAssembler {
    pub fn new(maven_command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            maven_command: maven_command.into(),
            timeout,
            container: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.maven_command.clone(), config.classpath_timeout)
    }

    /// Uses a fixed runtime container instead of discovering the local JDK.
    pub fn with_container(mut self, container: RuntimeContainer) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Root module (`""`) followed by every nested Maven module.
    pub fn modules(path: &Path) -> Vec<String> {
        let mut modules = vec![String::new()];
        if BuildSystemDetector::detect(path) == BuildSystemKind::Maven {
            modules.extend(BuildSystemDetector::module_tree(path));
        }
        modules
    }

    pub fn discover_source_roots(path: &Path) -> Vec<SourceRoot> {
        Self::modules(path)
            .iter()
            .flat_map(|module| module_source_roots(path, module))
            .collect()
    }

    pub async fn resolve_dependencies(
        &self,
        path: &Path,
        kind: BuildSystemKind,
    ) -> DependencyResolution {
        match kind {
            BuildSystemKind::Maven => self.resolve_maven(path).await,
            BuildSystemKind::Gradle => DependencyResolution {
                libraries: Self::modules(path)
                    .iter()
                    .flat_map(|m| existing_dirs(&module_dir(path, m), GRADLE_OUTPUT_DIRS))
                    .collect(),
                degraded: false,
            },
            BuildSystemKind::Unknown => DependencyResolution::default(),
        }
    }

    pub async fn assemble(&self, path: &Path) -> ClasspathAssembly {
        let kind = BuildSystemDetector::detect(path);
        let modules = Self::modules(path);
        let source_roots: Vec<SourceRoot> = modules
            .iter()
            .flat_map(|module| module_source_roots(path, module))
            .collect();
        let resolution = self.resolve_dependencies(path, kind).await;

        let container = self
            .container
            .clone()
            .unwrap_or_else(jdk::runtime_container);

        let mut entries: IndexSet<ClasspathEntry> = IndexSet::new();
        entries.insert(ClasspathEntry::Container(container));
        for root in &source_roots {
            entries.insert(ClasspathEntry::Source(root.clone()));
        }
        for lib in resolution.libraries.iter().filter(|p| p.exists()) {
            entries.insert(ClasspathEntry::library(lib.clone()));
        }
        let output_dirs: &[&str] = match kind {
            BuildSystemKind::Maven => MAVEN_OUTPUT_DIRS,
            BuildSystemKind::Gradle => GRADLE_OUTPUT_DIRS,
            BuildSystemKind::Unknown => &[],
        };
        for module in &modules {
            for dir in existing_dirs(&module_dir(path, module), output_dirs) {
                entries.insert(ClasspathEntry::library(dir));
            }
        }

        let assembly = ClasspathAssembly {
            kind,
            entries: entries.into_iter().collect(),
            source_roots,
            degraded: resolution.degraded,
        };
        tracing::info!(
            "Classpath for {} ({}): {} entries, {} source roots, {} libraries{}",
            path.display(),
            kind,
            assembly.entries.len(),
            assembly.source_roots.len(),
            assembly.library_count(),
            if assembly.degraded { ", degraded" } else { "" }
        );
        assembly
    }

    async fn resolve_maven(&self, path: &Path) -> DependencyResolution {
        let dump = match tempfile::Builder::new()
            .prefix("stratum-classpath-")
            .suffix(".txt")
            .tempfile()
        {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Cannot create classpath dump file: {}", e);
                return DependencyResolution::failed();
            }
        };

        let spec = CommandSpec::new(self.maven_executable(path))
            .arg("-q")
            .arg("-B")
            .arg("dependency:build-classpath")
            .arg(format!("-Dmdep.outputFile={}", dump.path().display()))
            .arg("-Dmdep.appendOutput=true")
            .arg("-Dmdep.includeScope=test")
            .current_dir(path);

        // `dump` is removed on drop, on every path out of this function
        let output = match run_with_timeout(&spec, self.timeout, &self.cancel).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Maven dependency resolution failed: {}", e);
                return DependencyResolution::failed();
            }
        };

        if !output.success() {
            tracing::warn!(
                "Maven exited with {:?}; dependencies unresolved. {}",
                output.code,
                output.stderr.lines().chain(output.stdout.lines()).last().unwrap_or("")
            );
            return DependencyResolution::failed();
        }

        match std::fs::read_to_string(dump.path()) {
            Ok(content) => DependencyResolution {
                libraries: parse_classpath_dump(&content),
                degraded: false,
            },
            Err(e) => {
                tracing::warn!("Cannot read classpath dump: {}", e);
                DependencyResolution::failed()
            }
        }
    }

    fn maven_executable(&self, path: &Path) -> String {
        let wrapper = path.join(if cfg!(windows) { "mvnw.cmd" } else { "mvnw" });
        if wrapper.is_file() {
            wrapper.to_string_lossy().to_string()
        } else {
            self.maven_command.clone()
        }
    }
}

/// Splits a classpath dump on lines and the platform path separator, keeping
/// first occurrences in order.
pub fn parse_classpath_dump(content: &str) -> Vec<PathBuf> {
    let mut seen = IndexSet::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        for path in std::env::split_paths(line) {
            if !path.as_os_str().is_empty() {
                seen.insert(path);
            }
        }
    }
    seen.into_iter().collect()
}

fn module_dir(root: &Path, module: &str) -> PathBuf {
    if module.is_empty() {
        root.to_path_buf()
    } else {
        root.join(module)
    }
}

fn module_source_roots(root: &Path, module: &str) -> Vec<SourceRoot> {
    let dir = module_dir(root, module);
    let make_root = |rel: &str| {
        let path = dir.join(rel);
        SourceRoot {
            relative: path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
            path,
            module: module.to_string(),
        }
    };

    for layout in SOURCE_LAYOUTS {
        let found: Vec<SourceRoot> = layout
            .iter()
            .filter(|rel| dir.join(rel).is_dir())
            .map(|rel| make_root(rel))
            .collect();
        if !found.is_empty() {
            return found;
        }
    }

    if dir.join(FALLBACK_SOURCE_DIR).is_dir() {
        vec![make_root(FALLBACK_SOURCE_DIR)]
    } else {
        Vec::new()
    }
}

fn existing_dirs(dir: &Path, candidates: &[&str]) -> Vec<PathBuf> {
    candidates
        .iter()
        .map(|rel| dir.join(rel))
        .filter(|p| p.is_dir())
        .collect()
}
