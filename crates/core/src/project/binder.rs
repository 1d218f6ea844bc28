//! Projects a source tree into the session workspace and registers it with
//! the semantic engine.
//!
//! Layout of one bound project:
//!
//! ```text
//! <session>/projects/<name>/
//!   links/<link>   -> one per source root (symlink, or a copy when linking fails)
//!   bin/           compiled output location handed to the engine
//! ```

use super::classpath::ClasspathAssembly;
use crate::error::{Result, StratumError};
use crate::path::LinkedRoot;
use crate::session::{SessionWorkspace, remove_tree};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stratum_api::{ClasspathEntry, EngineProject, ProjectDescriptor, SemanticEngine, SourceRoot};
use walkdir::WalkDir;

pub const LINKS_DIR: &str = "links";
pub const OUTPUT_DIR: &str = "bin";
pub const DEFAULT_PROJECT_NAME: &str = "project";
const ROOT_LINK_NAME: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// Symlink each root, copying only when the platform refuses the link.
    #[default]
    Symlink,
    /// Always copy.
    Copy,
}

/// A project live in the engine, plus the table needed to map its paths back.
pub struct BoundProject {
    pub name: String,
    pub location: PathBuf,
    pub output: PathBuf,
    pub project: Arc<dyn EngineProject>,
    pub roots: Vec<LinkedRoot>,
    /// Classpath as registered, with linked locations for source roots.
    pub classpath: Vec<ClasspathEntry>,
}

impl std::fmt::Debug for BoundProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundProject")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

pub struct ProjectBinder {
    session: Arc<SessionWorkspace>,
    engine: Arc<dyn SemanticEngine>,
    mode: LinkMode,
}

impl ProjectBinder {
    pub fn new(session: Arc<SessionWorkspace>, engine: Arc<dyn SemanticEngine>) -> Self {
        Self {
            session,
            engine,
            mode: LinkMode::default(),
        }
    }

    pub fn with_link_mode(mut self, mode: LinkMode) -> Self {
        self.mode = mode;
        self
    }

    /// Logical project name: the tree's directory name with link-name rules applied.
    pub fn project_name(tree_root: &Path) -> String {
        let raw = tree_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = sanitize(&raw);
        if name.is_empty() {
            DEFAULT_PROJECT_NAME.to_string()
        } else {
            name
        }
    }

    /// `src/main/java` becomes `src_main_java`; the tree root itself becomes `root`.
    pub fn link_name(relative: &Path) -> String {
        let name = sanitize(&crate::path::to_slash(relative));
        if name.is_empty() {
            ROOT_LINK_NAME.to_string()
        } else {
            name
        }
    }

    pub fn bind(&self, tree_root: &Path, assembly: &ClasspathAssembly) -> Result<BoundProject> {
        if self.session.is_torn_down() {
            return Err(StratumError::Session(format!(
                "session workspace {} already torn down",
                self.session.path().display()
            )));
        }
        let name = Self::project_name(tree_root);
        let location = self.session.project_dir(&name);
        self.unbind(&name)?;

        let links_dir = location.join(LINKS_DIR);
        let output = location.join(OUTPUT_DIR);
        fs::create_dir_all(&links_dir)?;
        fs::create_dir_all(&output)?;

        let mut taken = HashSet::new();
        let mut roots = Vec::with_capacity(assembly.source_roots.len());
        let mut classpath = Vec::with_capacity(assembly.entries.len());

        for entry in &assembly.entries {
            let ClasspathEntry::Source(source) = entry else {
                classpath.push(entry.clone());
                continue;
            };
            let link_name = unique_name(Self::link_name(&source.relative), &mut taken);
            let link = links_dir.join(&link_name);
            self.materialize(&source.path, &link)?;
            roots.push(LinkedRoot {
                name: link_name,
                link: link.clone(),
                external: source.path.clone(),
            });
            classpath.push(ClasspathEntry::Source(SourceRoot {
                path: link,
                relative: source.relative.clone(),
                module: source.module.clone(),
            }));
        }

        let project = self.engine.create_project(ProjectDescriptor {
            name: name.clone(),
            location: location.clone(),
            output_location: output.clone(),
            classpath: classpath.clone(),
        })?;

        tracing::info!(
            "Bound {} as '{}' with {} linked roots in {}",
            tree_root.display(),
            name,
            roots.len(),
            location.display()
        );

        Ok(BoundProject {
            name,
            location,
            output,
            project,
            roots,
            classpath,
        })
    }

    /// Removes a project from the engine and deletes its directory. Link
    /// targets are never touched.
    pub fn unbind(&self, name: &str) -> Result<()> {
        if self.engine.delete_project(name)? {
            tracing::debug!("Deleted existing engine project '{}'", name);
        }
        let location = self.session.project_dir(name);
        if fs::symlink_metadata(&location).is_ok() {
            remove_tree(&location);
        }
        Ok(())
    }

    fn materialize(&self, external: &Path, link: &Path) -> Result<()> {
        if self.mode == LinkMode::Symlink {
            match symlink_dir(external, link) {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!(
                    "Cannot link {} ({}), copying instead",
                    external.display(),
                    e
                ),
            }
        }
        copy_tree(external, link)
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn unique_name(base: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink_dir(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}

/// Copies regular files and directories; links inside the root are skipped.
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| {
            StratumError::Internal(format!("cannot copy {}: {}", from.display(), e))
        })?;
        let rel = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_api::{BuildSystemKind, RuntimeContainer};
    use stratum_java::JavaEngine;

    struct Fixture {
        _base: tempfile::TempDir,
        tree: tempfile::TempDir,
        session: Arc<SessionWorkspace>,
        engine: Arc<JavaEngine>,
    }

    fn fixture() -> Fixture {
        let base = tempfile::tempdir().unwrap();
        let tree = tempfile::tempdir().unwrap();
        let main = tree.path().join("src/main/java/com/acme");
        fs::create_dir_all(&main).unwrap();
        fs::write(
            main.join("Calculator.java"),
            "package com.acme;\npublic class Calculator { int add(int a, int b) { return a + b; } }\n",
        )
        .unwrap();
        let session = Arc::new(SessionWorkspace::create(base.path()).unwrap());
        let engine = Arc::new(JavaEngine::new(session.path()));
        Fixture {
            _base: base,
            tree,
            session,
            engine,
        }
    }

    fn assembly(tree: &Path, relatives: &[&str]) -> ClasspathAssembly {
        let source_roots: Vec<SourceRoot> = relatives
            .iter()
            .map(|rel| SourceRoot {
                path: tree.join(rel),
                relative: PathBuf::from(rel),
                module: String::new(),
            })
            .collect();
        let mut entries = vec![ClasspathEntry::Container(RuntimeContainer::unresolved())];
        entries.extend(source_roots.iter().cloned().map(ClasspathEntry::Source));
        ClasspathAssembly {
            kind: BuildSystemKind::Maven,
            entries,
            source_roots,
            degraded: false,
        }
    }

    #[test]
    fn test_link_name_normalization() {
        assert_eq!(ProjectBinder::link_name(Path::new("src/main/java")), "src_main_java");
        assert_eq!(ProjectBinder::link_name(Path::new("web-app/src")), "web_app_src");
        assert_eq!(ProjectBinder::link_name(Path::new("")), "root");
    }

    #[test]
    fn test_collisions_get_numeric_suffix() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name("src".into(), &mut taken), "src");
        assert_eq!(unique_name("src".into(), &mut taken), "src_2");
        assert_eq!(unique_name("src".into(), &mut taken), "src_3");
    }

    #[test]
    fn test_project_name_falls_back() {
        assert_eq!(ProjectBinder::project_name(Path::new("/work/my-app")), "my_app");
        assert_eq!(ProjectBinder::project_name(Path::new("/")), "project");
    }

    #[test]
    fn given_source_roots_when_bind_then_links_point_at_tree() {
        let fx = fixture();
        let binder = ProjectBinder::new(fx.session.clone(), fx.engine.clone());
        let bound = binder
            .bind(fx.tree.path(), &assembly(fx.tree.path(), &["src/main/java"]))
            .unwrap();

        assert!(bound.location.starts_with(fx.session.path()));
        assert_eq!(bound.roots.len(), 1);
        assert_eq!(bound.roots[0].name, "src_main_java");
        assert!(bound.roots[0].link.join("com/acme/Calculator.java").is_file());
        assert!(bound.output.is_dir());
        assert_eq!(bound.project.compilation_units().len(), 1);
        assert!(bound.classpath.iter().any(|e| matches!(
            e,
            ClasspathEntry::Source(root) if root.path == bound.roots[0].link
        )));
    }

    #[test]
    fn given_colliding_relatives_when_bind_then_names_are_unique() {
        let fx = fixture();
        fs::create_dir_all(fx.tree.path().join("src-main/java")).unwrap();
        let binder = ProjectBinder::new(fx.session.clone(), fx.engine.clone());
        let bound = binder
            .bind(
                fx.tree.path(),
                &assembly(fx.tree.path(), &["src/main/java", "src-main/java"]),
            )
            .unwrap();
        let names: Vec<_> = bound.roots.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["src_main_java", "src_main_java_2"]);
    }

    #[test]
    fn given_bound_project_when_rebind_then_recreated() {
        let fx = fixture();
        let binder = ProjectBinder::new(fx.session.clone(), fx.engine.clone());
        let asm = assembly(fx.tree.path(), &["src/main/java"]);
        let first = binder.bind(fx.tree.path(), &asm).unwrap();
        fs::write(first.location.join("stale.txt"), "x").unwrap();

        let second = binder.bind(fx.tree.path(), &asm).unwrap();
        assert_eq!(first.name, second.name);
        assert!(!second.location.join("stale.txt").exists());
        assert!(fx.engine.project(&second.name).is_some());
        // the source tree survives the rebind
        assert!(fx.tree.path().join("src/main/java/com/acme/Calculator.java").is_file());
    }

    #[test]
    fn given_copy_mode_when_bind_then_files_are_copied() {
        let fx = fixture();
        let binder = ProjectBinder::new(fx.session.clone(), fx.engine.clone())
            .with_link_mode(LinkMode::Copy);
        let bound = binder
            .bind(fx.tree.path(), &assembly(fx.tree.path(), &["src/main/java"]))
            .unwrap();
        let link = &bound.roots[0].link;
        assert!(!fs::symlink_metadata(link).unwrap().file_type().is_symlink());
        assert!(link.join("com/acme/Calculator.java").is_file());
    }

    #[test]
    fn given_bound_project_when_unbind_then_tree_untouched() {
        let fx = fixture();
        let binder = ProjectBinder::new(fx.session.clone(), fx.engine.clone());
        let bound = binder
            .bind(fx.tree.path(), &assembly(fx.tree.path(), &["src/main/java"]))
            .unwrap();
        binder.unbind(&bound.name).unwrap();

        assert!(!bound.location.exists());
        assert!(fx.engine.project(&bound.name).is_none());
        assert!(fx.tree.path().join("src/main/java/com/acme/Calculator.java").is_file());
    }

    #[test]
    fn given_torn_down_session_when_bind_then_fails_without_recreating_it() {
        let fx = fixture();
        let binder = ProjectBinder::new(fx.session.clone(), fx.engine.clone());
        fx.session.teardown();

        let err = binder
            .bind(fx.tree.path(), &assembly(fx.tree.path(), &["src/main/java"]))
            .err();
        assert!(matches!(err, Some(StratumError::Session(_))));
        assert!(!fx.session.path().exists());
        assert_eq!(fx.engine.project_count(), 0);
    }
}
