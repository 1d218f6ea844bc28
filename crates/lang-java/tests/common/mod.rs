use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stratum_api::{
    ClasspathEntry, EngineMatch, EngineProject, PatternTarget, ProjectDescriptor, SearchCategory,
    SearchScope, SemanticEngine, SourceRoot,
};
use stratum_java::JavaEngine;
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
    #[allow(dead_code)]
    pub engine: JavaEngine,
    pub project: Arc<dyn EngineProject>,
}

impl Fixture {
    #[allow(dead_code)]
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join("src").join(relative)
    }
}

/// Writes `files` under `<tmp>/src` and registers one project over that root.
pub fn setup_java_project(files: &[(&str, &str)]) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = dir.path().join("src");
    for (relative, content) in files {
        write(&src, relative, content);
    }
    let engine = JavaEngine::new(dir.path());
    let project = engine
        .create_project(ProjectDescriptor {
            name: "fixture".into(),
            location: dir.path().join("fixture"),
            output_location: dir.path().join("fixture/bin"),
            classpath: vec![ClasspathEntry::Source(SourceRoot {
                path: src,
                relative: PathBuf::from("src"),
                module: String::new(),
            })],
        })
        .expect("create project");
    Fixture {
        dir,
        engine,
        project,
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dirs");
    }
    fs::write(path, content).expect("write source");
}

#[allow(dead_code)]
pub fn search(
    project: &dyn EngineProject,
    target: PatternTarget,
    category: SearchCategory,
) -> Vec<EngineMatch> {
    search_in(project, target, category, &SearchScope::Project)
}

#[allow(dead_code)]
pub fn search_in(
    project: &dyn EngineProject,
    target: PatternTarget,
    category: SearchCategory,
    scope: &SearchScope,
) -> Vec<EngineMatch> {
    let pattern = project
        .create_pattern(target, category)
        .expect("pattern accepted");
    let mut out = Vec::new();
    project
        .search(&pattern, scope, &mut |m| {
            out.push(m);
            true
        })
        .expect("search");
    out
}

#[allow(dead_code)]
pub fn element(project: &dyn EngineProject, id: &str) -> PatternTarget {
    PatternTarget::Element(project.find_element(id).expect("element exists"))
}
