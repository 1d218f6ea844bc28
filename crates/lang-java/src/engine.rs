use crate::error::JavaError;
use crate::project::JavaProject;
use crate::syntax::JavaSyntax;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stratum_api::{ApiResult, EngineProject, ProjectDescriptor, SemanticEngine};

/// In-process Java engine. Projects are registered by name and must live
/// under the workspace location handed to [`JavaEngine::new`].
pub struct JavaEngine {
    workspace: PathBuf,
    syntax: JavaSyntax,
    projects: DashMap<String, Arc<JavaProject>>,
}

impl JavaEngine {
    pub fn new(workspace_location: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace_location.into(),
            syntax: JavaSyntax::new(),
            projects: DashMap::new(),
        }
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    fn check(&self, descriptor: &ProjectDescriptor) -> Result<(), JavaError> {
        let name = descriptor.name.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(JavaError::InvalidName(descriptor.name.clone()));
        }
        if !descriptor.location.starts_with(&self.workspace) {
            return Err(JavaError::OutsideWorkspace {
                location: descriptor.location.clone(),
                workspace: self.workspace.clone(),
            });
        }
        Ok(())
    }
}

impl SemanticEngine for JavaEngine {
    fn name(&self) -> &str {
        "java"
    }

    fn workspace_location(&self) -> &Path {
        &self.workspace
    }

    fn create_project(&self, descriptor: ProjectDescriptor) -> ApiResult<Arc<dyn EngineProject>> {
        self.check(&descriptor)?;
        match self.projects.entry(descriptor.name.clone()) {
            Entry::Occupied(_) => Err(JavaError::DuplicateProject(descriptor.name).into()),
            Entry::Vacant(slot) => {
                tracing::info!(
                    "Registering project '{}' at {} ({} classpath entries)",
                    descriptor.name,
                    descriptor.location.display(),
                    descriptor.classpath.len()
                );
                let project = Arc::new(JavaProject::new(descriptor, self.syntax.clone()));
                slot.insert(project.clone());
                Ok(project)
            }
        }
    }

    fn delete_project(&self, name: &str) -> ApiResult<bool> {
        let removed = self.projects.remove(name).is_some();
        if removed {
            tracing::info!("Deleted project '{}'", name);
        }
        Ok(removed)
    }

    fn project(&self, name: &str) -> Option<Arc<dyn EngineProject>> {
        self.projects
            .get(name)
            .map(|p| p.value().clone() as Arc<dyn EngineProject>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_api::ApiError;

    fn descriptor(name: &str, location: &str) -> ProjectDescriptor {
        ProjectDescriptor {
            name: name.into(),
            location: PathBuf::from(location),
            output_location: PathBuf::from(location).join("bin"),
            classpath: vec![],
        }
    }

    #[test]
    fn test_create_and_delete_project() {
        let engine = JavaEngine::new("/ws");
        let project = engine.create_project(descriptor("demo", "/ws/demo")).unwrap();
        assert_eq!(project.name(), "demo");
        assert!(engine.project("demo").is_some());

        assert!(engine.delete_project("demo").unwrap());
        assert!(!engine.delete_project("demo").unwrap());
        assert!(engine.project("demo").is_none());
    }

    #[test]
    fn test_rejects_duplicates_and_foreign_locations() {
        let engine = JavaEngine::new("/ws");
        engine.create_project(descriptor("demo", "/ws/demo")).unwrap();

        let dup = engine.create_project(descriptor("demo", "/ws/other")).err();
        assert!(matches!(dup, Some(ApiError::InvalidInput(_))));

        let outside = engine.create_project(descriptor("x", "/elsewhere/x")).err();
        assert!(matches!(outside, Some(ApiError::InvalidInput(_))));

        let bad = engine.create_project(descriptor("a/b", "/ws/a")).err();
        assert!(matches!(bad, Some(ApiError::InvalidInput(_))));
        assert_eq!(engine.project_count(), 1);
    }
}
