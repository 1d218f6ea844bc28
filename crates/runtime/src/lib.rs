use std::sync::Arc;
use stratum_api::SemanticEngine;
use stratum_core::{ProjectService, ServiceConfig, SessionWorkspace};
use stratum_java::JavaEngine;

/// Bootstraps the service the way a server process should: the session
/// workspace is created first, then the engine is pointed at it, then the
/// service is assembled on top.
pub fn build_default_service(config: ServiceConfig) -> stratum_core::Result<Arc<ProjectService>> {
    let session = SessionWorkspace::process(&config.workspace_base)?;
    Ok(build_service(config, session))
}

/// Assembles a service over an existing session workspace.
pub fn build_service(config: ServiceConfig, session: Arc<SessionWorkspace>) -> Arc<ProjectService> {
    let engine: Arc<dyn SemanticEngine> = Arc::new(JavaEngine::new(session.path()));
    tracing::info!(
        "Engine '{}' bound to session {} at {}",
        engine.name(),
        session.token(),
        session.path().display()
    );
    Arc::new(ProjectService::new(config, session, engine))
}

/// Initializes logging for a component. Keep the returned guard alive.
pub fn init_logging(component: &str, to_stderr: bool) -> impl Drop {
    stratum_core::logging::init_logging(component, to_stderr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_service_lives_in_its_session() {
        let base = tempfile::tempdir().unwrap();
        let config = ServiceConfig::default().with_workspace_base(base.path());
        let session = Arc::new(SessionWorkspace::create(base.path()).unwrap());
        let service = build_service(config, session.clone());

        let tree = tempfile::tempdir().unwrap();
        fs::create_dir_all(tree.path().join("src/main/java/p")).unwrap();
        fs::write(tree.path().join("src/main/java/p/A.java"), "package p; class A {}").unwrap();

        let summary = service.load(tree.path()).await.unwrap();
        assert_eq!(summary.source_file_count, 1);

        let status = service.status().unwrap();
        assert_eq!(status.session_token, session.token());
        assert!(status.workspace.starts_with(base.path()));

        service.shutdown().await;
        assert!(!session.path().exists());
        assert!(tree.path().join("src/main/java/p/A.java").exists());
    }
}
