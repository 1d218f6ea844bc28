//! The load → query lifecycle behind one async, `Arc`-shared service.
//!
//! `load` detects, assembles, binds and swaps in a new project; every query
//! runs on a worker thread under the configured timeout, one at a time.

mod timeout;

pub use timeout::{execute_async_with_timeout, execute_with_timeout};

use crate::config::ServiceConfig;
use crate::path::{PathResolver, normalize};
use crate::project::{BoundProject, BuildSystemDetector, ClasspathAssembler, ProjectBinder};
use crate::query::{SymbolIndexQuery, position};
use crate::session::SessionWorkspace;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use stratum_api::{
    AccessMode, ApiError, ApiResult, BuildSystemKind, CompilationUnitHandle, ElementFilter, ElementHandle,
    ProjectStatus, ProjectSummary, QueryShape, SearchMatch, SemanticEngine, TypeHierarchy,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Everything produced by one successful load.
pub struct LoadedProject {
    pub root: PathBuf,
    pub build_system: BuildSystemKind,
    pub bound: BoundProject,
    pub paths: PathResolver,
    pub summary: ProjectSummary,
    pub loaded_at_ms: u64,
    pub degraded: bool,
}

impl LoadedProject {
    pub fn query(&self) -> SymbolIndexQuery<'_> {
        SymbolIndexQuery::new(self.bound.project.as_ref(), &self.paths)
    }

    fn element(&self, id: &str) -> ApiResult<ElementHandle> {
        self.query()
            .element(id)
            .ok_or_else(|| ApiError::NotFound(format!("element '{}'", id)))
    }

    fn type_element(&self, id: &str) -> ApiResult<ElementHandle> {
        let handle = self.element(id)?;
        if !handle.kind.is_type() {
            return Err(ApiError::InvalidInput(format!("'{}' is not a type", id)));
        }
        Ok(handle)
    }

    /// Unit and text of a caller path.
    fn unit_text(&self, path: &Path) -> ApiResult<(CompilationUnitHandle, Arc<str>)> {
        let not_found = || ApiError::NotFound(format!("compilation unit '{}'", path.display()));
        let unit = self.query().unit_for(path).ok_or_else(not_found)?;
        let text = self.bound.project.source(&unit).ok_or_else(not_found)?;
        Ok((unit, text))
    }
}

pub struct ProjectService {
    config: ServiceConfig,
    session: Arc<SessionWorkspace>,
    binder: Arc<ProjectBinder>,
    current: RwLock<Option<Arc<LoadedProject>>>,
    gate: Arc<Mutex<()>>,
    /// Serializes load and shutdown; held across detect, assemble, bind and swap.
    load_lock: Mutex<()>,
    /// Cancelled at shutdown; aborts a dependency resolution still running.
    cancel: CancellationToken,
}

fn non_blank<'s>(value: &'s str, what: &str) -> ApiResult<&'s str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{} must not be blank", what)));
    }
    Ok(trimmed)
}

fn positive(max: usize) -> ApiResult<usize> {
    if max == 0 {
        return Err(ApiError::InvalidInput("max_results must be positive".into()));
    }
    Ok(max)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl ProjectService {
    pub fn new(
        config: ServiceConfig,
        session: Arc<SessionWorkspace>,
        engine: Arc<dyn SemanticEngine>,
    ) -> Self {
        let binder = Arc::new(ProjectBinder::new(session.clone(), engine));
        Self {
            config,
            session,
            binder,
            current: RwLock::new(None),
            gate: Arc::new(Mutex::new(())),
            load_lock: Mutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionWorkspace {
        &self.session
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    fn snapshot(&self) -> Option<Arc<LoadedProject>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn loaded(&self) -> ApiResult<Arc<LoadedProject>> {
        self.snapshot().ok_or(ApiError::NotLoaded)
    }

    /// Binds the tree at `path`, replacing whatever was loaded before.
    pub async fn load(&self, path: impl AsRef<Path>) -> ApiResult<ProjectSummary> {
        let requested = path.as_ref();
        if !requested.exists() {
            return Err(ApiError::NotFound(format!(
                "project directory '{}'",
                requested.display()
            )));
        }
        if !requested.is_dir() {
            return Err(ApiError::NotFound(format!(
                "'{}' is not a directory",
                requested.display()
            )));
        }

        let _loading = self.load_lock.lock().await;
        if self.session.is_torn_down() {
            return Err(ApiError::Internal("session workspace already torn down".into()));
        }
        let root = normalize(requested);
        let build_system = BuildSystemDetector::detect(&root);
        tracing::info!("Loading {} ({})", root.display(), build_system);

        let assembly = ClasspathAssembler::from_config(&self.config)
            .with_cancellation(self.cancel.child_token())
            .assemble(&root)
            .await;
        let degraded = assembly.degraded;

        let binder = self.binder.clone();
        let bind_root = root.clone();
        let (bound, summary) = tokio::task::spawn_blocking(move || -> ApiResult<_> {
            let bound = binder.bind(&bind_root, &assembly)?;
            let summary = ProjectSummary {
                build_system: assembly.kind,
                source_file_count: bound.project.compilation_units().len(),
                packages: bound.project.packages(),
                classpath_entry_count: bound.classpath.len(),
            };
            Ok((bound, summary))
        })
        .await
        .map_err(|e| ApiError::Internal(format!("bind task failed: {}", e)))??;

        let paths = PathResolver::new(root.clone(), bound.roots.clone(), self.config.absolute_paths);
        let loaded = Arc::new(LoadedProject {
            root,
            build_system,
            bound,
            paths,
            summary: summary.clone(),
            loaded_at_ms: now_ms(),
            degraded,
        });

        let previous = {
            let _gate = self.gate.lock().await;
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            current.replace(loaded.clone())
        };
        if let Some(previous) = previous.filter(|p| p.bound.name != loaded.bound.name) {
            if let Err(e) = self.binder.unbind(&previous.bound.name) {
                tracing::warn!("Failed to unbind '{}': {}", previous.bound.name, e);
            }
        }

        tracing::info!(
            "Loaded '{}': {} source files, {} packages, {} classpath entries{}",
            loaded.bound.name,
            summary.source_file_count,
            summary.packages.len(),
            summary.classpath_entry_count,
            if degraded { " (classpath degraded)" } else { "" }
        );
        Ok(summary)
    }

    pub fn status(&self) -> ApiResult<ProjectStatus> {
        let loaded = self.loaded()?;
        Ok(ProjectStatus {
            root: loaded.root.clone(),
            project_name: loaded.bound.name.clone(),
            build_system: loaded.build_system,
            source_file_count: loaded.summary.source_file_count,
            packages: loaded.summary.packages.clone(),
            classpath_entry_count: loaded.summary.classpath_entry_count,
            loaded_at_ms: loaded.loaded_at_ms,
            classpath_degraded: loaded.degraded,
            session_token: self.session.token().to_string(),
            workspace: self.session.path().to_path_buf(),
        })
    }

    /// Drops the bound project and removes the session workspace. Waits for a
    /// load in flight; later loads fail. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let _loading = self.load_lock.lock().await;
        let previous = {
            let _gate = self.gate.lock().await;
            self.current
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
        };
        if let Some(previous) = previous {
            if let Err(e) = self.binder.unbind(&previous.bound.name) {
                tracing::debug!("Unbind on shutdown failed: {}", e);
            }
        }
        self.session.teardown();
    }

    pub async fn execute_with_timeout<T, F>(&self, operation: &str, op: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> ApiResult<T> + Send + 'static,
    {
        execute_with_timeout(operation, self.config.timeout, op).await
    }

    pub async fn execute_async_with_timeout<T, Fut>(&self, operation: &str, future: Fut) -> ApiResult<T>
    where
        T: Send + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        execute_async_with_timeout(operation, self.config.timeout, future).await
    }

    /// Runs a query against the current project behind the query gate.
    async fn run<T, F>(&self, operation: &str, op: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&LoadedProject) -> ApiResult<T> + Send + 'static,
    {
        let loaded = self.loaded()?;
        let gate = self.gate.clone();
        self.execute_with_timeout(operation, move |token| {
            let _held = gate.blocking_lock();
            if token.is_cancelled() {
                return Err(ApiError::Internal("cancelled before start".into()));
            }
            op(&loaded)
        })
        .await
    }

    pub async fn search_symbols(
        &self,
        pattern: &str,
        filter: Option<ElementFilter>,
        max_results: usize,
    ) -> ApiResult<Vec<SearchMatch>> {
        self.loaded()?;
        let pattern = non_blank(pattern, "pattern")?.to_string();
        let max = positive(max_results)?;
        self.run("search_symbols", move |p| {
            p.query().search_symbols(&pattern, filter, max)
        })
        .await
    }

    pub async fn find_references(
        &self,
        element_id: &str,
        access: AccessMode,
        max_results: usize,
    ) -> ApiResult<Vec<SearchMatch>> {
        self.find_by_shape(element_id, QueryShape::from(access), max_results)
            .await
    }

    pub async fn find_implementations(
        &self,
        element_id: &str,
        max_results: usize,
    ) -> ApiResult<Vec<SearchMatch>> {
        self.loaded()?;
        let id = non_blank(element_id, "element id")?.to_string();
        let max = positive(max_results)?;
        self.run("find_implementations", move |p| {
            let element = p.element(&id)?;
            p.query().find_implementations(&element, max)
        })
        .await
    }

    pub async fn find_by_shape(
        &self,
        element_id: &str,
        shape: QueryShape,
        max_results: usize,
    ) -> ApiResult<Vec<SearchMatch>> {
        self.loaded()?;
        let id = non_blank(element_id, "element id")?.to_string();
        let max = positive(max_results)?;
        self.run("find_by_shape", move |p| {
            let element = p.element(&id)?;
            p.query().find_by_shape(&element, shape, max)
        })
        .await
    }

    pub async fn type_hierarchy(&self, type_id: &str) -> ApiResult<TypeHierarchy> {
        self.loaded()?;
        let id = non_blank(type_id, "element id")?.to_string();
        self.run("type_hierarchy", move |p| {
            let ty = p.type_element(&id)?;
            Ok(p.query().type_hierarchy(&ty))
        })
        .await
    }

    pub async fn all_supertypes(&self, type_id: &str) -> ApiResult<Vec<ElementHandle>> {
        self.loaded()?;
        let id = non_blank(type_id, "element id")?.to_string();
        self.run("all_supertypes", move |p| {
            let ty = p.type_element(&id)?;
            Ok(p.query().all_supertypes(&ty))
        })
        .await
    }

    pub async fn all_subtypes(&self, type_id: &str) -> ApiResult<Vec<ElementHandle>> {
        self.loaded()?;
        let id = non_blank(type_id, "element id")?.to_string();
        self.run("all_subtypes", move |p| {
            let ty = p.type_element(&id)?;
            Ok(p.query().all_subtypes(&ty))
        })
        .await
    }

    pub async fn element(&self, element_id: &str) -> ApiResult<ElementHandle> {
        self.loaded()?;
        let id = non_blank(element_id, "element id")?.to_string();
        self.run("element", move |p| p.element(&id)).await
    }

    pub async fn offset_for(&self, path: &Path, line: usize, column: usize) -> ApiResult<usize> {
        let path = path.to_path_buf();
        self.run("offset_for", move |p| {
            let (_, text) = p.unit_text(&path)?;
            Ok(position::offset_for(&text, line, column))
        })
        .await
    }

    pub async fn line_for(&self, path: &Path, offset: usize) -> ApiResult<usize> {
        let path = path.to_path_buf();
        self.run("line_for", move |p| {
            let (_, text) = p.unit_text(&path)?;
            Ok(position::line_for(&text, offset))
        })
        .await
    }

    pub async fn column_for(&self, path: &Path, offset: usize) -> ApiResult<usize> {
        let path = path.to_path_buf();
        self.run("column_for", move |p| {
            let (_, text) = p.unit_text(&path)?;
            Ok(position::column_for(&text, offset))
        })
        .await
    }

    pub async fn element_at(
        &self,
        path: &Path,
        line: usize,
        column: usize,
    ) -> ApiResult<Option<ElementHandle>> {
        let path = path.to_path_buf();
        self.run("element_at", move |p| {
            let (unit, _) = p.unit_text(&path)?;
            Ok(position::element_at(
                p.bound.project.as_ref(),
                &unit,
                line,
                column,
            ))
        })
        .await
    }
}
