//! Contract of the semantic engine.
//!
//! The engine parses, binds and indexes source code; this workspace only
//! decides what to register with it and which native search to run. The
//! vocabulary in this module (`SearchCategory`, `SearchPattern`,
//! `EngineMatch`) belongs to the engine side of that boundary.

use crate::error::ApiResult;
use crate::models::{
    ClasspathEntry, CompilationUnitHandle, ElementFilter, ElementHandle, MatchKind,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Engine-native search categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchCategory {
    Declarations,
    References,
    ReadAccesses,
    WriteAccesses,
    Implementors,
    AnnotationTypeReference,
    ClassInstanceCreationTypeReference,
    CastTypeReference,
    InstanceofTypeReference,
    ThrowsClauseTypeReference,
    CatchTypeReference,
    MethodReferenceExpression,
    TypeArgumentTypeReference,
}

/// What a pattern searches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternTarget {
    /// A name with optional `*`/`?` wildcards, optionally narrowed to one element family.
    Name {
        pattern: String,
        filter: Option<ElementFilter>,
    },
    /// A concrete element previously handed out by the engine.
    Element(ElementHandle),
}

/// A validated, engine-accepted search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
    pub target: PatternTarget,
    pub category: SearchCategory,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    Project,
    /// Only matches enclosed by one of these types (by id).
    Types(BTreeSet<String>),
}

impl SearchScope {
    pub fn encloses(&self, type_id: Option<&str>) -> bool {
        match self {
            SearchScope::Project => true,
            SearchScope::Types(ids) => type_id.is_some_and(|id| ids.contains(id)),
        }
    }
}

/// One native hit, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineMatch {
    /// The element enclosing the match (the declared element for declarations).
    pub element: ElementHandle,
    pub unit: CompilationUnitHandle,
    pub offset: usize,
    pub length: usize,
    pub kind: MatchKind,
    pub accurate: bool,
}

/// Everything the engine needs to register a logical project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub name: String,
    /// Project directory; must be inside the engine's workspace location.
    pub location: PathBuf,
    pub output_location: PathBuf,
    pub classpath: Vec<ClasspathEntry>,
}

pub trait SemanticEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Directory all project locations must live under.
    fn workspace_location(&self) -> &Path;

    /// Registers a new logical project. Fails if the name is already taken.
    fn create_project(&self, descriptor: ProjectDescriptor) -> ApiResult<Arc<dyn EngineProject>>;

    /// Removes a project; returns whether it existed.
    fn delete_project(&self, name: &str) -> ApiResult<bool>;

    fn project(&self, name: &str) -> Option<Arc<dyn EngineProject>>;
}

/// A live, queryable project. The index behind it is built lazily.
pub trait EngineProject: Send + Sync {
    fn name(&self) -> &str;

    fn classpath(&self) -> &[ClasspathEntry];

    fn compilation_units(&self) -> Vec<CompilationUnitHandle>;

    /// Unit at an engine-side path.
    fn compilation_unit(&self, path: &Path) -> Option<CompilationUnitHandle>;

    fn source(&self, unit: &CompilationUnitHandle) -> Option<Arc<str>>;

    /// Declared packages, sorted.
    fn packages(&self) -> Vec<String>;

    fn find_element(&self, id: &str) -> Option<ElementHandle>;

    /// Builds a native pattern; `None` when the target cannot be searched
    /// (malformed name pattern, stale handle, category not applicable).
    fn create_pattern(&self, target: PatternTarget, category: SearchCategory)
    -> Option<SearchPattern>;

    /// Reports matches in index order until the requestor returns `false`.
    fn search(
        &self,
        pattern: &SearchPattern,
        scope: &SearchScope,
        requestor: &mut dyn FnMut(EngineMatch) -> bool,
    ) -> ApiResult<()>;

    fn direct_supertypes(&self, ty: &ElementHandle) -> Vec<ElementHandle>;

    fn direct_subtypes(&self, ty: &ElementHandle) -> Vec<ElementHandle>;

    /// The type every type implicitly extends.
    fn implicit_root_type(&self) -> ElementHandle;

    /// Elements referenced or declared at a selection.
    fn code_select(
        &self,
        unit: &CompilationUnitHandle,
        offset: usize,
        length: usize,
    ) -> Vec<ElementHandle>;

    /// Innermost declared element whose source range contains `offset`.
    fn element_containing(&self, unit: &CompilationUnitHandle, offset: usize)
    -> Option<ElementHandle>;
}
