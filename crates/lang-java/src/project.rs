use crate::index::{IMPLICIT_ROOT, ProjectIndex};
use crate::pattern::NamePattern;
use crate::syntax::JavaSyntax;
use ignore::WalkBuilder;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stratum_api::{
    ApiResult, ClasspathEntry, CompilationUnitHandle, ElementFilter, ElementHandle, ElementKind,
    EngineMatch, EngineProject, PatternTarget, ProjectDescriptor, SearchCategory, SearchPattern,
    SearchScope,
};

/// A registered project. Sources are read and indexed on first use.
pub struct JavaProject {
    name: String,
    location: PathBuf,
    output: PathBuf,
    classpath: Vec<ClasspathEntry>,
    syntax: JavaSyntax,
    index: OnceCell<ProjectIndex>,
}

impl JavaProject {
    pub fn new(descriptor: ProjectDescriptor, syntax: JavaSyntax) -> Self {
        Self {
            name: descriptor.name,
            location: descriptor.location,
            output: descriptor.output_location,
            classpath: descriptor.classpath,
            syntax,
            index: OnceCell::new(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn output_location(&self) -> &Path {
        &self.output
    }

    pub fn is_indexed(&self) -> bool {
        self.index.get().is_some()
    }

    fn index(&self) -> &ProjectIndex {
        self.index.get_or_init(|| {
            let files = self.source_files();
            tracing::info!("Indexing project '{}': {} source files", self.name, files.len());
            let loaded: Vec<(PathBuf, String)> = files
                .into_par_iter()
                .filter_map(|path| match fs::read(&path) {
                    Ok(bytes) => match String::from_utf8(bytes) {
                        Ok(source) => Some((path, source)),
                        Err(_) => {
                            tracing::warn!("Skipping non UTF-8 source {}", path.display());
                            None
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to read {}: {}", path.display(), e);
                        None
                    }
                })
                .collect();
            ProjectIndex::build(&self.syntax, loaded)
        })
    }

    /// `.java` files under every source entry, each once, in walk order.
    fn source_files(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for entry in &self.classpath {
            let ClasspathEntry::Source(root) = entry else {
                continue;
            };
            let walker = WalkBuilder::new(&root.path)
                .standard_filters(false)
                .hidden(true)
                .follow_links(true)
                .sort_by_file_name(|a, b| a.cmp(b))
                .build();
            for dent in walker.filter_map(|e| e.ok()) {
                let path = dent.path();
                if dent.file_type().is_some_and(|t| t.is_file())
                    && path.extension().is_some_and(|ext| ext == "java")
                    && seen.insert(path.to_path_buf())
                {
                    files.push(path.to_path_buf());
                }
            }
        }
        files
    }
}

/// Whether a search category makes sense for an element kind.
fn category_applies(category: SearchCategory, kind: ElementKind) -> bool {
    match category {
        SearchCategory::Declarations | SearchCategory::References => true,
        SearchCategory::ReadAccesses | SearchCategory::WriteAccesses => kind.is_field(),
        SearchCategory::MethodReferenceExpression => kind.is_method(),
        SearchCategory::Implementors
        | SearchCategory::AnnotationTypeReference
        | SearchCategory::ClassInstanceCreationTypeReference
        | SearchCategory::CastTypeReference
        | SearchCategory::InstanceofTypeReference
        | SearchCategory::ThrowsClauseTypeReference
        | SearchCategory::CatchTypeReference
        | SearchCategory::TypeArgumentTypeReference => kind.is_type(),
    }
}

fn representative_kind(filter: ElementFilter) -> ElementKind {
    match filter {
        ElementFilter::Type => ElementKind::Class,
        ElementFilter::Method => ElementKind::Method,
        ElementFilter::Field => ElementKind::Field,
    }
}

impl EngineProject for JavaProject {
    fn name(&self) -> &str {
        &self.name
    }

    fn classpath(&self) -> &[ClasspathEntry] {
        &self.classpath
    }

    fn compilation_units(&self) -> Vec<CompilationUnitHandle> {
        self.index()
            .units()
            .iter()
            .map(|u| u.handle.clone())
            .collect()
    }

    fn compilation_unit(&self, path: &Path) -> Option<CompilationUnitHandle> {
        self.index().unit(path).map(|u| u.handle.clone())
    }

    fn source(&self, unit: &CompilationUnitHandle) -> Option<Arc<str>> {
        self.index().unit(&unit.path).map(|u| u.source.clone())
    }

    fn packages(&self) -> Vec<String> {
        self.index().packages().to_vec()
    }

    fn find_element(&self, id: &str) -> Option<ElementHandle> {
        self.index().declaration(id).map(|d| d.handle.clone())
    }

    fn create_pattern(
        &self,
        target: PatternTarget,
        category: SearchCategory,
    ) -> Option<SearchPattern> {
        match &target {
            PatternTarget::Name { pattern, filter } => {
                NamePattern::parse(pattern, false)?;
                if filter.is_some_and(|f| !category_applies(category, representative_kind(f))) {
                    return None;
                }
            }
            PatternTarget::Element(handle) => {
                if !handle.binary && self.index().declaration(&handle.id).is_none() {
                    tracing::debug!("Stale element handle: {}", handle.id);
                    return None;
                }
                if !category_applies(category, handle.kind) {
                    return None;
                }
            }
        }
        Some(SearchPattern {
            target,
            category,
            case_sensitive: false,
        })
    }

    fn search(
        &self,
        pattern: &SearchPattern,
        scope: &SearchScope,
        requestor: &mut dyn FnMut(EngineMatch) -> bool,
    ) -> ApiResult<()> {
        self.index().search(pattern, scope, requestor);
        Ok(())
    }

    fn direct_supertypes(&self, ty: &ElementHandle) -> Vec<ElementHandle> {
        self.index().direct_supertypes(&ty.id)
    }

    fn direct_subtypes(&self, ty: &ElementHandle) -> Vec<ElementHandle> {
        self.index().direct_subtypes(&ty.id)
    }

    fn implicit_root_type(&self) -> ElementHandle {
        ElementHandle::binary_type(IMPLICIT_ROOT)
    }

    fn code_select(
        &self,
        unit: &CompilationUnitHandle,
        offset: usize,
        length: usize,
    ) -> Vec<ElementHandle> {
        self.index().code_select(&unit.path, offset, length)
    }

    fn element_containing(
        &self,
        unit: &CompilationUnitHandle,
        offset: usize,
    ) -> Option<ElementHandle> {
        self.index().element_containing(&unit.path, offset)
    }
}
