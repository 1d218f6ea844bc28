//! Read-only queries over a bound project.
//!
//! [`SymbolIndexQuery`] turns caller requests into engine patterns, runs them,
//! and normalizes engine hits into [`SearchMatch`] values with reported paths
//! and line/column positions.

pub mod hierarchy;
pub mod position;

use crate::path::PathResolver;
use std::collections::BTreeSet;
use std::path::Path;
use stratum_api::{
    AccessMode, ApiResult, CompilationUnitHandle, ElementFilter, ElementHandle, ElementKind,
    EngineMatch, EngineProject, MatchKind, PatternTarget, QueryShape, SearchCategory,
    SearchMatch, SearchScope, TypeHierarchy,
};

/// Engine category for each query shape.
pub fn category_for(shape: QueryShape) -> SearchCategory {
    match shape {
        QueryShape::Declarations => SearchCategory::Declarations,
        QueryShape::AllReferences => SearchCategory::References,
        QueryShape::ReadAccesses => SearchCategory::ReadAccesses,
        QueryShape::WriteAccesses => SearchCategory::WriteAccesses,
        QueryShape::Implementors => SearchCategory::Implementors,
        QueryShape::AnnotationUsage => SearchCategory::AnnotationTypeReference,
        QueryShape::Instantiation => SearchCategory::ClassInstanceCreationTypeReference,
        QueryShape::Cast => SearchCategory::CastTypeReference,
        QueryShape::Instanceof => SearchCategory::InstanceofTypeReference,
        QueryShape::ThrowsClause => SearchCategory::ThrowsClauseTypeReference,
        QueryShape::CatchClause => SearchCategory::CatchTypeReference,
        QueryShape::MethodReferenceExpr => SearchCategory::MethodReferenceExpression,
        QueryShape::TypeArgumentUsage => SearchCategory::TypeArgumentTypeReference,
    }
}

/// Parameter count encoded in a method id, `None` for non-method ids.
fn arity_of(id: &str) -> Option<usize> {
    let params = id.split_once('(')?.1.strip_suffix(')')?;
    Some(if params.is_empty() {
        0
    } else {
        params.split(',').count()
    })
}

pub struct SymbolIndexQuery<'a> {
    project: &'a dyn EngineProject,
    paths: &'a PathResolver,
}

impl<'a> SymbolIndexQuery<'a> {
    pub fn new(project: &'a dyn EngineProject, paths: &'a PathResolver) -> Self {
        Self { project, paths }
    }

    pub fn search_symbols(
        &self,
        pattern: &str,
        filter: Option<ElementFilter>,
        max: usize,
    ) -> ApiResult<Vec<SearchMatch>> {
        let target = PatternTarget::Name {
            pattern: pattern.to_string(),
            filter,
        };
        self.run(target, SearchCategory::Declarations, &SearchScope::Project, max)
    }

    pub fn find_references(
        &self,
        element: &ElementHandle,
        access: AccessMode,
        max: usize,
    ) -> ApiResult<Vec<SearchMatch>> {
        self.find_by_shape(element, QueryShape::from(access), max)
    }

    pub fn find_by_shape(
        &self,
        element: &ElementHandle,
        shape: QueryShape,
        max: usize,
    ) -> ApiResult<Vec<SearchMatch>> {
        self.run(
            PatternTarget::Element(element.clone()),
            category_for(shape),
            &SearchScope::Project,
            max,
        )
    }

    /// Subtypes of a type; for a method, same-name same-arity declarations
    /// inside the subtypes of its declaring type.
    pub fn find_implementations(
        &self,
        element: &ElementHandle,
        max: usize,
    ) -> ApiResult<Vec<SearchMatch>> {
        if element.kind.is_type() {
            return Ok(hierarchy::all_subtypes(self.project, element)
                .iter()
                .filter_map(|sub| self.declaration_match(sub))
                .take(max)
                .collect());
        }
        if element.kind != ElementKind::Method {
            return Ok(Vec::new());
        }

        let Some(owner) = element
            .declaring_type
            .as_deref()
            .and_then(|id| self.project.find_element(id))
        else {
            return Ok(Vec::new());
        };
        let subtypes: BTreeSet<String> = hierarchy::all_subtypes(self.project, &owner)
            .into_iter()
            .map(|t| t.id)
            .collect();
        if subtypes.is_empty() {
            return Ok(Vec::new());
        }

        let arity = arity_of(&element.id);
        let target = PatternTarget::Name {
            pattern: element.name.clone(),
            filter: Some(ElementFilter::Method),
        };
        let Some(pattern) = self
            .project
            .create_pattern(target, SearchCategory::Declarations)
        else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        self.project
            .search(&pattern, &SearchScope::Types(subtypes), &mut |m| {
                if m.element.kind == ElementKind::Method
                    && m.element.name == element.name
                    && arity_of(&m.element.id) == arity
                {
                    out.push(self.normalize(m));
                }
                out.len() < max
            })?;
        Ok(out)
    }

    pub fn type_hierarchy(&self, ty: &ElementHandle) -> TypeHierarchy {
        hierarchy::type_hierarchy(self.project, ty)
    }

    pub fn all_supertypes(&self, ty: &ElementHandle) -> Vec<ElementHandle> {
        hierarchy::all_supertypes(self.project, ty)
    }

    pub fn all_subtypes(&self, ty: &ElementHandle) -> Vec<ElementHandle> {
        hierarchy::all_subtypes(self.project, ty)
    }

    pub fn element(&self, id: &str) -> Option<ElementHandle> {
        self.project.find_element(id)
    }

    /// Unit for a caller path, absolute or relative to the tree root.
    pub fn unit_for(&self, path: &Path) -> Option<CompilationUnitHandle> {
        let workspace = self.paths.to_workspace(path)?;
        self.project.compilation_unit(&workspace)
    }

    fn run(
        &self,
        target: PatternTarget,
        category: SearchCategory,
        scope: &SearchScope,
        max: usize,
    ) -> ApiResult<Vec<SearchMatch>> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let Some(pattern) = self.project.create_pattern(target, category) else {
            tracing::debug!("Engine rejected pattern for {:?}", category);
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        self.project.search(&pattern, scope, &mut |m| {
            out.push(self.normalize(m));
            out.len() < max
        })?;
        Ok(out)
    }

    fn declaration_match(&self, handle: &ElementHandle) -> Option<SearchMatch> {
        let unit = handle.unit.clone()?;
        Some(self.normalize(EngineMatch {
            element: handle.clone(),
            unit,
            offset: handle.name_offset.unwrap_or(0),
            length: handle.name_length,
            kind: MatchKind::Declaration,
            accurate: true,
        }))
    }

    fn normalize(&self, m: EngineMatch) -> SearchMatch {
        let (line, column) = match self.project.source(&m.unit) {
            Some(text) => (
                position::line_for(&text, m.offset),
                position::column_for(&text, m.offset),
            ),
            None => (0, 0),
        };
        SearchMatch {
            name: m.element.name,
            element_id: m.element.id,
            element_kind: m.element.kind,
            kind: m.kind,
            path: self.paths.report(&m.unit.path),
            offset: m.offset,
            length: m.length,
            line,
            column,
            accurate: m.accurate,
        }
    }
}
