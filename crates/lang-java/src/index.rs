use crate::bind::{Binder, ResolvedType, UnitScope, qualified_name};
use crate::collect::collect_unit;
use crate::model::{Declaration, Occurrence, UnitFacts};
use crate::pattern::NamePattern;
use crate::syntax::JavaSyntax;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stratum_api::{
    CompilationUnitHandle, ElementHandle, EngineMatch, MatchKind, PatternTarget, SearchCategory,
    SearchPattern, SearchScope,
};

pub const IMPLICIT_ROOT: &str = "java.lang.Object";

pub struct UnitEntry {
    pub handle: CompilationUnitHandle,
    pub source: Arc<str>,
    pub package: String,
}

/// Type graph with an edge from each type to each of its direct supertypes.
#[derive(Default)]
struct TypeGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl TypeGraph {
    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(&index) = self.nodes.get(id) {
            return index;
        }
        let index = self.graph.add_node(id.to_string());
        self.nodes.insert(id.to_string(), index);
        index
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<&str> {
        let Some(&index) = self.nodes.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(index, direction)
            .map(|n| self.graph[n].as_str())
            .collect()
    }
}

/// Everything known about one bound project.
pub struct ProjectIndex {
    units: Vec<UnitEntry>,
    unit_by_path: HashMap<PathBuf, usize>,
    declarations: Vec<Declaration>,
    by_id: HashMap<String, usize>,
    occurrences: Vec<Occurrence>,
    supertypes: HashMap<String, Vec<ResolvedType>>,
    graph: TypeGraph,
    packages: Vec<String>,
}

impl ProjectIndex {
    /// Parses and binds every file. Files are parsed in parallel; the index
    /// keeps the order of `files`.
    pub fn build(syntax: &JavaSyntax, files: Vec<(PathBuf, String)>) -> Self {
        let facts: Vec<UnitFacts> = files
            .into_par_iter()
            .enumerate()
            .map(|(unit, (path, source))| {
                collect_unit(syntax, CompilationUnitHandle::new(path), Arc::from(source), unit)
            })
            .collect();
        Self::from_units(facts)
    }

    pub fn from_units(facts: Vec<UnitFacts>) -> Self {
        let scopes: Vec<UnitScope> = facts
            .iter()
            .map(|f| UnitScope {
                package: f.package.clone(),
                imports: f.imports.clone(),
            })
            .collect();

        let mut offsets = Vec::with_capacity(facts.len());
        let mut declarations = Vec::new();
        for f in &facts {
            offsets.push(declarations.len());
            declarations.extend(f.declarations.iter().cloned());
        }

        let binder = Binder::new(&scopes, &declarations);
        let occurrences: Vec<Occurrence> = facts
            .par_iter()
            .enumerate()
            .flat_map_iter(|(unit, f)| {
                let binder = &binder;
                let offset = offsets[unit];
                f.occurrences
                    .iter()
                    .filter_map(move |raw| binder.bind(raw, unit, offset))
            })
            .collect();
        let supertypes = binder.into_supertypes();

        let mut by_id = HashMap::with_capacity(declarations.len());
        for (index, decl) in declarations.iter().enumerate() {
            by_id.entry(decl.id().to_string()).or_insert(index);
        }

        let mut graph = TypeGraph::default();
        for decl in declarations.iter().filter(|d| d.handle.kind.is_type()) {
            let from = graph.node(decl.id());
            for sup in supertypes.get(decl.id()).into_iter().flatten() {
                let to = graph.node(sup.id());
                graph.graph.update_edge(from, to, ());
            }
        }

        let packages: BTreeSet<String> = facts
            .iter()
            .filter(|f| !f.package.is_empty())
            .map(|f| f.package.clone())
            .collect();

        let mut units = Vec::with_capacity(facts.len());
        let mut unit_by_path = HashMap::with_capacity(facts.len());
        for (index, f) in facts.into_iter().enumerate() {
            unit_by_path.insert(f.handle.path.clone(), index);
            units.push(UnitEntry {
                handle: f.handle,
                source: f.source,
                package: f.package,
            });
        }

        tracing::debug!(
            "Indexed {} units, {} declarations, {} occurrences",
            units.len(),
            declarations.len(),
            occurrences.len()
        );

        Self {
            units,
            unit_by_path,
            declarations,
            by_id,
            occurrences,
            supertypes,
            graph,
            packages: packages.into_iter().collect(),
        }
    }

    pub fn units(&self) -> &[UnitEntry] {
        &self.units
    }

    pub fn unit(&self, path: &Path) -> Option<&UnitEntry> {
        self.unit_by_path.get(path).map(|&i| &self.units[i])
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn declaration(&self, id: &str) -> Option<&Declaration> {
        self.by_id.get(id).map(|&i| &self.declarations[i])
    }

    /// Declared element, or a name-only handle for a type outside the project.
    fn handle_for(&self, id: &str) -> Option<ElementHandle> {
        match self.declaration(id) {
            Some(decl) => Some(decl.handle.clone()),
            None if !id.contains('#') && id.contains('.') => Some(ElementHandle::binary_type(id)),
            None => None,
        }
    }

    pub fn search(
        &self,
        pattern: &SearchPattern,
        scope: &SearchScope,
        requestor: &mut dyn FnMut(EngineMatch) -> bool,
    ) {
        if pattern.category == SearchCategory::Declarations {
            return self.search_declarations(pattern, scope, requestor);
        }

        let name = match &pattern.target {
            PatternTarget::Name { pattern: text, filter } => {
                let Some(np) = NamePattern::parse(text, pattern.case_sensitive) else {
                    return;
                };
                Some((np, *filter))
            }
            PatternTarget::Element(_) => None,
        };

        for occurrence in &self.occurrences {
            if !category_accepts(pattern.category, occurrence.kind)
                || !scope.encloses(occurrence.enclosing_type.as_deref())
            {
                continue;
            }
            let hit = match (&pattern.target, &name) {
                (PatternTarget::Element(handle), _) => occurrence.targets.contains(&handle.id),
                (_, Some((np, filter))) => {
                    filter.is_none_or(|f| f == occurrence.family)
                        && occurrence.targets.first().is_some_and(|target| {
                            np.matches(&occurrence.target_name, &qualified_name(target))
                        })
                }
                _ => false,
            };
            if !hit {
                continue;
            }
            let Some(element) = occurrence
                .enclosing
                .map(|i| self.declarations[i].handle.clone())
            else {
                continue;
            };
            let matched = EngineMatch {
                element,
                unit: self.units[occurrence.unit].handle.clone(),
                offset: occurrence.offset,
                length: occurrence.length,
                kind: occurrence.kind,
                accurate: occurrence.accurate,
            };
            if !requestor(matched) {
                return;
            }
        }
    }

    fn search_declarations(
        &self,
        pattern: &SearchPattern,
        scope: &SearchScope,
        requestor: &mut dyn FnMut(EngineMatch) -> bool,
    ) {
        let accepts: Box<dyn Fn(&Declaration) -> bool> = match &pattern.target {
            PatternTarget::Element(handle) => {
                let id = handle.id.clone();
                Box::new(move |d: &Declaration| d.handle.id == id)
            }
            PatternTarget::Name { pattern: text, filter } => {
                let Some(np) = NamePattern::parse(text, pattern.case_sensitive) else {
                    return;
                };
                let filter = *filter;
                Box::new(move |d: &Declaration| {
                    filter.is_none_or(|f| f.accepts(d.handle.kind))
                        && np.matches(&d.handle.name, &qualified_name(d.id()))
                })
            }
        };

        for decl in &self.declarations {
            let owner = if decl.handle.kind.is_type() {
                Some(decl.id())
            } else {
                decl.handle.declaring_type.as_deref()
            };
            if !scope.encloses(owner) || !accepts(decl) {
                continue;
            }
            let matched = EngineMatch {
                element: decl.handle.clone(),
                unit: self.units[decl.unit].handle.clone(),
                offset: decl.handle.name_offset.unwrap_or(decl.range.start),
                length: decl.handle.name_length,
                kind: MatchKind::Declaration,
                accurate: true,
            };
            if !requestor(matched) {
                return;
            }
        }
    }

    /// Direct supertypes in declaration order; the implicit root comes first
    /// for classes without an `extends` clause.
    pub fn direct_supertypes(&self, id: &str) -> Vec<ElementHandle> {
        self.supertypes
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|sup| match sup {
                ResolvedType::Unresolved(name) => Some(ElementHandle::binary_type(name)),
                resolved => self.handle_for(resolved.id()),
            })
            .collect()
    }

    /// Direct project subtypes, in index order.
    pub fn direct_subtypes(&self, id: &str) -> Vec<ElementHandle> {
        let mut subs: Vec<usize> = self
            .graph
            .neighbors(id, Direction::Incoming)
            .into_iter()
            .filter_map(|sub| self.by_id.get(sub).copied())
            .collect();
        subs.sort_unstable();
        subs.dedup();
        subs.into_iter()
            .map(|i| self.declarations[i].handle.clone())
            .collect()
    }

    pub fn code_select(&self, path: &Path, offset: usize, length: usize) -> Vec<ElementHandle> {
        let Some(&unit) = self.unit_by_path.get(path) else {
            return Vec::new();
        };
        let end = offset + length;

        let referenced: Vec<ElementHandle> = self
            .occurrences
            .iter()
            .filter(|o| o.unit == unit && o.offset <= offset && end <= o.offset + o.length)
            .flat_map(|o| o.targets.iter().filter_map(|t| self.handle_for(t)))
            .collect();
        if !referenced.is_empty() {
            return referenced;
        }

        self.declarations
            .iter()
            .filter(|d| d.unit == unit)
            .filter(|d| {
                d.handle
                    .name_offset
                    .is_some_and(|start| start <= offset && end <= start + d.handle.name_length)
            })
            .map(|d| d.handle.clone())
            .take(1)
            .collect()
    }

    pub fn element_containing(&self, path: &Path, offset: usize) -> Option<ElementHandle> {
        let &unit = self.unit_by_path.get(path)?;
        self.declarations
            .iter()
            .filter(|d| d.unit == unit && d.range.start <= offset && offset < d.range.end)
            .min_by_key(|d| d.range.len())
            .map(|d| d.handle.clone())
    }
}

fn category_accepts(category: SearchCategory, kind: MatchKind) -> bool {
    match category {
        SearchCategory::Declarations => kind == MatchKind::Declaration,
        SearchCategory::References => kind != MatchKind::Declaration,
        SearchCategory::ReadAccesses => kind.is_read(),
        SearchCategory::WriteAccesses => kind.is_write(),
        SearchCategory::Implementors => kind == MatchKind::Implementation,
        SearchCategory::AnnotationTypeReference => kind == MatchKind::Annotation,
        SearchCategory::ClassInstanceCreationTypeReference => kind == MatchKind::Instantiation,
        SearchCategory::CastTypeReference => kind == MatchKind::Cast,
        SearchCategory::InstanceofTypeReference => kind == MatchKind::Instanceof,
        SearchCategory::ThrowsClauseTypeReference => kind == MatchKind::ThrowsClause,
        SearchCategory::CatchTypeReference => kind == MatchKind::CatchClause,
        SearchCategory::MethodReferenceExpression => kind == MatchKind::MethodReference,
        SearchCategory::TypeArgumentTypeReference => kind == MatchKind::TypeArgument,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_api::{ElementFilter, ElementKind};

    fn index(files: &[(&str, &str)]) -> ProjectIndex {
        ProjectIndex::build(
            &JavaSyntax::new(),
            files
                .iter()
                .map(|(p, s)| (PathBuf::from(p), s.to_string()))
                .collect(),
        )
    }

    fn run(index: &ProjectIndex, target: PatternTarget, category: SearchCategory) -> Vec<EngineMatch> {
        let pattern = SearchPattern {
            target,
            category,
            case_sensitive: false,
        };
        let mut out = Vec::new();
        index.search(&pattern, &SearchScope::Project, &mut |m| {
            out.push(m);
            true
        });
        out
    }

    #[test]
    fn test_declaration_search_by_name() {
        let idx = index(&[
            ("/ws/a/Calculator.java", "package a; public class Calculator { int calcTotal() { return 0; } }"),
            ("/ws/a/UserService.java", "package a; public class UserService {}"),
        ]);
        let hits = run(
            &idx,
            PatternTarget::Name {
                pattern: "Calc*".into(),
                filter: Some(ElementFilter::Type),
            },
            SearchCategory::Declarations,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].element.name, "Calculator");

        let unfiltered = run(
            &idx,
            PatternTarget::Name {
                pattern: "calc*".into(),
                filter: None,
            },
            SearchCategory::Declarations,
        );
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn test_requestor_can_stop() {
        let idx = index(&[("/ws/A.java", "class A {} class B {} class C {}")]);
        let pattern = SearchPattern {
            target: PatternTarget::Name {
                pattern: "*".into(),
                filter: None,
            },
            category: SearchCategory::Declarations,
            case_sensitive: false,
        };
        let mut seen = 0;
        idx.search(&pattern, &SearchScope::Project, &mut |_| {
            seen += 1;
            seen < 2
        });
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_hierarchy_edges() {
        let idx = index(&[(
            "/ws/A.java",
            "package p; interface Shape {} abstract class Base implements Shape {} class Square extends Base {} class Circle implements Shape {}",
        )]);
        let subs: Vec<_> = idx
            .direct_subtypes("p.Shape")
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(subs, vec!["p.Base", "p.Circle"]);

        let supers: Vec<_> = idx
            .direct_supertypes("p.Base")
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(supers, vec![IMPLICIT_ROOT, "p.Shape"]);
        assert!(idx.direct_supertypes(IMPLICIT_ROOT).is_empty());
    }

    #[test]
    fn test_code_select_and_containing_element() {
        let source = "package p;\nclass A {\n  int n;\n  void f() { n = 1; }\n}\n";
        let idx = index(&[("/ws/A.java", source)]);
        let path = Path::new("/ws/A.java");

        let use_offset = source.find("n = 1").unwrap();
        let selected = idx.code_select(path, use_offset, 0);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "p.A#n");

        let decl_offset = source.find("f()").unwrap();
        assert_eq!(idx.code_select(path, decl_offset, 1)[0].id, "p.A#f()");

        let inside = idx.element_containing(path, use_offset).unwrap();
        assert_eq!(inside.kind, ElementKind::Method);
        assert_eq!(idx.element_containing(path, 0), None);
    }
}
