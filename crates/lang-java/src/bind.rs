//! Second pass: resolves raw occurrences against every collected declaration.
//!
//! Resolution is heuristic. Types go through the usual Java lookup order
//! (enclosing types, single imports, same package, on-demand imports,
//! `java.lang`); members are found through the declared type of the receiver
//! and the project supertypes of that type. A member access whose receiver
//! cannot be typed binds only when the name is unique in the project, and is
//! then marked inaccurate.

use crate::model::{Declaration, Import, Occurrence, RawOccurrence, RawTarget, Receiver, erase_type};
use std::collections::{HashMap, HashSet, VecDeque};
use stratum_api::{ElementFilter, ElementKind, MatchKind};

/// Simple names visible without import.
const JAVA_LANG: &[&str] = &[
    "Object", "String", "Integer", "Long", "Short", "Byte", "Character", "Boolean", "Double",
    "Float", "Number", "Math", "System", "Thread", "Runnable", "Iterable", "Comparable",
    "CharSequence", "StringBuilder", "Enum", "Record", "Class", "Void", "AutoCloseable",
    "Cloneable", "Exception", "RuntimeException", "Error", "Throwable",
    "IllegalArgumentException", "IllegalStateException", "NullPointerException",
    "UnsupportedOperationException", "IndexOutOfBoundsException", "ClassCastException",
    "ArithmeticException", "InterruptedException", "CloneNotSupportedException", "Override",
    "Deprecated", "SuppressWarnings", "FunctionalInterface", "SafeVarargs",
];

/// Package and imports of one unit.
#[derive(Debug, Clone, Default)]
pub struct UnitScope {
    pub package: String,
    pub imports: Vec<Import>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    /// Declared in the project.
    Project(String),
    /// Known by qualified name only.
    External(String),
    Unresolved(String),
}

impl ResolvedType {
    pub fn id(&self) -> &str {
        match self {
            ResolvedType::Project(id) | ResolvedType::External(id) | ResolvedType::Unresolved(id) => id,
        }
    }
}

pub struct Binder<'a> {
    scopes: &'a [UnitScope],
    declarations: &'a [Declaration],
    types: HashMap<&'a str, usize>,
    members: HashMap<&'a str, Vec<usize>>,
    supertypes: HashMap<String, Vec<ResolvedType>>,
}

impl<'a> Binder<'a> {
    pub fn new(scopes: &'a [UnitScope], declarations: &'a [Declaration]) -> Self {
        let mut types = HashMap::new();
        let mut members: HashMap<&str, Vec<usize>> = HashMap::new();
        for (index, decl) in declarations.iter().enumerate() {
            if decl.handle.kind.is_type() {
                types.entry(decl.id()).or_insert(index);
            } else if let Some(owner) = decl.handle.declaring_type.as_deref() {
                members.entry(owner).or_default().push(index);
            }
        }

        let mut binder = Self {
            scopes,
            declarations,
            types,
            members,
            supertypes: HashMap::new(),
        };
        let supertypes = declarations
            .iter()
            .filter(|d| d.handle.kind.is_type())
            .map(|d| {
                let supers = d
                    .super_texts
                    .iter()
                    .map(|text| binder.resolve_type(text, d.unit, &d.enclosing_types))
                    .filter(|r| r.id() != d.id())
                    .collect();
                (d.id().to_string(), supers)
            })
            .collect();
        binder.supertypes = supertypes;
        binder
    }

    /// Resolved direct supertypes of a project type, in declaration order.
    pub fn supertypes_of(&self, type_id: &str) -> &[ResolvedType] {
        self.supertypes.get(type_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_supertypes(self) -> HashMap<String, Vec<ResolvedType>> {
        self.supertypes
    }

    pub fn resolve_type(&self, written: &str, unit: usize, chain: &[String]) -> ResolvedType {
        let name = erase_type(written);
        let Some((head, rest)) = name.split_once('.') else {
            return self.resolve_simple(&name, unit, chain);
        };
        if self.types.contains_key(name.as_str()) {
            return ResolvedType::Project(name);
        }
        match self.resolve_simple(head, unit, chain) {
            ResolvedType::Project(outer) | ResolvedType::External(outer) => {
                let nested = format!("{}.{}", outer, rest);
                if self.types.contains_key(nested.as_str()) {
                    ResolvedType::Project(nested)
                } else {
                    ResolvedType::External(nested)
                }
            }
            ResolvedType::Unresolved(_) => ResolvedType::External(name),
        }
    }

    fn resolve_simple(&self, name: &str, unit: usize, chain: &[String]) -> ResolvedType {
        for outer in chain.iter().rev() {
            if outer.rsplit('.').next() == Some(name) {
                return ResolvedType::Project(outer.clone());
            }
            let nested = format!("{}.{}", outer, name);
            if self.types.contains_key(nested.as_str()) {
                return ResolvedType::Project(nested);
            }
        }

        let scope = self.scopes.get(unit).cloned().unwrap_or_default();
        let suffix = format!(".{}", name);
        for import in scope.imports.iter().filter(|i| !i.on_demand && !i.is_static) {
            if import.path.ends_with(&suffix) || import.path == name {
                return self.known(import.path.clone());
            }
        }

        let same_package = if scope.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", scope.package, name)
        };
        if self.types.contains_key(same_package.as_str()) {
            return ResolvedType::Project(same_package);
        }

        for import in scope.imports.iter().filter(|i| i.on_demand && !i.is_static) {
            let candidate = format!("{}.{}", import.path, name);
            if self.types.contains_key(candidate.as_str()) {
                return ResolvedType::Project(candidate);
            }
        }

        if JAVA_LANG.contains(&name) {
            return ResolvedType::External(format!("java.lang.{}", name));
        }
        ResolvedType::Unresolved(name.to_string())
    }

    fn known(&self, qualified: String) -> ResolvedType {
        if self.types.contains_key(qualified.as_str()) {
            ResolvedType::Project(qualified)
        } else {
            ResolvedType::External(qualified)
        }
    }

    /// The type and its project supertypes, breadth first, each once.
    fn lineage(&self, type_id: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([type_id.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for sup in self.supertypes_of(&current) {
                if let ResolvedType::Project(id) = sup {
                    queue.push_back(id.clone());
                }
            }
            order.push(current);
        }
        order
    }

    fn members_of(&self, type_id: &str) -> impl Iterator<Item = (usize, &'a Declaration)> + '_ {
        let declarations = self.declarations;
        self.members
            .get(type_id)
            .into_iter()
            .flatten()
            .map(move |&i| (i, &declarations[i]))
    }

    fn find_field(&self, type_id: &str, name: &str) -> Option<usize> {
        self.lineage(type_id).iter().find_map(|ty| {
            self.members_of(ty)
                .find(|(_, d)| d.handle.kind.is_field() && d.handle.name == name)
                .map(|(i, _)| i)
        })
    }

    /// Overloads in the nearest type of the lineage that declares any.
    fn find_methods(&self, type_id: &str, name: &str, arity: Option<usize>) -> Vec<usize> {
        for ty in self.lineage(type_id) {
            let found: Vec<usize> = self
                .members_of(&ty)
                .filter(|(_, d)| {
                    d.handle.kind == ElementKind::Method
                        && d.handle.name == name
                        && arity.is_none_or(|n| d.accepts_arity(n))
                })
                .map(|(i, _)| i)
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    fn constructors(&self, type_id: &str, arity: Option<usize>) -> Vec<usize> {
        self.members_of(type_id)
            .filter(|(_, d)| {
                d.handle.kind == ElementKind::Constructor && arity.is_none_or(|n| d.accepts_arity(n))
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn field_in_chain(&self, name: &str, chain: &[String]) -> Option<usize> {
        chain.iter().rev().find_map(|ty| self.find_field(ty, name))
    }

    /// Declared type of a field, resolved where the field is declared.
    fn field_type(&self, field: usize) -> Option<ResolvedType> {
        let decl = &self.declarations[field];
        let text = decl.type_text.as_deref()?;
        Some(self.resolve_type(text, decl.unit, &decl.enclosing_types))
    }

    /// Candidate receiver types, innermost first. `None` when the receiver
    /// expression cannot be typed.
    fn receiver_types(&self, receiver: &Receiver, unit: usize, chain: &[String]) -> Option<Vec<String>> {
        match receiver {
            Receiver::Implicit => Some(chain.iter().rev().cloned().collect()),
            Receiver::This => chain.last().map(|t| vec![t.clone()]),
            Receiver::Super => chain.last().map(|t| {
                self.supertypes_of(t)
                    .iter()
                    .map(|s| s.id().to_string())
                    .collect()
            }),
            Receiver::Type(text) => match self.resolve_type(text, unit, chain) {
                ResolvedType::Unresolved(_) => None,
                resolved => Some(vec![resolved.id().to_string()]),
            },
            Receiver::Name(name) => {
                if let Some(field) = self.field_in_chain(name, chain) {
                    return match self.field_type(field)? {
                        ResolvedType::Unresolved(_) => None,
                        resolved => Some(vec![resolved.id().to_string()]),
                    };
                }
                match self.resolve_type(name, unit, chain) {
                    ResolvedType::Unresolved(_) => None,
                    resolved => Some(vec![resolved.id().to_string()]),
                }
            }
            Receiver::Unknown => None,
        }
    }

    /// Project-wide lookup for an untyped receiver: binds only a unique candidate.
    fn unique_member(&self, kind: impl Fn(&Declaration) -> bool) -> Option<usize> {
        let mut found = self
            .declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| kind(d))
            .map(|(i, _)| i);
        let first = found.next()?;
        found.next().is_none().then_some(first)
    }

    pub fn bind(&self, raw: &RawOccurrence, unit: usize, unit_offset: usize) -> Option<Occurrence> {
        let chain: &[String] = &raw.enclosing_types;
        let mut occurrence = Occurrence {
            unit,
            offset: raw.offset,
            length: raw.length,
            kind: raw.kind,
            targets: Vec::new(),
            target_name: String::new(),
            family: ElementFilter::Type,
            enclosing: raw.enclosing.map(|i| i + unit_offset),
            enclosing_type: chain.last().cloned(),
            accurate: true,
        };

        match &raw.target {
            RawTarget::Type { name } => {
                let resolved = self.resolve_type(name, unit, chain);
                occurrence.accurate = !matches!(resolved, ResolvedType::Unresolved(_));
                occurrence.target_name = simple_name(resolved.id()).to_string();
                occurrence.targets = vec![resolved.id().to_string()];
            }
            RawTarget::Name { name } => {
                if let Some(field) = self.field_in_chain(name, chain) {
                    self.bind_members(&mut occurrence, ElementFilter::Field, vec![field], true);
                } else {
                    match self.resolve_type(name, unit, chain) {
                        ResolvedType::Unresolved(_) => return None,
                        resolved => {
                            occurrence.kind = MatchKind::Reference;
                            occurrence.target_name = simple_name(resolved.id()).to_string();
                            occurrence.targets = vec![resolved.id().to_string()];
                        }
                    }
                }
            }
            RawTarget::Field { name, receiver } => {
                match self.receiver_types(receiver, unit, chain) {
                    Some(types) => {
                        let field = types.iter().find_map(|t| self.find_field(t, name))?;
                        self.bind_members(&mut occurrence, ElementFilter::Field, vec![field], true);
                    }
                    None => {
                        let field =
                            self.unique_member(|d| d.handle.kind.is_field() && d.handle.name == *name)?;
                        self.bind_members(&mut occurrence, ElementFilter::Field, vec![field], false);
                    }
                }
            }
            RawTarget::Method {
                name,
                arity,
                receiver,
            } => match self.receiver_types(receiver, unit, chain) {
                Some(types) => {
                    let methods = types
                        .iter()
                        .map(|t| self.find_methods(t, name, Some(*arity)))
                        .find(|m| !m.is_empty())?;
                    let accurate = methods.len() == 1;
                    self.bind_members(&mut occurrence, ElementFilter::Method, methods, accurate);
                }
                None => {
                    let method = self.unique_member(|d| {
                        d.handle.kind == ElementKind::Method
                            && d.handle.name == *name
                            && d.accepts_arity(*arity)
                    })?;
                    self.bind_members(&mut occurrence, ElementFilter::Method, vec![method], false);
                }
            },
            RawTarget::Constructor { type_name, arity } => {
                let ResolvedType::Project(ty) = self.resolve_type(type_name, unit, chain) else {
                    return None;
                };
                let ctors = self.constructors(&ty, Some(*arity));
                if ctors.is_empty() {
                    return None;
                }
                let accurate = ctors.len() == 1;
                self.bind_members(&mut occurrence, ElementFilter::Method, ctors, accurate);
            }
            RawTarget::MethodRef { name, receiver } => {
                let types = self.receiver_types(receiver, unit, chain);
                let (methods, accurate) = match (name.as_str(), types) {
                    ("new", Some(types)) => (
                        types
                            .iter()
                            .map(|t| self.constructors(t, None))
                            .find(|m| !m.is_empty())?,
                        true,
                    ),
                    (_, Some(types)) => (
                        types
                            .iter()
                            .map(|t| self.find_methods(t, name, None))
                            .find(|m| !m.is_empty())?,
                        true,
                    ),
                    (_, None) => (
                        vec![self.unique_member(|d| {
                            d.handle.kind == ElementKind::Method && d.handle.name == *name
                        })?],
                        false,
                    ),
                };
                let accurate = accurate && methods.len() == 1;
                self.bind_members(&mut occurrence, ElementFilter::Method, methods, accurate);
            }
        }
        Some(occurrence)
    }

    fn bind_members(
        &self,
        occurrence: &mut Occurrence,
        family: ElementFilter,
        members: Vec<usize>,
        accurate: bool,
    ) {
        occurrence.family = family;
        occurrence.accurate = accurate;
        occurrence.target_name = members
            .first()
            .map(|&i| self.declarations[i].handle.name.clone())
            .unwrap_or_default();
        occurrence.targets = members
            .into_iter()
            .map(|i| self.declarations[i].id().to_string())
            .collect();
    }
}

fn simple_name(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

/// `pkg.Type#name(int)` becomes `pkg.Type.name`; type ids are already qualified.
pub fn qualified_name(id: &str) -> String {
    match id.split_once('#') {
        Some((owner, member)) => {
            let member = member.split('(').next().unwrap_or(member);
            format!("{}.{}", owner, member)
        }
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::collect_unit;
    use crate::syntax::JavaSyntax;
    use std::sync::Arc;
    use stratum_api::CompilationUnitHandle;

    fn bind_all(files: &[&str]) -> (Vec<Declaration>, Vec<Occurrence>) {
        let syntax = JavaSyntax::new();
        let facts: Vec<_> = files
            .iter()
            .enumerate()
            .map(|(i, src)| {
                collect_unit(
                    &syntax,
                    CompilationUnitHandle::new(format!("/ws/F{}.java", i)),
                    Arc::from(*src),
                    i,
                )
            })
            .collect();
        let scopes: Vec<UnitScope> = facts
            .iter()
            .map(|f| UnitScope {
                package: f.package.clone(),
                imports: f.imports.clone(),
            })
            .collect();
        let mut offsets = Vec::new();
        let mut declarations = Vec::new();
        for f in &facts {
            offsets.push(declarations.len());
            declarations.extend(f.declarations.iter().cloned());
        }
        let binder = Binder::new(&scopes, &declarations);
        let occurrences = facts
            .iter()
            .enumerate()
            .flat_map(|(u, f)| {
                f.occurrences
                    .iter()
                    .filter_map(|raw| binder.bind(raw, u, offsets[u]))
                    .collect::<Vec<_>>()
            })
            .collect();
        drop(binder);
        (declarations, occurrences)
    }

    fn targeting<'o>(occurrences: &'o [Occurrence], id: &str) -> Vec<&'o Occurrence> {
        occurrences
            .iter()
            .filter(|o| o.targets.iter().any(|t| t == id))
            .collect()
    }

    #[test]
    fn test_types_resolve_across_packages() {
        let (_, occ) = bind_all(&[
            "package com.acme.model; public class User {}",
            "package com.acme.app; import com.acme.model.User; class App { User u; }",
            "package com.acme.app; import com.acme.model.*; class Other { User u; String s; }",
        ]);
        assert_eq!(targeting(&occ, "com.acme.model.User").len(), 2);
        assert_eq!(targeting(&occ, "java.lang.String").len(), 1);
    }

    #[test]
    fn test_fields_resolve_through_inheritance_and_receivers() {
        let (_, occ) = bind_all(&[
            r#"package p;
class Base { protected int count; }
class Child extends Base {
    Child peer;
    void a() { count = 1; }
    void b() { this.count = 2; }
    void c() { peer.count = 3; }
    void d(Child other) { other.count = 4; }
}"#,
        ]);
        let writes: Vec<_> = targeting(&occ, "p.Base#count")
            .into_iter()
            .filter(|o| o.kind == MatchKind::Write)
            .collect();
        assert_eq!(writes.len(), 4);
        assert!(writes.iter().all(|o| o.accurate));
    }

    #[test]
    fn test_methods_resolve_by_arity() {
        let (_, occ) = bind_all(&[r#"package p;
class Calc {
    int add(int a) { return a; }
    int add(int a, int b) { return a + b; }
    void run() { add(1); add(1, 2); add(3, 4); }
}"#]);
        assert_eq!(targeting(&occ, "p.Calc#add(int)").len(), 1);
        assert_eq!(targeting(&occ, "p.Calc#add(int,int)").len(), 2);
    }

    #[test]
    fn test_constructor_and_method_reference() {
        let (_, occ) = bind_all(&[r#"package p;
class Box {
    Box() {}
    static Box make() { return new Box(); }
    java.util.function.Supplier<Box> s = Box::new;
    java.util.function.Supplier<Box> m = Box::make;
}"#]);
        let ctor = targeting(&occ, "p.Box#Box()");
        assert_eq!(ctor.len(), 2);
        assert!(ctor.iter().any(|o| o.kind == MatchKind::MethodReference));
        let make = targeting(&occ, "p.Box#make()");
        assert_eq!(make.len(), 1);
        assert_eq!(make[0].kind, MatchKind::MethodReference);
    }

    #[test]
    fn test_supertypes_resolved_with_implicit_root() {
        let scopes = vec![UnitScope {
            package: "p".into(),
            imports: vec![],
        }];
        let facts = collect_unit(
            &JavaSyntax::new(),
            CompilationUnitHandle::new("/ws/A.java"),
            Arc::from("package p; interface Shape {} class Circle implements Shape {} enum E {}"),
            0,
        );
        let binder = Binder::new(&scopes, &facts.declarations);
        assert_eq!(
            binder.supertypes_of("p.Circle"),
            &[
                ResolvedType::External("java.lang.Object".into()),
                ResolvedType::Project("p.Shape".into())
            ]
        );
        assert_eq!(
            binder.supertypes_of("p.E"),
            &[ResolvedType::External("java.lang.Enum".into())]
        );
        assert!(binder.supertypes_of("p.Shape").is_empty());
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("p.A#run(int)"), "p.A.run");
        assert_eq!(qualified_name("p.A#count"), "p.A.count");
        assert_eq!(qualified_name("p.A"), "p.A");
    }
}
