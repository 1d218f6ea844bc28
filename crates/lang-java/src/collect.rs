//! First pass: declarations and raw occurrences of one compilation unit.
//!
//! Everything here is local to the file. Names are recorded as written, with
//! enough context (receiver shape, enclosing type chain, local shadowing) for
//! the binder to resolve them once every unit has been collected.

use crate::model::{
    Declaration, Import, RawOccurrence, RawTarget, Receiver, UnitFacts, erase_type,
    signature_type,
};
use crate::syntax::{JavaSyntax, argument_count, is_field, named_children, text};
use std::collections::HashMap;
use std::sync::Arc;
use stratum_api::{CompilationUnitHandle, ElementHandle, ElementKind, MatchKind};
use tree_sitter::Node;

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// Parents under which an `identifier` names something rather than using it.
const NAMING_PARENTS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
    "annotation_type_element_declaration",
    "enum_constant",
    "formal_parameter",
    "catch_formal_parameter",
    "spread_parameter",
    "receiver_parameter",
    "inferred_parameters",
    "labeled_statement",
    "break_statement",
    "continue_statement",
    "scoped_identifier",
    "package_declaration",
    "import_declaration",
    "marker_annotation",
    "annotation",
    "type_parameter",
    "module_declaration",
];

#[derive(Debug, Clone)]
enum Local {
    /// Declared type as written; `None` when inferred (lambda parameters).
    Var(Option<String>),
    TypeParam,
}

pub fn collect_unit(
    syntax: &JavaSyntax,
    handle: CompilationUnitHandle,
    source: Arc<str>,
    unit: usize,
) -> UnitFacts {
    let mut collector = Collector::new(handle.clone(), &source, unit);
    match syntax.parse(&source) {
        Some(tree) => {
            if tree.root_node().has_error() {
                tracing::debug!("Syntax errors in {}, indexing what parsed", handle.path.display());
            }
            collector.visit(tree.root_node());
        }
        None => tracing::warn!("Could not parse {}", handle.path.display()),
    }
    let Collector {
        package,
        imports,
        declarations,
        occurrences,
        ..
    } = collector;
    UnitFacts {
        handle,
        source,
        package,
        imports,
        declarations,
        occurrences,
    }
}

struct Collector<'s> {
    source: &'s str,
    handle: CompilationUnitHandle,
    unit: usize,
    package: String,
    imports: Vec<Import>,
    declarations: Vec<Declaration>,
    occurrences: Vec<RawOccurrence>,
    types: Vec<String>,
    chain: Arc<[String]>,
    decls: Vec<usize>,
    scopes: Vec<HashMap<String, Local>>,
    anonymous_depth: usize,
}

impl<'s> Collector<'s> {
    fn new(handle: CompilationUnitHandle, source: &'s str, unit: usize) -> Self {
        Self {
            source,
            handle,
            unit,
            package: String::new(),
            imports: Vec::new(),
            declarations: Vec::new(),
            occurrences: Vec::new(),
            types: Vec::new(),
            chain: Arc::from(Vec::new()),
            decls: Vec::new(),
            scopes: vec![HashMap::new()],
            anonymous_depth: 0,
        }
    }

    fn text(&self, node: Node) -> &'s str {
        text(node, self.source)
    }

    fn visit_children(&mut self, node: Node) {
        for child in named_children(node) {
            self.visit(child);
        }
    }

    fn visit_field_node(&mut self, node: Node, field: &str) {
        if let Some(child) = node.child_by_field_name(field) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "line_comment" | "block_comment" => {}
            "package_declaration" => {
                if let Some(name) = named_children(node)
                    .into_iter()
                    .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
                {
                    self.package = self.text(name).to_string();
                }
            }
            "import_declaration" => self.visit_import(node),
            kind if TYPE_DECLARATIONS.contains(&kind) => self.visit_type_declaration(node),
            "method_declaration"
            | "constructor_declaration"
            | "annotation_type_element_declaration" => self.visit_method(node),
            "compact_constructor_declaration" => self.scoped(|c| c.visit_children(node)),
            "field_declaration" | "constant_declaration" => self.visit_field_declaration(node),
            "enum_constant" => self.visit_enum_constant(node),
            "block" | "constructor_body" | "for_statement" | "catch_clause"
            | "try_with_resources_statement" | "switch_block" => {
                self.scoped(|c| c.visit_children(node))
            }
            "lambda_expression" => self.visit_lambda(node),
            "enhanced_for_statement" => self.visit_enhanced_for(node),
            "local_variable_declaration" => self.visit_local_declaration(node),
            "formal_parameter" | "catch_formal_parameter" | "spread_parameter" => {
                self.visit_parameter(node)
            }
            "resource" => self.visit_resource(node),
            "instanceof_expression" => {
                self.visit_field_node(node, "left");
                self.visit_field_node(node, "right");
                self.visit_field_node(node, "pattern");
                if let (Some(name), Some(ty)) = (
                    node.child_by_field_name("name"),
                    node.child_by_field_name("right"),
                ) {
                    let ty = self.text(ty).to_string();
                    self.declare(self.text(name), Local::Var(Some(ty)));
                }
            }
            "type_parameter" => {
                if let Some(name) = named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "type_identifier")
                {
                    self.declare(self.text(name), Local::TypeParam);
                }
                for child in named_children(node) {
                    if child.kind() == "type_bound" {
                        self.visit(child);
                    }
                }
            }
            "object_creation_expression" => self.visit_object_creation(node),
            "explicit_constructor_invocation" => self.visit_explicit_constructor(node),
            "method_invocation" => self.visit_method_invocation(node),
            "method_reference" => self.visit_method_reference(node),
            "field_access" => self.visit_field_access(node),
            "marker_annotation" | "annotation" => self.visit_annotation(node),
            "element_value_pair" => self.visit_field_node(node, "value"),
            "labeled_statement" => {
                for child in named_children(node) {
                    if child.kind() != "identifier" {
                        self.visit(child);
                    }
                }
            }
            "break_statement" | "continue_statement" | "scoped_identifier" => {}
            "identifier" => self.visit_identifier(node),
            "type_identifier" => self.visit_type_identifier(node),
            "scoped_type_identifier" => self.visit_scoped_type(node),
            _ => self.visit_children(node),
        }
    }

    // ---- scopes ----

    fn scoped(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.push(HashMap::new());
        f(self);
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, local: Local) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), local);
        }
    }

    fn local(&self, name: &str) -> Option<&Local> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn push_type(&mut self, id: String) {
        self.types.push(id);
        self.chain = Arc::from(self.types.clone());
    }

    fn pop_type(&mut self) {
        self.types.pop();
        self.chain = Arc::from(self.types.clone());
    }

    // ---- declarations ----

    fn add_declaration(
        &mut self,
        node: Node,
        name_node: Node,
        id: String,
        kind: ElementKind,
    ) -> usize {
        let handle = ElementHandle {
            id,
            name: self.text(name_node).to_string(),
            kind,
            declaring_type: self.types.last().cloned(),
            unit: Some(self.handle.clone()),
            name_offset: Some(name_node.start_byte()),
            name_length: name_node.end_byte() - name_node.start_byte(),
            binary: false,
        };
        self.declarations.push(Declaration {
            handle,
            range: node.start_byte()..node.end_byte(),
            arity: 0,
            varargs: false,
            type_text: None,
            super_texts: Vec::new(),
            enclosing_types: self.chain.clone(),
            unit: self.unit,
        });
        self.declarations.len() - 1
    }

    fn visit_import(&mut self, node: Node) {
        let mut import = Import {
            path: String::new(),
            on_demand: false,
            is_static: false,
        };
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "static" => import.is_static = true,
                "asterisk" => import.on_demand = true,
                "scoped_identifier" | "identifier" => import.path = self.text(child).to_string(),
                _ => {}
            }
        }
        if !import.path.is_empty() {
            self.imports.push(import);
        }
    }

    fn visit_type_declaration(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.visit_children(node);
        };
        let name = self.text(name_node);
        let id = match self.types.last() {
            Some(outer) => format!("{}.{}", outer, name),
            None if self.package.is_empty() => name.to_string(),
            None => format!("{}.{}", self.package, name),
        };
        let kind = match node.kind() {
            "interface_declaration" => ElementKind::Interface,
            "enum_declaration" => ElementKind::Enum,
            "record_declaration" => ElementKind::Record,
            "annotation_type_declaration" => ElementKind::Annotation,
            _ => ElementKind::Class,
        };

        let mut super_texts = Vec::new();
        let mut has_superclass = false;
        for child in named_children(node) {
            match child.kind() {
                "superclass" => {
                    has_superclass = true;
                    super_texts.extend(named_children(child).iter().map(|t| self.text(*t).to_string()));
                }
                "super_interfaces" | "extends_interfaces" => {
                    for list in named_children(child) {
                        super_texts
                            .extend(named_children(list).iter().map(|t| self.text(*t).to_string()));
                    }
                }
                _ => {}
            }
        }
        let implicit = match kind {
            ElementKind::Class if !has_superclass => Some("java.lang.Object"),
            ElementKind::Enum => Some("java.lang.Enum"),
            ElementKind::Record => Some("java.lang.Record"),
            ElementKind::Annotation => Some("java.lang.annotation.Annotation"),
            _ => None,
        };
        if let Some(root) = implicit {
            super_texts.insert(0, root.to_string());
        }

        let index = self.add_declaration(node, name_node, id.clone(), kind);
        self.declarations[index].super_texts = super_texts;

        self.decls.push(index);
        self.push_type(id.clone());
        self.scoped(|c| {
            for child in named_children(node) {
                match child.kind() {
                    "identifier" => {}
                    // record header: components become fields
                    "formal_parameters" if kind == ElementKind::Record => {
                        c.visit_record_components(child, &id)
                    }
                    _ => c.visit(child),
                }
            }
        });
        self.pop_type();
        self.decls.pop();
    }

    fn visit_record_components(&mut self, params: Node, type_id: &str) {
        for param in named_children(params) {
            if param.kind() != "formal_parameter" {
                continue;
            }
            let (Some(name), Some(ty)) = (
                param.child_by_field_name("name"),
                param.child_by_field_name("type"),
            ) else {
                continue;
            };
            let id = format!("{}#{}", type_id, self.text(name));
            let index = self.add_declaration(param, name, id, ElementKind::Field);
            self.declarations[index].type_text = Some(self.text(ty).to_string());
            self.decls.push(index);
            self.visit(ty);
            self.decls.pop();
        }
    }

    fn visit_method(&mut self, node: Node) {
        let type_id = self.types.last().cloned();
        let (Some(type_id), Some(name_node), 0) = (
            type_id,
            node.child_by_field_name("name"),
            self.anonymous_depth,
        ) else {
            return self.scoped(|c| c.visit_method_parts(node));
        };

        let mut signature = Vec::new();
        let mut varargs = false;
        if let Some(params) = node.child_by_field_name("parameters") {
            for param in named_children(params) {
                match param.kind() {
                    "formal_parameter" => {
                        if let Some(ty) = param.child_by_field_name("type") {
                            let dims = param
                                .child_by_field_name("dimensions")
                                .map(|d| self.text(d).to_string())
                                .unwrap_or_default();
                            signature.push(signature_type(
                                &format!("{}{}", self.text(ty), dims),
                                false,
                            ));
                        }
                    }
                    "spread_parameter" => {
                        varargs = true;
                        if let Some(ty) = spread_type(param) {
                            signature.push(signature_type(self.text(ty), true));
                        }
                    }
                    _ => {}
                }
            }
        }

        let kind = if node.kind() == "constructor_declaration" {
            ElementKind::Constructor
        } else {
            ElementKind::Method
        };
        let id = format!(
            "{}#{}({})",
            type_id,
            self.text(name_node),
            signature.join(",")
        );
        let index = self.add_declaration(node, name_node, id, kind);
        let declaration = &mut self.declarations[index];
        declaration.arity = signature.len();
        declaration.varargs = varargs;
        declaration.type_text = node
            .child_by_field_name("type")
            .map(|t| text(t, self.source).to_string());

        self.decls.push(index);
        self.scoped(|c| c.visit_method_parts(node));
        self.decls.pop();
    }

    fn visit_method_parts(&mut self, node: Node) {
        for child in named_children(node) {
            if child.kind() != "identifier" {
                self.visit(child);
            }
        }
    }

    fn visit_field_declaration(&mut self, node: Node) {
        let type_node = node.child_by_field_name("type");
        let type_text = type_node.map(|t| self.text(t).to_string());
        let declarators: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "variable_declarator")
            .collect();

        let type_id = self.types.last().cloned();
        let mut first = None;
        for declarator in &declarators {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            match (&type_id, self.anonymous_depth) {
                (Some(type_id), 0) => {
                    let id = format!("{}#{}", type_id, self.text(name));
                    let index = self.add_declaration(node, name, id, ElementKind::Field);
                    self.declarations[index].type_text = type_text.clone();
                    first.get_or_insert(index);
                }
                _ => self.declare(self.text(name), Local::Var(type_text.clone())),
            }
        }

        if let Some(index) = first {
            self.decls.push(index);
        }
        for child in named_children(node) {
            if child.kind() != "variable_declarator" {
                self.visit(child);
            }
        }
        for declarator in declarators {
            self.visit_field_node(declarator, "value");
        }
        if first.is_some() {
            self.decls.pop();
        }
    }

    fn visit_enum_constant(&mut self, node: Node) {
        let (Some(type_id), Some(name)) =
            (self.types.last().cloned(), node.child_by_field_name("name"))
        else {
            return;
        };
        let simple = type_id.rsplit('.').next().unwrap_or(&type_id).to_string();
        let id = format!("{}#{}", type_id, self.text(name));
        let index = self.add_declaration(node, name, id, ElementKind::EnumConstant);
        self.declarations[index].type_text = Some(simple);

        self.decls.push(index);
        for child in named_children(node) {
            match child.kind() {
                "identifier" => {}
                "class_body" => self.visit_anonymous_body(child),
                _ => self.visit(child),
            }
        }
        self.decls.pop();
    }

    // ---- locals ----

    fn visit_local_declaration(&mut self, node: Node) {
        let type_node = node.child_by_field_name("type");
        let mut type_text = type_node.map(|t| self.text(t).to_string());
        for child in named_children(node) {
            match child.kind() {
                "variable_declarator" => {
                    let value = child.child_by_field_name("value");
                    if let Some(value) = value {
                        self.visit(value);
                    }
                    // `var x = new Foo()` takes the instantiated type
                    if type_text.as_deref() == Some("var") {
                        type_text = value
                            .filter(|v| v.kind() == "object_creation_expression")
                            .and_then(|v| v.child_by_field_name("type"))
                            .map(|t| self.text(t).to_string());
                    }
                    if let Some(name) = child.child_by_field_name("name") {
                        self.declare(self.text(name), Local::Var(type_text.clone()));
                    }
                }
                _ => self.visit(child),
            }
        }
    }

    fn visit_parameter(&mut self, node: Node) {
        let type_node = match node.kind() {
            "catch_formal_parameter" => named_children(node)
                .into_iter()
                .find(|c| c.kind() == "catch_type")
                .and_then(|c| named_children(c).into_iter().next()),
            "spread_parameter" => spread_type(node),
            _ => node.child_by_field_name("type"),
        };
        let name = match node.kind() {
            "spread_parameter" => named_children(node)
                .into_iter()
                .find(|c| c.kind() == "variable_declarator")
                .and_then(|d| d.child_by_field_name("name"))
                .or_else(|| {
                    named_children(node)
                        .into_iter()
                        .find(|c| c.kind() == "identifier")
                }),
            _ => node.child_by_field_name("name"),
        };
        for child in named_children(node) {
            match child.kind() {
                "identifier" | "variable_declarator" => {}
                _ => self.visit(child),
            }
        }
        if let Some(name) = name {
            let ty = type_node.map(|t| self.text(t).to_string());
            self.declare(self.text(name), Local::Var(ty));
        }
    }

    fn visit_resource(&mut self, node: Node) {
        let Some(name) = node.child_by_field_name("name") else {
            return self.visit_children(node);
        };
        self.visit_field_node(node, "type");
        self.visit_field_node(node, "value");
        let ty = node
            .child_by_field_name("type")
            .map(|t| self.text(t).to_string());
        self.declare(self.text(name), Local::Var(ty));
    }

    fn visit_lambda(&mut self, node: Node) {
        self.scoped(|c| {
            if let Some(params) = node.child_by_field_name("parameters") {
                match params.kind() {
                    "identifier" => c.declare(c.text(params), Local::Var(None)),
                    "inferred_parameters" => {
                        for p in named_children(params) {
                            c.declare(c.text(p), Local::Var(None));
                        }
                    }
                    _ => c.visit(params),
                }
            }
            c.visit_field_node(node, "body");
        });
    }

    fn visit_enhanced_for(&mut self, node: Node) {
        self.scoped(|c| {
            c.visit_field_node(node, "type");
            c.visit_field_node(node, "value");
            if let Some(name) = node.child_by_field_name("name") {
                let ty = node
                    .child_by_field_name("type")
                    .map(|t| c.text(t).to_string());
                c.declare(c.text(name), Local::Var(ty));
            }
            c.visit_field_node(node, "body");
        });
    }

    fn visit_anonymous_body(&mut self, body: Node) {
        self.anonymous_depth += 1;
        self.scoped(|c| c.visit_children(body));
        self.anonymous_depth -= 1;
    }

    // ---- occurrences ----

    fn record(&mut self, anchor: Node, kind: MatchKind, target: RawTarget) {
        self.occurrences.push(RawOccurrence {
            offset: anchor.start_byte(),
            length: anchor.end_byte() - anchor.start_byte(),
            kind,
            target,
            enclosing: self.decls.last().copied(),
            enclosing_types: self.chain.clone(),
        });
    }

    fn visit_object_creation(&mut self, node: Node) {
        if let Some(ty) = node.child_by_field_name("type") {
            let arity = argument_count(node.child_by_field_name("arguments"));
            let anchor = type_name_anchor(ty);
            self.record(
                anchor,
                MatchKind::Reference,
                RawTarget::Constructor {
                    type_name: erase_type(self.text(ty)),
                    arity,
                },
            );
        }
        for child in named_children(node) {
            match child.kind() {
                "class_body" => self.visit_anonymous_body(child),
                _ => self.visit(child),
            }
        }
    }

    fn visit_explicit_constructor(&mut self, node: Node) {
        let arity = argument_count(node.child_by_field_name("arguments"));
        if let (Some(ctor), Some(type_id)) =
            (node.child_by_field_name("constructor"), self.types.last())
        {
            if ctor.kind() == "this" {
                let simple = type_id.rsplit('.').next().unwrap_or(type_id).to_string();
                self.record(
                    ctor,
                    MatchKind::Reference,
                    RawTarget::Constructor {
                        type_name: simple,
                        arity,
                    },
                );
            }
        }
        self.visit_field_node(node, "object");
        self.visit_field_node(node, "arguments");
    }

    fn visit_method_invocation(&mut self, node: Node) {
        let object = node.child_by_field_name("object");
        if let Some(name) = node.child_by_field_name("name") {
            let receiver = self.receiver_of(object);
            let arity = argument_count(node.child_by_field_name("arguments"));
            self.record(
                name,
                MatchKind::Reference,
                RawTarget::Method {
                    name: self.text(name).to_string(),
                    arity,
                    receiver,
                },
            );
        }
        if let Some(object) = object {
            self.visit(object);
        }
        self.visit_field_node(node, "type_arguments");
        self.visit_field_node(node, "arguments");
    }

    fn visit_method_reference(&mut self, node: Node) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        let Some(qualifier) = children.first().copied() else {
            return;
        };
        let after_colons = children
            .iter()
            .skip_while(|c| c.kind() != "::")
            .skip(1)
            .find(|c| matches!(c.kind(), "identifier" | "new"));

        if let Some(member) = after_colons {
            let receiver = match qualifier.kind() {
                "type_identifier" | "scoped_type_identifier" | "generic_type" | "array_type" => {
                    Receiver::Type(erase_type(self.text(qualifier)))
                }
                _ => self.receiver_of(Some(qualifier)),
            };
            self.record(
                *member,
                MatchKind::MethodReference,
                RawTarget::MethodRef {
                    name: self.text(*member).to_string(),
                    receiver,
                },
            );
        }
        for child in named_children(node) {
            if child.id() == qualifier.id() || child.kind() == "type_arguments" {
                self.visit(child);
            }
        }
    }

    fn visit_field_access(&mut self, node: Node) {
        let object = node.child_by_field_name("object");
        if let Some(field) = node.child_by_field_name("field") {
            let receiver = self.receiver_of(object);
            self.record(
                field,
                access_kind(node, self.source),
                RawTarget::Field {
                    name: self.text(field).to_string(),
                    receiver,
                },
            );
        }
        if let Some(object) = object {
            self.visit(object);
        }
    }

    fn visit_annotation(&mut self, node: Node) {
        if let Some(name) = node.child_by_field_name("name") {
            let anchor = match name.kind() {
                "scoped_identifier" => name.child_by_field_name("name").unwrap_or(name),
                _ => name,
            };
            self.record(
                anchor,
                MatchKind::Annotation,
                RawTarget::Type {
                    name: self.text(name).to_string(),
                },
            );
        }
        self.visit_field_node(node, "arguments");
    }

    fn visit_identifier(&mut self, node: Node) {
        let Some(parent) = node.parent() else {
            return;
        };
        let kind = parent.kind();
        let naming = NAMING_PARENTS.contains(&kind)
            || (matches!(
                kind,
                "variable_declarator"
                    | "enhanced_for_statement"
                    | "resource"
                    | "instanceof_expression"
            ) && is_field(node, "name"))
            || (kind == "lambda_expression" && is_field(node, "parameters"))
            || (kind == "element_value_pair" && is_field(node, "key"));
        if naming {
            return;
        }

        let name = self.text(node);
        if self.local(name).is_some() {
            return;
        }
        self.record(
            node,
            access_kind(node, self.source),
            RawTarget::Name {
                name: name.to_string(),
            },
        );
    }

    fn visit_type_identifier(&mut self, node: Node) {
        if node.parent().is_some_and(|p| p.kind() == "scoped_type_identifier") {
            return;
        }
        let name = self.text(node);
        if name == "var" || matches!(self.local(name), Some(Local::TypeParam)) {
            return;
        }
        self.record(
            node,
            type_context(node),
            RawTarget::Type {
                name: name.to_string(),
            },
        );
    }

    fn visit_scoped_type(&mut self, node: Node) {
        if node.parent().is_some_and(|p| p.kind() == "scoped_type_identifier") {
            return;
        }
        let anchor = type_name_anchor(node);
        self.record(
            anchor,
            type_context(node),
            RawTarget::Type {
                name: erase_type(self.text(node)),
            },
        );
        // arguments of a generic qualifier, `Outer<T>.Inner`
        for child in named_children(node) {
            if child.kind() == "generic_type" {
                for grandchild in named_children(child) {
                    if grandchild.kind() == "type_arguments" {
                        self.visit(grandchild);
                    }
                }
            }
        }
    }

    fn receiver_of(&self, object: Option<Node>) -> Receiver {
        let Some(object) = object else {
            return Receiver::Implicit;
        };
        match object.kind() {
            "this" => Receiver::This,
            "super" => Receiver::Super,
            "identifier" => {
                let name = self.text(object);
                match self.local(name) {
                    Some(Local::Var(Some(ty))) => Receiver::Type(erase_type(ty)),
                    Some(_) => Receiver::Unknown,
                    None => Receiver::Name(name.to_string()),
                }
            }
            "field_access" => match (
                object.child_by_field_name("object").map(|o| o.kind()),
                object.child_by_field_name("field"),
            ) {
                (Some("this"), Some(field)) => Receiver::Name(self.text(field).to_string()),
                _ => Receiver::Unknown,
            },
            "type_identifier" | "scoped_type_identifier" | "generic_type" => {
                Receiver::Type(erase_type(self.text(object)))
            }
            "object_creation_expression" => object
                .child_by_field_name("type")
                .map(|t| Receiver::Type(erase_type(self.text(t))))
                .unwrap_or(Receiver::Unknown),
            "parenthesized_expression" => {
                let inner = named_children(object).into_iter().next();
                match inner {
                    Some(cast) if cast.kind() == "cast_expression" => cast
                        .child_by_field_name("type")
                        .map(|t| Receiver::Type(erase_type(self.text(t))))
                        .unwrap_or(Receiver::Unknown),
                    _ => Receiver::Unknown,
                }
            }
            _ => Receiver::Unknown,
        }
    }
}

/// Type of a `spread_parameter`: its first named child that is not a modifier
/// or the declarator.
fn spread_type(param: Node) -> Option<Node> {
    named_children(param).into_iter().find(|c| {
        !matches!(
            c.kind(),
            "modifiers" | "variable_declarator" | "marker_annotation" | "annotation"
        )
    })
}

/// The simple-name token of a type expression: `Foo` in `Foo`, `a.b.Foo`,
/// `Foo<T>` and `Foo[]`.
fn type_name_anchor(ty: Node) -> Node {
    match ty.kind() {
        "generic_type" | "array_type" | "annotated_type" => named_children(ty)
            .into_iter()
            .find(|c| {
                matches!(
                    c.kind(),
                    "type_identifier" | "scoped_type_identifier" | "generic_type"
                )
            })
            .map(type_name_anchor)
            .unwrap_or(ty),
        "scoped_type_identifier" => named_children(ty)
            .into_iter()
            .rev()
            .find(|c| c.kind() == "type_identifier")
            .unwrap_or(ty),
        _ => ty,
    }
}

/// Classifies a type use by the syntactic slot it fills.
fn type_context(node: Node) -> MatchKind {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "scoped_type_identifier" | "array_type" | "annotated_type" => current = parent,
            "generic_type" if current.kind() != "type_arguments" => current = parent,
            "object_creation_expression" if is_field(current, "type") => {
                return MatchKind::Instantiation;
            }
            "cast_expression" if is_field(current, "type") => return MatchKind::Cast,
            "instanceof_expression" if is_field(current, "right") => return MatchKind::Instanceof,
            "record_pattern" | "type_pattern" => return MatchKind::Instanceof,
            "throws" => return MatchKind::ThrowsClause,
            "catch_type" => return MatchKind::CatchClause,
            "type_arguments" | "wildcard" => return MatchKind::TypeArgument,
            "superclass" => return MatchKind::Implementation,
            "type_list"
                if parent
                    .parent()
                    .is_some_and(|g| matches!(g.kind(), "super_interfaces" | "extends_interfaces")) =>
            {
                return MatchKind::Implementation;
            }
            _ => return MatchKind::Reference,
        }
    }
    MatchKind::Reference
}

/// Read, write or both, for a variable or field access node.
fn access_kind(node: Node, source: &str) -> MatchKind {
    let Some(parent) = node.parent() else {
        return MatchKind::Read;
    };
    match parent.kind() {
        "assignment_expression" if is_field(node, "left") => {
            let operator = parent
                .child_by_field_name("operator")
                .map(|op| text(op, source))
                .unwrap_or("=");
            if operator == "=" {
                MatchKind::Write
            } else {
                MatchKind::ReadWrite
            }
        }
        "update_expression" => MatchKind::ReadWrite,
        _ => MatchKind::Read,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str) -> UnitFacts {
        collect_unit(
            &JavaSyntax::new(),
            CompilationUnitHandle::new("/ws/A.java"),
            Arc::from(source),
            0,
        )
    }

    fn ids(facts: &UnitFacts) -> Vec<&str> {
        facts.declarations.iter().map(|d| d.id()).collect()
    }

    fn kinds_of(facts: &UnitFacts, name: &str) -> Vec<MatchKind> {
        facts
            .occurrences
            .iter()
            .filter(|o| match &o.target {
                RawTarget::Type { name: n } | RawTarget::Name { name: n } => n == name,
                RawTarget::Field { name: n, .. } | RawTarget::Method { name: n, .. } => n == name,
                _ => false,
            })
            .map(|o| o.kind)
            .collect()
    }

    #[test]
    fn test_declaration_ids() {
        let facts = collect(
            r#"
package com.acme;
import java.util.*;
public class Calculator<T> extends Base implements Api {
    private int total, count;
    public Calculator(int start) {}
    public int add(int a, java.util.List<String> b, String... rest) { return a; }
    static class Inner { void run() {} }
    enum Mode { FAST, SLOW }
}
"#,
        );
        assert_eq!(facts.package, "com.acme");
        assert_eq!(
            facts.imports,
            vec![Import {
                path: "java.util".into(),
                on_demand: true,
                is_static: false
            }]
        );
        assert_eq!(
            ids(&facts),
            vec![
                "com.acme.Calculator",
                "com.acme.Calculator#total",
                "com.acme.Calculator#count",
                "com.acme.Calculator#Calculator(int)",
                "com.acme.Calculator#add(int,List,String[])",
                "com.acme.Calculator.Inner",
                "com.acme.Calculator.Inner#run()",
                "com.acme.Calculator.Mode",
                "com.acme.Calculator.Mode#FAST",
                "com.acme.Calculator.Mode#SLOW",
            ]
        );
        let calc = &facts.declarations[0];
        assert_eq!(calc.super_texts, vec!["Base", "Api"]);
        let add = &facts.declarations[4];
        assert_eq!(add.arity, 3);
        assert!(add.varargs);
        let inner = &facts.declarations[5];
        assert_eq!(inner.super_texts, vec!["java.lang.Object"]);
        assert_eq!(inner.handle.declaring_type.as_deref(), Some("com.acme.Calculator"));
    }

    #[test]
    fn test_type_contexts() {
        let facts = collect(
            r#"
class A {
    @Marker
    void f(Object o) throws IoProblem {
        Foo f = new Foo();
        Foo g = (Foo) o;
        if (o instanceof Foo) {}
        java.util.List<Foo> list = null;
        try { } catch (Broken e) { }
    }
}
"#,
        );
        assert_eq!(kinds_of(&facts, "Marker"), vec![MatchKind::Annotation]);
        assert_eq!(kinds_of(&facts, "IoProblem"), vec![MatchKind::ThrowsClause]);
        assert_eq!(kinds_of(&facts, "Broken"), vec![MatchKind::CatchClause]);
        assert_eq!(
            kinds_of(&facts, "Foo"),
            vec![
                MatchKind::Reference,
                MatchKind::Instantiation,
                MatchKind::Reference,
                MatchKind::Cast,
                MatchKind::Instanceof,
                MatchKind::TypeArgument,
            ]
        );
        assert_eq!(kinds_of(&facts, "java.util.List"), vec![MatchKind::Reference]);
    }

    #[test]
    fn test_access_kinds_and_local_shadowing() {
        let facts = collect(
            r#"
class Counter {
    int value;
    void a() { value = 1; }
    void b() { value += 2; this.value++; }
    int c() { return value; }
    void d(int value) { value = 3; }
    void e() { int value = 0; value = 4; }
}
"#,
        );
        assert_eq!(
            kinds_of(&facts, "value"),
            vec![
                MatchKind::Write,
                MatchKind::ReadWrite,
                MatchKind::ReadWrite,
                MatchKind::Read,
            ]
        );
    }

    #[test]
    fn test_method_calls_record_arity_and_receiver() {
        let facts = collect(
            r#"
class A {
    void f(Service s) {
        s.run(1, /* two */ 2);
        helper();
        Util.check(s);
        Runnable r = this::helper;
    }
}
"#,
        );
        let targets: Vec<&RawTarget> = facts.occurrences.iter().map(|o| &o.target).collect();
        assert!(targets.contains(&&RawTarget::Method {
            name: "run".into(),
            arity: 2,
            receiver: Receiver::Type("Service".into())
        }));
        assert!(targets.contains(&&RawTarget::Method {
            name: "helper".into(),
            arity: 0,
            receiver: Receiver::Implicit
        }));
        assert!(targets.contains(&&RawTarget::Method {
            name: "check".into(),
            arity: 1,
            receiver: Receiver::Name("Util".into())
        }));
        assert!(targets.contains(&&RawTarget::MethodRef {
            name: "helper".into(),
            receiver: Receiver::This
        }));
    }
}
