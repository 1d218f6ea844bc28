//! Index records shared by the collection and binding passes.

use std::ops::Range;
use std::sync::Arc;
use stratum_api::{CompilationUnitHandle, ElementFilter, ElementHandle, MatchKind};

/// One `import` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub on_demand: bool,
    pub is_static: bool,
}

/// A declared element with everything the binder needs to resolve uses of it.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub handle: ElementHandle,
    /// Byte range of the whole declaration node.
    pub range: Range<usize>,
    /// Declared parameter count; zero for types and fields.
    pub arity: usize,
    pub varargs: bool,
    /// Field type, or method return type, as written.
    pub type_text: Option<String>,
    /// Supertype names as written (`extends`, `implements`), types only.
    pub super_texts: Vec<String>,
    /// Enclosing type chain, innermost last; used as resolution context.
    pub enclosing_types: Arc<[String]>,
    pub unit: usize,
}

impl Declaration {
    pub fn id(&self) -> &str {
        &self.handle.id
    }

    pub fn accepts_arity(&self, args: usize) -> bool {
        if self.varargs {
            args + 1 >= self.arity
        } else {
            args == self.arity
        }
    }
}

/// How the receiver of a member access was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// Bare name: resolved against the enclosing type chain.
    Implicit,
    This,
    Super,
    /// A type name as written: the declared type of a local, or a type qualifier.
    Type(String),
    /// An identifier that is not a local: a field of the enclosing chain or a type.
    Name(String),
    /// Any other expression.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTarget {
    Type { name: String },
    /// A bare identifier that is not a local: a field of the enclosing chain, else a type.
    Name { name: String },
    Field { name: String, receiver: Receiver },
    Method { name: String, arity: usize, receiver: Receiver },
    Constructor { type_name: String, arity: usize },
    /// `Receiver::name`, or `Receiver::new` for constructors.
    MethodRef { name: String, receiver: Receiver },
}

/// An occurrence as seen in one unit, before cross-unit binding.
#[derive(Debug, Clone)]
pub struct RawOccurrence {
    pub offset: usize,
    pub length: usize,
    pub kind: MatchKind,
    pub target: RawTarget,
    /// Innermost enclosing declaration (index into the unit's declarations).
    pub enclosing: Option<usize>,
    /// Enclosing type chain, innermost last.
    pub enclosing_types: Arc<[String]>,
}

/// Parse output of one compilation unit.
#[derive(Debug, Clone)]
pub struct UnitFacts {
    pub handle: CompilationUnitHandle,
    pub source: Arc<str>,
    pub package: String,
    pub imports: Vec<Import>,
    pub declarations: Vec<Declaration>,
    pub occurrences: Vec<RawOccurrence>,
}

/// A bound occurrence.
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub unit: usize,
    pub offset: usize,
    pub length: usize,
    pub kind: MatchKind,
    /// Candidate target ids; more than one only for ambiguous inaccurate matches.
    pub targets: Vec<String>,
    pub target_name: String,
    pub family: ElementFilter,
    /// Global declaration index of the enclosing element.
    pub enclosing: Option<usize>,
    pub enclosing_type: Option<String>,
    pub accurate: bool,
}

/// Strips generic arguments, array brackets, varargs dots and whitespace:
/// `Map<String, List<Foo>>[]` becomes `Map`.
pub fn erase_type(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            '[' | ']' => {}
            '.' if out.ends_with('.') => {}
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    out.trim_end_matches('.').to_string()
}

/// Parameter type as it appears inside a method id: erased, arrays kept.
pub fn signature_type(text: &str, varargs: bool) -> String {
    let dims = text.matches("[]").count() + usize::from(varargs);
    let mut base = erase_type(text);
    if let Some(simple) = base.rsplit('.').next() {
        base = simple.to_string();
    }
    base + &"[]".repeat(dims)
}
