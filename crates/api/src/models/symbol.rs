use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Package,
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
    Method,
    Constructor,
    Field,
    EnumConstant,
}

impl ElementKind {
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            ElementKind::Class
                | ElementKind::Interface
                | ElementKind::Enum
                | ElementKind::Record
                | ElementKind::Annotation
        )
    }

    pub fn is_method(&self) -> bool {
        matches!(self, ElementKind::Method | ElementKind::Constructor)
    }

    pub fn is_field(&self) -> bool {
        matches!(self, ElementKind::Field | ElementKind::EnumConstant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Package => "package",
            ElementKind::Class => "class",
            ElementKind::Interface => "interface",
            ElementKind::Enum => "enum",
            ElementKind::Record => "record",
            ElementKind::Annotation => "annotation",
            ElementKind::Method => "method",
            ElementKind::Constructor => "constructor",
            ElementKind::Field => "field",
            ElementKind::EnumConstant => "enumconstant",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrows a symbol search to one family of declarations.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElementFilter {
    Type,
    Method,
    Field,
}

impl ElementFilter {
    pub fn accepts(&self, kind: ElementKind) -> bool {
        match self {
            ElementFilter::Type => kind.is_type(),
            ElementFilter::Method => kind.is_method(),
            ElementFilter::Field => kind.is_field(),
        }
    }
}

/// Engine handle for one source file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
pub struct CompilationUnitHandle {
    /// Engine-side location of the file (inside the session workspace).
    pub path: PathBuf,
}

impl CompilationUnitHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Engine handle for one declared element.
///
/// Ids are stable strings: a type is its qualified name (`com.acme.Calculator`),
/// a field is `Type#name`, a method or constructor is `Type#name(ParamType,...)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, JsonSchema)]
pub struct ElementHandle {
    pub id: String,
    pub name: String,
    pub kind: ElementKind,
    pub declaring_type: Option<String>,
    pub unit: Option<CompilationUnitHandle>,
    pub name_offset: Option<usize>,
    pub name_length: usize,
    /// True for elements known only by name (library or runtime types).
    pub binary: bool,
}

impl ElementHandle {
    /// A type that has no source in the bound project.
    pub fn binary_type(qualified_name: &str) -> Self {
        let name = qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(qualified_name)
            .to_string();
        Self {
            id: qualified_name.to_string(),
            name,
            kind: ElementKind::Class,
            declaring_type: None,
            unit: None,
            name_offset: None,
            name_length: 0,
            binary: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct TypeHierarchy {
    pub focus: ElementHandle,
    pub supertypes: Vec<ElementHandle>,
    pub subtypes: Vec<ElementHandle>,
}
