use super::symbol::ElementKind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How an index hit relates to the element searched for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Declaration,
    Reference,
    Read,
    Write,
    /// Compound assignment or increment: the access both reads and writes.
    ReadWrite,
    Implementation,
    Instantiation,
    Cast,
    Instanceof,
    ThrowsClause,
    CatchClause,
    MethodReference,
    TypeArgument,
    Annotation,
}

impl MatchKind {
    pub fn is_read(&self) -> bool {
        matches!(self, MatchKind::Read | MatchKind::ReadWrite)
    }

    pub fn is_write(&self) -> bool {
        matches!(self, MatchKind::Write | MatchKind::ReadWrite)
    }
}

/// Access filter for reference searches.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    #[default]
    All,
    ReadAccesses,
    WriteAccesses,
}

/// The closed set of query shapes the tool layer can ask for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueryShape {
    Declarations,
    AllReferences,
    ReadAccesses,
    WriteAccesses,
    Implementors,
    AnnotationUsage,
    Instantiation,
    Cast,
    Instanceof,
    ThrowsClause,
    CatchClause,
    MethodReferenceExpr,
    TypeArgumentUsage,
}

impl QueryShape {
    pub const ALL: [QueryShape; 13] = [
        QueryShape::Declarations,
        QueryShape::AllReferences,
        QueryShape::ReadAccesses,
        QueryShape::WriteAccesses,
        QueryShape::Implementors,
        QueryShape::AnnotationUsage,
        QueryShape::Instantiation,
        QueryShape::Cast,
        QueryShape::Instanceof,
        QueryShape::ThrowsClause,
        QueryShape::CatchClause,
        QueryShape::MethodReferenceExpr,
        QueryShape::TypeArgumentUsage,
    ];
}

impl From<AccessMode> for QueryShape {
    fn from(mode: AccessMode) -> Self {
        match mode {
            AccessMode::All => QueryShape::AllReferences,
            AccessMode::ReadAccesses => QueryShape::ReadAccesses,
            AccessMode::WriteAccesses => QueryShape::WriteAccesses,
        }
    }
}

/// One normalized hit from an index query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct SearchMatch {
    /// Simple name of the owning element.
    pub name: String,
    pub element_id: String,
    pub element_kind: ElementKind,
    pub kind: MatchKind,
    /// Reported path: tree-relative by default, absolute when configured.
    pub path: String,
    pub offset: usize,
    pub length: usize,
    /// 0-based line of `offset`.
    pub line: usize,
    /// 0-based column of `offset`.
    pub column: usize,
    /// False when the engine could only match by name.
    pub accurate: bool,
}
