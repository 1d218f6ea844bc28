use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A compilable directory of a source tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, JsonSchema)]
pub struct SourceRoot {
    /// Location of the directory. External (inside the source tree) until bound,
    /// then the linked location inside the session workspace.
    pub path: PathBuf,
    /// Path relative to the source tree root.
    pub relative: PathBuf,
    /// Owning module, relative to the tree root with `/` separators. Empty for the root module.
    pub module: String,
}

/// Platform runtime the bound project compiles against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, JsonSchema)]
pub struct RuntimeContainer {
    pub id: String,
    pub home: Option<PathBuf>,
    pub version: Option<String>,
}

pub const JRE_CONTAINER_ID: &str = "JRE_CONTAINER";

impl RuntimeContainer {
    pub fn unresolved() -> Self {
        Self {
            id: JRE_CONTAINER_ID.to_string(),
            home: None,
            version: None,
        }
    }
}

/// One unit of compile-visible input.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClasspathEntry {
    Container(RuntimeContainer),
    Source(SourceRoot),
    Library { path: PathBuf },
}

impl ClasspathEntry {
    pub fn library(path: impl Into<PathBuf>) -> Self {
        ClasspathEntry::Library { path: path.into() }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, ClasspathEntry::Source(_))
    }

    /// Filesystem location of the entry, if it has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ClasspathEntry::Container(c) => c.home.as_deref(),
            ClasspathEntry::Source(root) => Some(&root.path),
            ClasspathEntry::Library { path } => Some(path),
        }
    }
}
