use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Build system a source tree is driven by.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildSystemKind {
    Maven,
    Gradle,
    Unknown,
}

impl BuildSystemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildSystemKind::Maven => "MAVEN",
            BuildSystemKind::Gradle => "GRADLE",
            BuildSystemKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for BuildSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by a successful load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ProjectSummary {
    pub build_system: BuildSystemKind,
    pub source_file_count: usize,
    pub packages: Vec<String>,
    pub classpath_entry_count: usize,
}

/// Read-only metadata of the currently bound project, for status reporting.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ProjectStatus {
    pub root: PathBuf,
    pub project_name: String,
    pub build_system: BuildSystemKind,
    pub source_file_count: usize,
    pub packages: Vec<String>,
    pub classpath_entry_count: usize,
    /// Unix epoch milliseconds of the load that produced this binding.
    pub loaded_at_ms: u64,
    /// True when dependency resolution failed and the classpath is smaller than it should be.
    pub classpath_degraded: bool,
    pub session_token: String,
    pub workspace: PathBuf,
}
