pub mod engine;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use engine::{
    EngineMatch, EngineProject, PatternTarget, ProjectDescriptor, SearchCategory, SearchPattern,
    SearchScope, SemanticEngine,
};
pub use error::{ApiError, ApiResult, ErrorPayload};
pub use models::*;
