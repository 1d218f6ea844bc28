use std::path::PathBuf;
use stratum_api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JavaError {
    #[error("Project '{0}' already exists")]
    DuplicateProject(String),
    #[error("Project location {} is outside the workspace {}", .location.display(), .workspace.display())]
    OutsideWorkspace {
        location: PathBuf,
        workspace: PathBuf,
    },
    #[error("Invalid project name '{0}'")]
    InvalidName(String),
}

impl From<JavaError> for ApiError {
    fn from(err: JavaError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}
