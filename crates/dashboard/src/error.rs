use core_orchestrator::OrchestratorError;
use core_types::ApiError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Upload(#[from] OrchestratorError),
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("embedding model cannot be changed once the project has sources")]
    EmbeddingModelLocked,
    #[error("uploads from the previous batch are still running")]
    UploadsInFlight,
    #[error("source `{0}` is not in this project")]
    UnknownSource(String),
    #[error("project settings are not loaded")]
    SettingsUnavailable,
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
