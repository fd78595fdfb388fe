use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod project;
pub mod source;
pub mod upload;

pub use error::{ApiError, ApiResult};
pub use project::{
    AgentType, Chat, NewChat, NewProject, Project, ProjectSettings, RagStrategy, SettingsUpdate,
};
pub use source::{DocumentRecord, Source, SourceKind, parse_timestamp};
pub use upload::{
    AddUrlRequest, BatchId, ConfirmUploadRequest, LedgerPolicy, TaskKey, UploadFile, UploadState,
    UploadStep, UploadTask, UploadUrlRequest, WriteLocation, guess_content_type,
};

pub type ProjectId = String;
pub type DocumentId = String;
pub type ChatId = String;

/// Every backend response is wrapped as `{status, message, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

/// Bearer credential issued by the external auth collaborator.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// The backend endpoints the upload protocol talks to.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    async fn request_write_location(
        &self,
        token: &AccessToken,
        project_id: &str,
        request: &UploadUrlRequest,
    ) -> ApiResult<WriteLocation>;

    async fn confirm_upload(
        &self,
        token: &AccessToken,
        project_id: &str,
        request: &ConfirmUploadRequest,
    ) -> ApiResult<DocumentRecord>;
}

/// Project, source, settings and chat CRUD.
#[async_trait]
pub trait ProjectBackend: Send + Sync {
    async fn list_projects(&self, token: &AccessToken) -> ApiResult<Vec<Project>>;
    async fn get_project(&self, token: &AccessToken, project_id: &str) -> ApiResult<Project>;
    async fn create_project(&self, token: &AccessToken, project: &NewProject)
    -> ApiResult<Project>;
    async fn delete_project(&self, token: &AccessToken, project_id: &str) -> ApiResult<()>;

    async fn list_sources(&self, token: &AccessToken, project_id: &str)
    -> ApiResult<Vec<DocumentRecord>>;
    async fn add_url(
        &self,
        token: &AccessToken,
        project_id: &str,
        request: &AddUrlRequest,
    ) -> ApiResult<DocumentRecord>;
    async fn delete_source(
        &self,
        token: &AccessToken,
        project_id: &str,
        document_id: &str,
    ) -> ApiResult<()>;

    async fn get_settings(&self, token: &AccessToken, project_id: &str)
    -> ApiResult<ProjectSettings>;
    async fn update_settings(
        &self,
        token: &AccessToken,
        project_id: &str,
        update: &SettingsUpdate,
    ) -> ApiResult<ProjectSettings>;

    async fn list_chats(&self, token: &AccessToken, project_id: &str) -> ApiResult<Vec<Chat>>;
    async fn create_chat(&self, token: &AccessToken, chat: &NewChat) -> ApiResult<Chat>;
    async fn delete_chat(&self, token: &AccessToken, chat_id: &str) -> ApiResult<()>;
}

/// Receives byte-level transfer progress. Called from the transfer future,
/// possibly many times per second.
pub trait TransferProgress: Send + Sync {
    fn on_bytes_sent(&self, sent: u64, total: u64);
}

/// The storage collaborator behind a presigned write location.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        location: &WriteLocation,
        file: &UploadFile,
        progress: &dyn TransferProgress,
    ) -> ApiResult<()>;
}
