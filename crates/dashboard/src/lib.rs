//! Headless controllers behind the dashboard pages: the project directory,
//! the per-project workspace and the chat stub.

use std::sync::Arc;

use backend_http::{HttpBackend, HttpObjectStore};
use config::AppConfig;
use core_orchestrator::UploadOrchestrator;
use core_types::{AccessToken, ApiResult, ProjectBackend};
use tracing::info;

pub mod chat;
pub mod error;
pub mod format;
pub mod notify;
pub mod projects;
pub mod telemetry;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use chat::{ChatMessage, ChatRole, ChatSession};
pub use error::{WorkspaceError, WorkspaceResult};
pub use notify::{Notification, NotificationCenter, NotificationLevel};
pub use projects::ProjectDirectory;
pub use workspace::ProjectWorkspace;

/// Collaborators shared by every page of one signed-in session.
#[derive(Clone)]
pub struct Services {
    pub backend: Arc<dyn ProjectBackend>,
    pub uploads: Arc<UploadOrchestrator>,
    pub notifications: Arc<NotificationCenter>,
}

impl Services {
    pub fn new(backend: Arc<dyn ProjectBackend>, uploads: Arc<UploadOrchestrator>) -> Self {
        Self {
            backend,
            uploads,
            notifications: Arc::new(NotificationCenter::new()),
        }
    }

    /// Wires the HTTP backend, the object store and the upload pool from
    /// configuration.
    pub fn from_config(config: &AppConfig) -> ApiResult<Self> {
        let backend = Arc::new(HttpBackend::with_request_timeout(
            config.backend.base_url.as_str(),
            config.backend.request_timeout(),
        )?);
        let store = Arc::new(
            HttpObjectStore::default().with_chunk_size(config.uploads.chunk_size_bytes),
        );
        let uploads = UploadOrchestrator::new(backend.clone(), store)
            .with_max_concurrent(config.uploads.max_concurrent_uploads)
            .with_ledger_policy(config.uploads.ledger_policy);
        info!(
            base_url = backend.base_url(),
            max_concurrent = uploads.max_concurrent(),
            policy = ?uploads.ledger_policy(),
            "dashboard services ready"
        );
        Ok(Self::new(backend, Arc::new(uploads)))
    }

    pub fn directory(&self, token: AccessToken) -> ProjectDirectory {
        ProjectDirectory::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.notifications),
            token,
        )
    }

    pub async fn open_project(
        &self,
        token: AccessToken,
        project_id: &str,
    ) -> WorkspaceResult<ProjectWorkspace> {
        ProjectWorkspace::load(self.clone(), token, project_id).await
    }
}
