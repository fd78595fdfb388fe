use std::sync::Arc;

use core_orchestrator::{BatchHandle, OrchestratorError, TaskOutcome, UploadSink};
use core_types::{
    AccessToken, AddUrlRequest, ApiError, Chat, DocumentId, NewChat, Project, ProjectSettings,
    SettingsUpdate, Source, UploadFile, UploadTask,
};
use parking_lot::Mutex;
use pipeline::Timeline;
use tracing::{debug, error, warn};

use crate::Services;
use crate::chat::ChatSession;
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::notify::{Notification, NotificationCenter};

struct OpenSource {
    id: DocumentId,
    timeline: Timeline,
}

/// Appends confirmed uploads to the workspace's source list and reports
/// every settled task.
struct WorkspaceSink {
    sources: Arc<Mutex<Vec<Source>>>,
    notifications: Arc<NotificationCenter>,
}

impl UploadSink for WorkspaceSink {
    fn task_updated(&self, task: &UploadTask) {
        debug!(task_key = %task.key, progress = task.progress(), state = ?task.state(), "upload row changed");
    }

    fn source_confirmed(&self, source: &Source) {
        self.sources.lock().push(source.clone());
    }

    fn task_settled(&self, outcome: &TaskOutcome) {
        let notification = match outcome {
            TaskOutcome::Succeeded { file_name, .. } => {
                Notification::success(format!("{file_name} uploaded successfully"))
            }
            TaskOutcome::Failed {
                file_name, error, ..
            } => Notification::error(format!("Failed to upload {file_name}: {error}")),
        };
        self.notifications.push(notification);
    }
}

/// Everything the project page shows: sources, upload rows, the open
/// source's timeline, settings and chats.
pub struct ProjectWorkspace {
    services: Services,
    token: AccessToken,
    project: Project,
    sources: Arc<Mutex<Vec<Source>>>,
    chats: Vec<Chat>,
    settings: Option<ProjectSettings>,
    draft: Option<SettingsUpdate>,
    open: Option<OpenSource>,
}

impl ProjectWorkspace {
    /// Fetches the project, chats, sources and settings concurrently.
    ///
    /// Only the project itself is required. Missing chats or sources show as
    /// empty and missing settings fall back to the copy embedded in the
    /// project.
    pub async fn load(
        services: Services,
        token: AccessToken,
        project_id: &str,
    ) -> WorkspaceResult<Self> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(WorkspaceError::InvalidInput("Project ID is missing"));
        }

        let backend = Arc::clone(&services.backend);
        let (project, chats, sources, settings) = tokio::join!(
            backend.get_project(&token, project_id),
            backend.list_chats(&token, project_id),
            backend.list_sources(&token, project_id),
            backend.get_settings(&token, project_id),
        );

        let project = match project {
            Ok(project) => project,
            Err(err) => {
                error!(%err, project_id, "failed to fetch project");
                services.notifications.push(Notification::error(err.to_string()));
                return Err(err.into());
            }
        };
        let chats = chats.unwrap_or_else(|err| {
            warn!(%err, project_id, "failed to fetch chats, showing none");
            Vec::new()
        });
        let sources: Vec<Source> = match sources {
            Ok(records) => records.into_iter().map(Source::from_listing).collect(),
            Err(err) => {
                warn!(%err, project_id, "failed to fetch sources, showing none");
                Vec::new()
            }
        };
        let settings = match settings {
            Ok(settings) => Some(settings),
            Err(err) => {
                warn!(%err, project_id, "failed to fetch settings, using embedded copy");
                project.project_settings.first().cloned()
            }
        };

        Ok(Self {
            services,
            token,
            project,
            sources: Arc::new(Mutex::new(sources)),
            chats,
            draft: settings.as_ref().map(SettingsUpdate::from),
            settings,
            open: None,
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn sources(&self) -> Vec<Source> {
        self.sources.lock().clone()
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn settings(&self) -> Option<&ProjectSettings> {
        self.settings.as_ref()
    }

    pub fn draft(&self) -> Option<&SettingsUpdate> {
        self.draft.as_ref()
    }

    fn report(&self, err: ApiError, action: &str) -> WorkspaceError {
        error!(%err, project_id = %self.project.id, "failed to {action}");
        self.services
            .notifications
            .push(Notification::error(err.to_string()));
        err.into()
    }

    pub async fn refresh_sources(&mut self) -> WorkspaceResult<()> {
        let records = self
            .services
            .backend
            .list_sources(&self.token, &self.project.id)
            .await
            .map_err(|err| self.report(err, "fetch sources"))?;
        *self.sources.lock() = records.into_iter().map(Source::from_listing).collect();
        self.resync_open_source();
        Ok(())
    }

    pub async fn add_url(&mut self, url: &str) -> WorkspaceResult<Source> {
        let url = url.trim();
        if url.is_empty() {
            return Err(WorkspaceError::InvalidInput("Please enter a valid URL"));
        }
        let request = AddUrlRequest {
            url: url.to_string(),
        };
        let record = self
            .services
            .backend
            .add_url(&self.token, &self.project.id, &request)
            .await
            .map_err(|err| self.report(err, "add website URL"))?;
        let source = Source::from_registered_url(record);
        self.sources.lock().push(source.clone());
        self.services
            .notifications
            .push(Notification::success("Website URL added successfully"));
        Ok(source)
    }

    pub async fn delete_source(&mut self, document_id: &str) -> WorkspaceResult<()> {
        self.services
            .backend
            .delete_source(&self.token, &self.project.id, document_id)
            .await
            .map_err(|err| self.report(err, "delete document"))?;
        self.sources.lock().retain(|source| source.id != document_id);
        if self.open_source_id() == Some(document_id) {
            self.open = None;
        }
        self.services
            .notifications
            .push(Notification::success("Document deleted successfully"));
        Ok(())
    }

    /// Starts uploading `files` unless a previous batch for this project is
    /// still running.
    pub fn upload(&self, files: Vec<UploadFile>) -> WorkspaceResult<BatchHandle> {
        let uploads = &self.services.uploads;
        if uploads.has_active_for(&self.project.id) {
            return Err(WorkspaceError::UploadsInFlight);
        }
        let sink = Arc::new(WorkspaceSink {
            sources: Arc::clone(&self.sources),
            notifications: Arc::clone(&self.services.notifications),
        });
        uploads
            .submit(&self.project.id, &self.token, files, sink)
            .map_err(|err| {
                if err == OrchestratorError::MissingCredential {
                    self.services
                        .notifications
                        .push(Notification::error(err.to_string()));
                }
                WorkspaceError::from(err)
            })
    }

    pub fn upload_rows(&self) -> Vec<UploadTask> {
        self.services.uploads.snapshot_for(&self.project.id)
    }

    /// Shows the timeline of a source, positioned at its resolved stage.
    pub fn open_source(&mut self, document_id: &str) -> WorkspaceResult<&mut Timeline> {
        let timeline = {
            let sources = self.sources.lock();
            let source = sources
                .iter()
                .find(|source| source.id == document_id)
                .ok_or_else(|| WorkspaceError::UnknownSource(document_id.to_string()))?;
            Timeline::open(source.kind, source.processing_status.as_deref())
        };
        let open = self.open.insert(OpenSource {
            id: document_id.to_string(),
            timeline,
        });
        Ok(&mut open.timeline)
    }

    pub fn open_source_id(&self) -> Option<&str> {
        self.open.as_ref().map(|open| open.id.as_str())
    }

    pub fn timeline(&self) -> Option<&Timeline> {
        self.open.as_ref().map(|open| &open.timeline)
    }

    pub fn timeline_mut(&mut self) -> Option<&mut Timeline> {
        self.open.as_mut().map(|open| &mut open.timeline)
    }

    pub fn close_source(&mut self) {
        self.open = None;
    }

    fn resync_open_source(&mut self) {
        let Some(open) = self.open.as_mut() else {
            return;
        };
        let resolved = self
            .sources
            .lock()
            .iter()
            .find(|source| source.id == open.id)
            .map(|source| Timeline::open(source.kind, source.processing_status.as_deref()));
        match resolved {
            Some(timeline) => open.timeline = timeline,
            None => self.open = None,
        }
    }

    /// The embedding model is fixed once any source has been embedded with it.
    pub fn embedding_model_locked(&self) -> bool {
        !self.sources.lock().is_empty()
    }

    /// True when `model` differs from the saved embedding model while the
    /// model is locked.
    fn changes_locked_model(&self, model: &str) -> bool {
        self.embedding_model_locked()
            && self
                .settings
                .as_ref()
                .is_some_and(|saved| saved.embedding_model != model)
    }

    pub fn edit_settings(&mut self, edit: impl FnOnce(&mut SettingsUpdate)) -> WorkspaceResult<()> {
        let mut next = self
            .draft
            .clone()
            .ok_or(WorkspaceError::SettingsUnavailable)?;
        edit(&mut next);
        if self.changes_locked_model(&next.embedding_model) {
            return Err(WorkspaceError::EmbeddingModelLocked);
        }
        self.draft = Some(next);
        Ok(())
    }

    pub fn discard_settings_edits(&mut self) {
        self.draft = self.settings.as_ref().map(SettingsUpdate::from);
    }

    /// Sends the whole draft; local settings change only when the backend
    /// accepts it. A draft that still carries a model change made before the
    /// first source arrived is refused and left for the caller to discard.
    pub async fn save_settings(&mut self) -> WorkspaceResult<&ProjectSettings> {
        let draft = self
            .draft
            .clone()
            .ok_or(WorkspaceError::SettingsUnavailable)?;
        if self.changes_locked_model(&draft.embedding_model) {
            return Err(WorkspaceError::EmbeddingModelLocked);
        }
        let saved = self
            .services
            .backend
            .update_settings(&self.token, &self.project.id, &draft)
            .await
            .map_err(|err| self.report(err, "update settings"))?;
        self.draft = Some(SettingsUpdate::from(&saved));
        self.services
            .notifications
            .push(Notification::success("Settings updated successfully"));
        Ok(self.settings.insert(saved))
    }

    pub async fn create_chat(&mut self, title: &str) -> WorkspaceResult<&Chat> {
        let title = title.trim();
        if title.is_empty() {
            return Err(WorkspaceError::InvalidInput("Please enter a chat title"));
        }
        let request = NewChat {
            title: title.to_string(),
            project_id: self.project.id.clone(),
        };
        let chat = self
            .services
            .backend
            .create_chat(&self.token, &request)
            .await
            .map_err(|err| self.report(err, "create chat"))?;
        self.chats.insert(0, chat);
        self.services
            .notifications
            .push(Notification::success("Chat created successfully"));
        Ok(&self.chats[0])
    }

    pub async fn delete_chat(&mut self, chat_id: &str) -> WorkspaceResult<()> {
        self.services
            .backend
            .delete_chat(&self.token, chat_id)
            .await
            .map_err(|err| self.report(err, "delete chat"))?;
        self.chats.retain(|chat| chat.id != chat_id);
        self.services
            .notifications
            .push(Notification::success("Chat deleted successfully"));
        Ok(())
    }

    pub fn chat_session(&self, chat_id: &str) -> Option<ChatSession> {
        self.chats
            .iter()
            .find(|chat| chat.id == chat_id)
            .map(|chat| ChatSession::new(chat.id.clone()))
    }
}
