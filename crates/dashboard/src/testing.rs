//! In-memory backends shared by the controller tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use core_types::{
    AccessToken, AddUrlRequest, AgentType, ApiError, ApiResult, Chat, ConfirmUploadRequest,
    DocumentRecord, NewChat, NewProject, ObjectStore, Project, ProjectBackend, ProjectSettings,
    RagStrategy, SettingsUpdate, SourceKind, TransferProgress, UploadBackend, UploadFile,
    UploadUrlRequest, WriteLocation,
};
use parking_lot::Mutex;

pub fn record(id: &str, filename: &str, status: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        filename: Some(filename.to_string()),
        s3_key: None,
        file_size: None,
        file_type: None,
        source_type: None,
        source_url: None,
        processing_status: Some(status.to_string()),
        created_at: Some("2024-05-01T10:00:00Z".to_string()),
    }
}

pub fn settings(project_id: &str) -> ProjectSettings {
    ProjectSettings {
        id: "s1".to_string(),
        project_id: project_id.to_string(),
        embedding_model: "text-embedding-3-large".to_string(),
        rag_strategy: RagStrategy::Basic,
        agent_type: AgentType::Simple,
        chunks_per_search: 10,
        final_context_size: 5,
        similarity_threshold: 0.3,
        number_of_queries: 5,
        reranking_enabled: true,
        reranking_model: "rerank-english-v3.0".to_string(),
        vector_weight: 0.7,
        keyword_weight: 0.3,
        created_at: None,
    }
}

#[derive(Default)]
struct State {
    calls: usize,
    fail_next: Option<ApiError>,
    failing: HashMap<&'static str, ApiError>,
    sources: Vec<DocumentRecord>,
    chats: Vec<Chat>,
    settings: Option<ProjectSettings>,
}

/// Scripted `ProjectBackend` around projects `p1` and `p2`, which share one
/// source list.
#[derive(Default)]
pub struct FakeProjects {
    state: Mutex<State>,
}

impl FakeProjects {
    pub fn with_sources(sources: Vec<DocumentRecord>) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock();
            state.sources = sources;
            state.settings = Some(settings("p1"));
        }
        fake
    }

    pub fn project(&self) -> Project {
        self.project_with_id("p1")
    }

    fn project_with_id(&self, id: &str) -> Project {
        Project {
            id: id.to_string(),
            name: if id == "p1" { "Alpha" } else { "Beta" }.to_string(),
            description: None,
            owner_id: "user_1".to_string(),
            created_at: Some("2024-05-01T10:00:00Z".to_string()),
            updated_at: None,
            project_settings: vec![settings(id)],
        }
    }

    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    pub fn fail_next(&self, err: ApiError) {
        self.state.lock().fail_next = Some(err);
    }

    pub fn fail(&self, route: &'static str, err: ApiError) {
        self.state.lock().failing.insert(route, err);
    }

    pub fn clear_failure(&self, route: &'static str) {
        self.state.lock().failing.remove(route);
    }

    pub fn set_status(&self, document_id: &str, status: &str) {
        let mut state = self.state.lock();
        if let Some(record) = state.sources.iter_mut().find(|r| r.id == document_id) {
            record.processing_status = Some(status.to_string());
        }
    }

    fn enter(&self, route: &'static str) -> ApiResult<()> {
        let mut state = self.state.lock();
        state.calls += 1;
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        match state.failing.get(route) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProjectBackend for FakeProjects {
    async fn list_projects(&self, _token: &AccessToken) -> ApiResult<Vec<Project>> {
        self.enter("list_projects")?;
        Ok(vec![self.project()])
    }

    async fn get_project(&self, _token: &AccessToken, project_id: &str) -> ApiResult<Project> {
        self.enter("get_project")?;
        if project_id != "p1" && project_id != "p2" {
            return Err(ApiError::Rejected {
                status: 404,
                detail: "Project not found".to_string(),
            });
        }
        Ok(self.project_with_id(project_id))
    }

    async fn create_project(
        &self,
        _token: &AccessToken,
        project: &NewProject,
    ) -> ApiResult<Project> {
        self.enter("create_project")?;
        Ok(Project {
            id: "p-new".to_string(),
            name: project.name.clone(),
            description: Some(project.description.clone()),
            owner_id: "user_1".to_string(),
            created_at: Some("2024-05-01T12:00:00Z".to_string()),
            updated_at: None,
            project_settings: Vec::new(),
        })
    }

    async fn delete_project(&self, _token: &AccessToken, _project_id: &str) -> ApiResult<()> {
        self.enter("delete_project")
    }

    async fn list_sources(
        &self,
        _token: &AccessToken,
        _project_id: &str,
    ) -> ApiResult<Vec<DocumentRecord>> {
        self.enter("list_sources")?;
        Ok(self.state.lock().sources.clone())
    }

    async fn add_url(
        &self,
        _token: &AccessToken,
        _project_id: &str,
        request: &AddUrlRequest,
    ) -> ApiResult<DocumentRecord> {
        self.enter("add_url")?;
        let mut created = record("d-url", "example.com", "queued");
        created.source_type = Some(SourceKind::Url);
        created.source_url = Some(request.url.clone());
        self.state.lock().sources.push(created.clone());
        Ok(created)
    }

    async fn delete_source(
        &self,
        _token: &AccessToken,
        _project_id: &str,
        document_id: &str,
    ) -> ApiResult<()> {
        self.enter("delete_source")?;
        self.state.lock().sources.retain(|r| r.id != document_id);
        Ok(())
    }

    async fn get_settings(
        &self,
        _token: &AccessToken,
        _project_id: &str,
    ) -> ApiResult<ProjectSettings> {
        self.enter("get_settings")?;
        self.state.lock().settings.clone().ok_or(ApiError::Rejected {
            status: 404,
            detail: "Settings not found".to_string(),
        })
    }

    async fn update_settings(
        &self,
        _token: &AccessToken,
        project_id: &str,
        update: &SettingsUpdate,
    ) -> ApiResult<ProjectSettings> {
        self.enter("update_settings")?;
        let mut saved = settings(project_id);
        saved.embedding_model = update.embedding_model.clone();
        saved.rag_strategy = update.rag_strategy;
        saved.agent_type = update.agent_type;
        saved.chunks_per_search = update.chunks_per_search;
        saved.final_context_size = update.final_context_size;
        saved.similarity_threshold = update.similarity_threshold;
        saved.number_of_queries = update.number_of_queries;
        saved.reranking_enabled = update.reranking_enabled;
        saved.reranking_model = update.reranking_model.clone();
        saved.vector_weight = update.vector_weight;
        saved.keyword_weight = update.keyword_weight;
        self.state.lock().settings = Some(saved.clone());
        Ok(saved)
    }

    async fn list_chats(&self, _token: &AccessToken, _project_id: &str) -> ApiResult<Vec<Chat>> {
        self.enter("list_chats")?;
        Ok(self.state.lock().chats.clone())
    }

    async fn create_chat(&self, _token: &AccessToken, chat: &NewChat) -> ApiResult<Chat> {
        self.enter("create_chat")?;
        let mut state = self.state.lock();
        let created = Chat {
            id: format!("c{}", state.chats.len() + 1),
            title: chat.title.clone(),
            project_id: chat.project_id.clone(),
            owner_id: "user_1".to_string(),
            created_at: Some("2024-05-02T09:00:00Z".to_string()),
        };
        state.chats.push(created.clone());
        Ok(created)
    }

    async fn delete_chat(&self, _token: &AccessToken, chat_id: &str) -> ApiResult<()> {
        self.enter("delete_chat")?;
        self.state.lock().chats.retain(|chat| chat.id != chat_id);
        Ok(())
    }
}

/// Upload backend plus object store that settle after `delay`, failing the
/// transfer of any file named in `reject`.
#[derive(Default)]
pub struct FakeUploads {
    pub delay: Duration,
    pub reject: HashSet<String>,
}

#[async_trait]
impl UploadBackend for FakeUploads {
    async fn request_write_location(
        &self,
        _token: &AccessToken,
        project_id: &str,
        request: &UploadUrlRequest,
    ) -> ApiResult<WriteLocation> {
        let s3_key = format!("{project_id}/{}", request.file_name);
        Ok(WriteLocation {
            upload_url: format!("https://bucket.test/{s3_key}"),
            s3_key,
            document: record(&format!("doc-{}", request.file_name), &request.file_name, "uploading"),
        })
    }

    async fn confirm_upload(
        &self,
        _token: &AccessToken,
        project_id: &str,
        request: &ConfirmUploadRequest,
    ) -> ApiResult<DocumentRecord> {
        let file_name = request
            .s3_key
            .strip_prefix(&format!("{project_id}/"))
            .unwrap_or(&request.s3_key);
        Ok(record(&format!("doc-{file_name}"), file_name, "queued"))
    }
}

#[async_trait]
impl ObjectStore for FakeUploads {
    async fn put_object(
        &self,
        _location: &WriteLocation,
        file: &UploadFile,
        progress: &dyn TransferProgress,
    ) -> ApiResult<()> {
        tokio::time::sleep(self.delay).await;
        if self.reject.contains(&file.name) {
            return Err(ApiError::Transport("connection reset".to_string()));
        }
        progress.on_bytes_sent(file.size(), file.size());
        Ok(())
    }
}
