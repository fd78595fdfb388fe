use std::time::Duration;

use async_trait::async_trait;
use core_types::{
    AccessToken, AddUrlRequest, ApiError, ApiResult, Chat, ConfirmUploadRequest, DocumentRecord,
    Envelope, NewChat, NewProject, Project, ProjectBackend, ProjectSettings, SettingsUpdate,
    UploadBackend, UploadUrlRequest, WriteLocation,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

mod object_store;

pub use object_store::{DEFAULT_CHUNK_SIZE, HttpObjectStore};

/// REST client for the project backend. Every call carries the caller's
/// bearer token; responses are `{status, message, data}` envelopes.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_request_timeout(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: &AccessToken) -> ApiResult<RequestBuilder> {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "backend request");
        Ok(self.client.request(method, url).headers(bearer(token)?))
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str, token: &AccessToken) -> ApiResult<T> {
        let request = self.request(Method::GET, path, token)?;
        unwrap_envelope(send(request).await?)
    }

    async fn send_data<B, T>(
        &self,
        method: Method,
        path: &str,
        token: &AccessToken,
        body: &B,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(method, path, token)?.json(body);
        unwrap_envelope(send(request).await?)
    }

    async fn delete(&self, path: &str, token: &AccessToken) -> ApiResult<()> {
        let request = self.request(Method::DELETE, path, token)?;
        send(request).await.map(drop)
    }
}

#[async_trait]
impl UploadBackend for HttpBackend {
    async fn request_write_location(
        &self,
        token: &AccessToken,
        project_id: &str,
        request: &UploadUrlRequest,
    ) -> ApiResult<WriteLocation> {
        let path = format!("/api/projects/{project_id}/files/upload-url");
        let builder = self.request(Method::POST, &path, token)?.json(request);
        // The write location sits at the top level next to `data`.
        decode(&send(builder).await?)
    }

    async fn confirm_upload(
        &self,
        token: &AccessToken,
        project_id: &str,
        request: &ConfirmUploadRequest,
    ) -> ApiResult<DocumentRecord> {
        let path = format!("/api/projects/{project_id}/files/confirm");
        self.send_data(Method::POST, &path, token, request).await
    }
}

#[async_trait]
impl ProjectBackend for HttpBackend {
    async fn list_projects(&self, token: &AccessToken) -> ApiResult<Vec<Project>> {
        self.get_data("/api/projects", token).await
    }

    async fn get_project(&self, token: &AccessToken, project_id: &str) -> ApiResult<Project> {
        self.get_data(&format!("/api/projects/{project_id}"), token)
            .await
    }

    async fn create_project(
        &self,
        token: &AccessToken,
        project: &NewProject,
    ) -> ApiResult<Project> {
        let created: Vec<Project> = self
            .send_data(Method::POST, "/api/projects", token, project)
            .await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Decode("project create returned no rows".to_string()))
    }

    async fn delete_project(&self, token: &AccessToken, project_id: &str) -> ApiResult<()> {
        self.delete(&format!("/api/projects/{project_id}"), token)
            .await
    }

    async fn list_sources(
        &self,
        token: &AccessToken,
        project_id: &str,
    ) -> ApiResult<Vec<DocumentRecord>> {
        self.get_data(&format!("/api/projects/{project_id}/files"), token)
            .await
    }

    async fn add_url(
        &self,
        token: &AccessToken,
        project_id: &str,
        request: &AddUrlRequest,
    ) -> ApiResult<DocumentRecord> {
        let path = format!("/api/projects/{project_id}/urls");
        self.send_data(Method::POST, &path, token, request).await
    }

    async fn delete_source(
        &self,
        token: &AccessToken,
        project_id: &str,
        document_id: &str,
    ) -> ApiResult<()> {
        self.delete(
            &format!("/api/projects/{project_id}/files/{document_id}"),
            token,
        )
        .await
    }

    async fn get_settings(
        &self,
        token: &AccessToken,
        project_id: &str,
    ) -> ApiResult<ProjectSettings> {
        self.get_data(&format!("/api/projects/{project_id}/settings"), token)
            .await
    }

    async fn update_settings(
        &self,
        token: &AccessToken,
        project_id: &str,
        update: &SettingsUpdate,
    ) -> ApiResult<ProjectSettings> {
        let path = format!("/api/projects/{project_id}/settings");
        self.send_data(Method::PUT, &path, token, update).await
    }

    async fn list_chats(&self, token: &AccessToken, project_id: &str) -> ApiResult<Vec<Chat>> {
        self.get_data(&format!("/api/projects/{project_id}/chats"), token)
            .await
    }

    async fn create_chat(&self, token: &AccessToken, chat: &NewChat) -> ApiResult<Chat> {
        self.send_data(Method::POST, "/api/chats", token, chat)
            .await
    }

    async fn delete_chat(&self, token: &AccessToken, chat_id: &str) -> ApiResult<()> {
        self.delete(&format!("/api/chats/{chat_id}"), token).await
    }
}

fn bearer(token: &AccessToken) -> ApiResult<HeaderMap> {
    if token.is_empty() {
        return Err(ApiError::MissingCredential);
    }
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
        .map_err(|_| ApiError::MissingCredential)?;
    headers.insert(reqwest::header::AUTHORIZATION, value);
    Ok(headers)
}

/// Sends the request and returns the body of a 2xx response. Any other
/// status becomes `ApiError::Rejected` carrying the server's `detail`.
async fn send(request: RequestBuilder) -> ApiResult<String> {
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    let text = response.text().await.map_err(transport)?;
    if !status.is_success() {
        debug!(%status, body = %text, "backend rejected request");
        return Err(ApiError::from_error_body(status.as_u16(), &text));
    }
    Ok(text)
}

fn decode<T: DeserializeOwned>(text: &str) -> ApiResult<T> {
    serde_json::from_str(text).map_err(|err| ApiError::Decode(err.to_string()))
}

fn unwrap_envelope<T: DeserializeOwned>(text: String) -> ApiResult<T> {
    decode::<Envelope<T>>(&text).map(|envelope| envelope.data)
}

pub(crate) fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}
