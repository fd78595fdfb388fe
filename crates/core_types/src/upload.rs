use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::source::DocumentRecord;
use crate::{DocumentId, ProjectId};

pub type TaskKey = Uuid;
pub type BatchId = Uuid;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A file selected for upload. The bytes are shared, never copied, for the
/// lifetime of every task that references them.
#[derive(Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    data: Arc<[u8]>,
}

impl UploadFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        let name = name.into();
        let mut content_type = content_type.into();
        if content_type.trim().is_empty() {
            content_type = guess_content_type(&name);
        }
        Self {
            name,
            content_type,
            data: data.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = guess_content_type(&name);
        Ok(Self::new(name, content_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

pub fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

/// Step of the three-step upload protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    WriteLocation,
    Transfer,
    Confirmation,
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::WriteLocation => "requesting upload location",
            Self::Transfer => "transferring bytes",
            Self::Confirmation => "confirming upload",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    Pending,
    Uploading,
    Succeeded,
    Failed { step: UploadStep, detail: String },
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Uploading => 1,
            Self::Succeeded | Self::Failed { .. } => 2,
        }
    }
}

/// One file of a submitted batch.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub key: TaskKey,
    pub batch_id: BatchId,
    pub project_id: ProjectId,
    pub file: UploadFile,
    progress: u8,
    state: UploadState,
    remote_document_id: Option<DocumentId>,
}

impl UploadTask {
    pub fn new(batch_id: BatchId, project_id: impl Into<ProjectId>, file: UploadFile) -> Self {
        Self {
            key: Uuid::new_v4(),
            batch_id,
            project_id: project_id.into(),
            file,
            progress: 0,
            state: UploadState::Pending,
            remote_document_id: None,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn remote_document_id(&self) -> Option<&str> {
        self.remote_document_id.as_deref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.state {
            UploadState::Failed { detail, .. } => Some(detail),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    /// The backend issued a write location: `Pending -> Uploading`.
    pub fn begin_transfer(&mut self, document_id: DocumentId) -> bool {
        if !self.advance(UploadState::Uploading) {
            return false;
        }
        self.remote_document_id = Some(document_id);
        true
    }

    /// Applies a transfer progress event. Returns `true` when the visible
    /// percentage changed. Progress stays below 100 until the backend has
    /// confirmed the upload.
    pub fn record_progress(&mut self, sent: u64, total: u64) -> bool {
        if self.state != UploadState::Uploading {
            return false;
        }
        let percent = transfer_percent(sent, total);
        if percent <= self.progress {
            return false;
        }
        self.progress = percent;
        true
    }

    pub fn succeed(&mut self) -> bool {
        if self.state != UploadState::Uploading || !self.advance(UploadState::Succeeded) {
            return false;
        }
        self.progress = 100;
        true
    }

    pub fn fail(&mut self, step: UploadStep, detail: impl Into<String>) -> bool {
        self.advance(UploadState::Failed {
            step,
            detail: detail.into(),
        })
    }

    fn advance(&mut self, next: UploadState) -> bool {
        if self.state.is_terminal() || next.rank() <= self.state.rank() {
            return false;
        }
        self.state = next;
        true
    }
}

fn transfer_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (u128::from(sent.min(total)) * 100 / u128::from(total)) as u8;
    percent.min(99)
}

/// What happens to the visible ledger when a new batch is submitted while
/// rows from an earlier batch are still listed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerPolicy {
    /// Earlier rows stay listed next to the new batch.
    #[default]
    Merge,
    /// Earlier rows of the same project are cleared; their tasks keep
    /// running unobserved.
    Replace,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadUrlRequest {
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
}

impl From<&UploadFile> for UploadUrlRequest {
    fn from(file: &UploadFile) -> Self {
        Self {
            file_name: file.name.clone(),
            file_type: file.content_type.clone(),
            file_size: file.size(),
        }
    }
}

/// A time-limited write location plus the document the backend reserved
/// for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteLocation {
    #[serde(rename = "data")]
    pub upload_url: String,
    pub s3_key: String,
    pub document: DocumentRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmUploadRequest {
    pub s3_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddUrlRequest {
    pub url: String,
}
