use async_trait::async_trait;
use bytes::Bytes;
use core_types::{ApiError, ApiResult, ObjectStore, TransferProgress, UploadFile, WriteLocation};
use futures::StreamExt;
use reqwest::Body;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::sync::mpsc;
use tracing::debug;

use crate::transport;

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Streams file bytes straight to a presigned write location.
///
/// No bearer token is attached; the location URL carries its own signature.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    chunk_size: usize,
}

impl Default for HttpObjectStore {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl HttpObjectStore {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put_object(
        &self,
        location: &WriteLocation,
        file: &UploadFile,
        progress: &dyn TransferProgress,
    ) -> ApiResult<()> {
        let total = file.size();
        let data = Bytes::from_owner(file.shared_bytes());
        let chunk_size = self.chunk_size;
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<u64>();

        // A chunk counts as sent once the body asks for the next one; the
        // last chunk counts once the response is in.
        let chunks = futures::stream::iter((0..data.len()).step_by(chunk_size)).map(move |start| {
            if start > 0 {
                let _ = sent_tx.send(start as u64);
            }
            let end = (start + chunk_size).min(data.len());
            Ok::<_, std::io::Error>(data.slice(start..end))
        });

        debug!(s3_key = %location.s3_key, size = total, chunk_size, "streaming object");
        let request = self
            .client
            .put(&location.upload_url)
            .header(CONTENT_TYPE, file.content_type.as_str())
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(chunks))
            .send();
        tokio::pin!(request);

        let response = loop {
            tokio::select! {
                result = &mut request => break result.map_err(transport)?,
                Some(sent) = sent_rx.recv() => progress.on_bytes_sent(sent, total),
            }
        };
        while let Ok(sent) = sent_rx.try_recv() {
            progress.on_bytes_sent(sent, total);
        }

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(%status, body = %text, "object store rejected transfer");
            return Err(ApiError::from_error_body(status.as_u16(), &text));
        }
        progress.on_bytes_sent(total, total);
        Ok(())
    }
}
