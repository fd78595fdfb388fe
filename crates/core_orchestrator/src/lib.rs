//! Runs batches of file uploads through the three-step write-location,
//! transfer, confirmation protocol and keeps the visible ledger in step.

use std::sync::Arc;

use core_types::{
    AccessToken, ApiError, BatchId, ConfirmUploadRequest, DocumentRecord, LedgerPolicy,
    ObjectStore, Source, TaskKey, TransferProgress, UploadBackend, UploadFile, UploadStep,
    UploadTask, UploadUrlRequest,
};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

mod ledger;

pub use ledger::UploadLedger;

pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("no files selected")]
    EmptyBatch,
    #[error("no project selected")]
    MissingProject,
    #[error("Authentication required")]
    MissingCredential,
}

/// Observer for everything a running batch changes outside the ledger.
///
/// Called from upload tasks; implementations must not block.
pub trait UploadSink: Send + Sync {
    /// A ledger row changed state or visible progress.
    fn task_updated(&self, _task: &UploadTask) {}

    /// The backend confirmed an upload and the project gained a source.
    fn source_confirmed(&self, source: &Source);

    /// A task reached a terminal state.
    fn task_settled(&self, _outcome: &TaskOutcome) {}
}

#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Succeeded {
        key: TaskKey,
        file_name: String,
        source: Source,
    },
    Failed {
        key: TaskKey,
        file_name: String,
        step: UploadStep,
        error: ApiError,
    },
}

impl TaskOutcome {
    pub fn key(&self) -> TaskKey {
        match self {
            Self::Succeeded { key, .. } | Self::Failed { key, .. } => *key,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            Self::Succeeded { file_name, .. } | Self::Failed { file_name, .. } => file_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Settled outcomes of one batch, in submission order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub outcomes: Vec<TaskOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }
}

/// Join handle for a submitted batch. Dropping it leaves the tasks running.
pub struct BatchHandle {
    batch_id: BatchId,
    keys: Vec<TaskKey>,
    tasks: Vec<JoinHandle<TaskOutcome>>,
}

impl BatchHandle {
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn keys(&self) -> &[TaskKey] {
        &self.keys
    }

    pub async fn wait(self) -> BatchReport {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for joined in futures::future::join_all(self.tasks).await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => error!(batch_id = %self.batch_id, %err, "upload task aborted"),
            }
        }
        BatchReport {
            batch_id: self.batch_id,
            outcomes,
        }
    }
}

pub struct UploadOrchestrator {
    backend: Arc<dyn UploadBackend>,
    store: Arc<dyn ObjectStore>,
    ledger: Arc<UploadLedger>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    policy: LedgerPolicy,
}

impl UploadOrchestrator {
    pub fn new(backend: Arc<dyn UploadBackend>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            backend,
            store,
            ledger: Arc::new(UploadLedger::new()),
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_UPLOADS)),
            max_concurrent: DEFAULT_MAX_CONCURRENT_UPLOADS,
            policy: LedgerPolicy::default(),
        }
    }

    /// Caps in-flight uploads across every batch submitted here.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self.permits = Arc::new(Semaphore::new(self.max_concurrent));
        self
    }

    pub fn with_ledger_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn ledger_policy(&self) -> LedgerPolicy {
        self.policy
    }

    pub fn ledger(&self) -> &UploadLedger {
        &self.ledger
    }

    pub fn snapshot(&self) -> Vec<UploadTask> {
        self.ledger.snapshot()
    }

    pub fn has_active(&self) -> bool {
        self.ledger.has_active()
    }

    /// Rows submitted for `project_id`, in submission order.
    pub fn snapshot_for(&self, project_id: &str) -> Vec<UploadTask> {
        self.ledger.snapshot_for(project_id)
    }

    pub fn has_active_for(&self, project_id: &str) -> bool {
        self.ledger.has_active_for(project_id)
    }

    pub fn dismiss(&self, key: TaskKey) -> bool {
        self.ledger.dismiss(key)
    }

    /// Lists one pending row per file and starts every upload.
    ///
    /// Must be called from within a tokio runtime. Rows are visible before
    /// this returns; each task then settles independently.
    pub fn submit(
        &self,
        project_id: &str,
        token: &AccessToken,
        files: Vec<UploadFile>,
        sink: Arc<dyn UploadSink>,
    ) -> Result<BatchHandle, OrchestratorError> {
        if files.is_empty() {
            return Err(OrchestratorError::EmptyBatch);
        }
        if project_id.trim().is_empty() {
            return Err(OrchestratorError::MissingProject);
        }
        if token.is_empty() {
            return Err(OrchestratorError::MissingCredential);
        }

        let batch_id = Uuid::new_v4();
        let rows: Vec<UploadTask> = files
            .into_iter()
            .map(|file| UploadTask::new(batch_id, project_id, file))
            .collect();
        self.ledger.admit(&rows, self.policy);
        info!(%batch_id, project_id, files = rows.len(), policy = ?self.policy, "upload batch submitted");

        let worker = Worker {
            backend: Arc::clone(&self.backend),
            store: Arc::clone(&self.store),
            ledger: Arc::clone(&self.ledger),
            permits: Arc::clone(&self.permits),
            sink,
            token: token.clone(),
            project_id: Arc::from(project_id),
        };

        let keys = rows.iter().map(|row| row.key).collect();
        let tasks = rows
            .into_iter()
            .map(|row| tokio::spawn(worker.clone().run(row.key, row.file)))
            .collect();

        Ok(BatchHandle {
            batch_id,
            keys,
            tasks,
        })
    }
}

#[derive(Clone)]
struct Worker {
    backend: Arc<dyn UploadBackend>,
    store: Arc<dyn ObjectStore>,
    ledger: Arc<UploadLedger>,
    permits: Arc<Semaphore>,
    sink: Arc<dyn UploadSink>,
    token: AccessToken,
    project_id: Arc<str>,
}

impl Worker {
    async fn run(self, key: TaskKey, file: UploadFile) -> TaskOutcome {
        let attempt = match self.permits.acquire().await {
            Ok(_permit) => self.attempt(key, &file).await,
            Err(_) => Err((
                UploadStep::WriteLocation,
                ApiError::Transport("upload pool closed".to_string()),
            )),
        };

        let outcome = match attempt {
            Ok(record) => {
                self.publish(self.ledger.update(key, UploadTask::succeed));
                let source = Source::from_confirmed_upload(record, &file.name);
                info!(task_key = %key, file = %file.name, document_id = %source.id, "upload confirmed");
                self.sink.source_confirmed(&source);
                TaskOutcome::Succeeded {
                    key,
                    file_name: file.name.clone(),
                    source,
                }
            }
            Err((step, error)) => {
                let detail = error.to_string();
                self.publish(self.ledger.update(key, |task| task.fail(step, detail)));
                warn!(task_key = %key, file = %file.name, %step, %error, "upload failed");
                TaskOutcome::Failed {
                    key,
                    file_name: file.name.clone(),
                    step,
                    error,
                }
            }
        };
        self.sink.task_settled(&outcome);
        outcome
    }

    async fn attempt(
        &self,
        key: TaskKey,
        file: &UploadFile,
    ) -> Result<DocumentRecord, (UploadStep, ApiError)> {
        let location = self
            .backend
            .request_write_location(&self.token, &self.project_id, &UploadUrlRequest::from(file))
            .await
            .map_err(|err| (UploadStep::WriteLocation, err))?;

        let document_id = location.document.id.clone();
        debug!(task_key = %key, %document_id, size = file.size(), "transfer started");
        self.publish(self.ledger.update(key, |task| task.begin_transfer(document_id)));

        let progress = LedgerProgress {
            ledger: &self.ledger,
            sink: self.sink.as_ref(),
            key,
        };
        self.store
            .put_object(&location, file, &progress)
            .await
            .map_err(|err| (UploadStep::Transfer, err))?;

        let confirm = ConfirmUploadRequest {
            s3_key: location.s3_key.clone(),
        };
        self.backend
            .confirm_upload(&self.token, &self.project_id, &confirm)
            .await
            .map_err(|err| (UploadStep::Confirmation, err))
    }

    fn publish(&self, changed: Option<UploadTask>) {
        if let Some(task) = changed {
            self.sink.task_updated(&task);
        }
    }
}

struct LedgerProgress<'a> {
    ledger: &'a UploadLedger,
    sink: &'a dyn UploadSink,
    key: TaskKey,
}

impl TransferProgress for LedgerProgress<'_> {
    fn on_bytes_sent(&self, sent: u64, total: u64) {
        if let Some(task) = self
            .ledger
            .update(self.key, |task| task.record_progress(sent, total))
        {
            self.sink.task_updated(&task);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use core_types::{ApiResult, UploadState, WriteLocation};
    use parking_lot::Mutex;

    use super::*;

    const KIB: usize = 1024;

    #[derive(Default)]
    struct FakeBackend {
        document_ids: HashMap<String, String>,
        reject_location: HashMap<String, ApiError>,
        reject_confirm: HashSet<String>,
    }

    impl FakeBackend {
        fn document_id(&self, file_name: &str) -> String {
            self.document_ids
                .get(file_name)
                .cloned()
                .unwrap_or_else(|| format!("doc-{file_name}"))
        }
    }

    #[async_trait]
    impl UploadBackend for FakeBackend {
        async fn request_write_location(
            &self,
            _token: &AccessToken,
            project_id: &str,
            request: &UploadUrlRequest,
        ) -> ApiResult<WriteLocation> {
            if let Some(err) = self.reject_location.get(&request.file_name) {
                return Err(err.clone());
            }
            let s3_key = format!("{project_id}/{}", request.file_name);
            Ok(WriteLocation {
                upload_url: format!("https://bucket.test/{s3_key}?sig=1"),
                s3_key: s3_key.clone(),
                document: DocumentRecord {
                    id: self.document_id(&request.file_name),
                    filename: Some(request.file_name.clone()),
                    s3_key: Some(s3_key),
                    file_size: Some(request.file_size),
                    file_type: Some(request.file_type.clone()),
                    source_type: None,
                    source_url: None,
                    processing_status: Some("uploading".to_string()),
                    created_at: None,
                },
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
                .unwrap_or(&request.s3_key)
                .to_string();
            if self.reject_confirm.contains(&file_name) {
                return Err(ApiError::Rejected {
                    status: 404,
                    detail: "Document not found".to_string(),
                });
            }
            Ok(DocumentRecord {
                id: self.document_id(&file_name),
                filename: Some(file_name),
                s3_key: Some(request.s3_key.clone()),
                file_size: None,
                file_type: None,
                source_type: None,
                source_url: None,
                processing_status: Some("queued".to_string()),
                created_at: Some("2024-05-01T10:00:00Z".to_string()),
            })
        }
    }

    /// Sends each file in four slices, sleeping `millis_per_kib` per KiB.
    #[derive(Default)]
    struct FakeStore {
        millis_per_kib: u64,
        reject: HashSet<String>,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn put_object(
            &self,
            _location: &WriteLocation,
            file: &UploadFile,
            progress: &dyn TransferProgress,
        ) -> ApiResult<()> {
            self.calls.lock().push(file.name.clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let total = file.size();
            let slice = Duration::from_millis(total / KIB as u64 * self.millis_per_kib / 4);
            let mut result = Ok(());
            for part in 1..=4u64 {
                tokio::time::sleep(slice).await;
                if part == 3 && self.reject.contains(&file.name) {
                    result = Err(ApiError::Transport("connection reset".to_string()));
                    break;
                }
                progress.on_bytes_sent(total * part / 4, total);
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<(TaskKey, u8)>>,
        sources: Mutex<Vec<Source>>,
        settled: Mutex<Vec<TaskKey>>,
    }

    impl UploadSink for RecordingSink {
        fn task_updated(&self, task: &UploadTask) {
            self.updates.lock().push((task.key, task.progress()));
        }

        fn source_confirmed(&self, source: &Source) {
            self.sources.lock().push(source.clone());
        }

        fn task_settled(&self, outcome: &TaskOutcome) {
            self.settled.lock().push(outcome.key());
        }
    }

    fn file(name: &str, size: usize) -> UploadFile {
        UploadFile::new(name, "", vec![7u8; size])
    }

    fn token() -> AccessToken {
        AccessToken::new("token-123")
    }

    fn orchestrator(backend: FakeBackend, store: Arc<FakeStore>) -> UploadOrchestrator {
        UploadOrchestrator::new(Arc::new(backend), store)
    }

    #[tokio::test]
    async fn every_file_in_a_clean_batch_succeeds() {
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(FakeBackend::default(), Arc::clone(&store));
        let sink = Arc::new(RecordingSink::default());

        let files = (0..5).map(|i| file(&format!("f{i}.txt"), 4 * KIB)).collect();
        let report = orchestrator
            .submit("p1", &token(), files, sink.clone())
            .expect("submit")
            .wait()
            .await;

        assert_eq!(report.succeeded().count(), 5);
        assert_eq!(sink.sources.lock().len(), 5);
        assert_eq!(sink.settled.lock().len(), 5);
        for row in orchestrator.snapshot() {
            assert_eq!(row.state(), &UploadState::Succeeded);
            assert_eq!(row.progress(), 100);
            assert!(row.remote_document_id().is_some());
        }
        assert!(!orchestrator.has_active());
    }

    #[tokio::test]
    async fn one_failed_transfer_leaves_the_rest_untouched() {
        let store = Arc::new(FakeStore {
            millis_per_kib: 1,
            reject: HashSet::from(["b.txt".to_string()]),
            ..FakeStore::default()
        });
        let orchestrator = orchestrator(FakeBackend::default(), store);
        let sink = Arc::new(RecordingSink::default());

        let files = vec![
            file("a.txt", 8 * KIB),
            file("b.txt", 8 * KIB),
            file("c.txt", 8 * KIB),
        ];
        let report = orchestrator
            .submit("p1", &token(), files, sink.clone())
            .expect("submit")
            .wait()
            .await;

        assert_eq!(report.succeeded().count(), 2);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert!(matches!(
            failed[0],
            TaskOutcome::Failed { file_name, step: UploadStep::Transfer, .. } if file_name == "b.txt"
        ));

        let rows = orchestrator.snapshot();
        let b = rows.iter().find(|row| row.file.name == "b.txt").expect("b row");
        assert_eq!(b.error_detail(), Some("network error: connection reset"));
        assert!(b.progress() < 100);
        assert_eq!(sink.sources.lock().len(), 2);
    }

    #[tokio::test]
    async fn write_location_rejection_skips_the_transfer() {
        let backend = FakeBackend {
            reject_location: HashMap::from([(
                "huge.pdf".to_string(),
                ApiError::Rejected {
                    status: 413,
                    detail: "File too large".to_string(),
                },
            )]),
            ..FakeBackend::default()
        };
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(backend, Arc::clone(&store));
        let sink = Arc::new(RecordingSink::default());

        let handle = orchestrator
            .submit("p1", &token(), vec![file("huge.pdf", KIB)], sink.clone())
            .expect("submit");
        let key = handle.keys()[0];
        handle.wait().await;

        let row = orchestrator.ledger().get(key).expect("row");
        assert_eq!(
            row.state(),
            &UploadState::Failed {
                step: UploadStep::WriteLocation,
                detail: "File too large".to_string(),
            }
        );
        assert!(store.calls.lock().is_empty());
        assert!(sink.sources.lock().is_empty());
    }

    #[tokio::test]
    async fn confirmation_rejection_fails_after_full_transfer() {
        let backend = FakeBackend {
            reject_confirm: HashSet::from(["a.pdf".to_string()]),
            ..FakeBackend::default()
        };
        let orchestrator = orchestrator(backend, Arc::new(FakeStore::default()));
        let sink = Arc::new(RecordingSink::default());

        let report = orchestrator
            .submit("p1", &token(), vec![file("a.pdf", 4 * KIB)], sink)
            .expect("submit")
            .wait()
            .await;

        assert!(matches!(
            report.outcomes[0],
            TaskOutcome::Failed { step: UploadStep::Confirmation, .. }
        ));
        let row = &orchestrator.snapshot()[0];
        assert_eq!(row.progress(), 99);
        assert_eq!(row.error_detail(), Some("Document not found"));
    }

    #[tokio::test]
    async fn progress_only_moves_forward() {
        let store = Arc::new(FakeStore {
            millis_per_kib: 1,
            reject: HashSet::from(["bad.txt".to_string()]),
            ..FakeStore::default()
        });
        let orchestrator = orchestrator(FakeBackend::default(), store);
        let sink = Arc::new(RecordingSink::default());

        let files = vec![file("ok.txt", 16 * KIB), file("bad.txt", 16 * KIB)];
        let handle = orchestrator
            .submit("p1", &token(), files, sink.clone())
            .expect("submit");
        let (ok_key, bad_key) = (handle.keys()[0], handle.keys()[1]);
        handle.wait().await;

        let updates = sink.updates.lock().clone();
        for key in [ok_key, bad_key] {
            let seen: Vec<u8> = updates
                .iter()
                .filter(|(k, _)| *k == key)
                .map(|(_, p)| *p)
                .collect();
            assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
            let last = *seen.last().expect("updates");
            if key == ok_key {
                assert_eq!(last, 100);
                assert!(seen[..seen.len() - 1].iter().all(|p| *p < 100));
            } else {
                assert!(last < 100);
            }
        }
    }

    #[tokio::test]
    async fn smaller_file_confirms_first_and_both_are_queued() {
        let backend = FakeBackend {
            document_ids: HashMap::from([
                ("a.pdf".to_string(), "doc-1".to_string()),
                ("b.pdf".to_string(), "doc-2".to_string()),
            ]),
            ..FakeBackend::default()
        };
        let store = Arc::new(FakeStore {
            millis_per_kib: 1,
            ..FakeStore::default()
        });
        let orchestrator = orchestrator(backend, store);
        let sink = Arc::new(RecordingSink::default());

        let files = vec![file("a.pdf", 200 * KIB), file("b.pdf", 50 * KIB)];
        assert_eq!(files[0].content_type, "application/pdf");
        let report = orchestrator
            .submit("proj-1", &token(), files, sink.clone())
            .expect("submit")
            .wait()
            .await;

        let names: Vec<&str> = report.outcomes.iter().map(TaskOutcome::file_name).collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);

        let sources = sink.sources.lock().clone();
        let ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["doc-2", "doc-1"]);
        assert!(sources.iter().all(Source::is_queued));
        assert_eq!(sources[1].display_name, "a.pdf");

        let rows = orchestrator.snapshot();
        let remote: Vec<Option<&str>> = rows.iter().map(UploadTask::remote_document_id).collect();
        assert_eq!(remote, [Some("doc-1"), Some("doc-2")]);
    }

    #[tokio::test]
    async fn concurrency_is_bounded_across_batches() {
        let store = Arc::new(FakeStore {
            millis_per_kib: 2,
            ..FakeStore::default()
        });
        let orchestrator =
            orchestrator(FakeBackend::default(), Arc::clone(&store)).with_max_concurrent(2);
        let sink = Arc::new(RecordingSink::default());

        let batch = |prefix: &str| -> Vec<UploadFile> {
            (0..3)
                .map(|i| file(&format!("{prefix}{i}.txt"), 8 * KIB))
                .collect()
        };
        let first = orchestrator
            .submit("p1", &token(), batch("a"), sink.clone())
            .expect("first");
        let second = orchestrator
            .submit("p1", &token(), batch("b"), sink.clone())
            .expect("second");
        first.wait().await;
        second.wait().await;

        assert_eq!(store.calls.lock().len(), 6);
        assert!(store.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(orchestrator.snapshot().len(), 6);
    }

    #[tokio::test]
    async fn replaced_batch_keeps_running_but_drops_out_of_the_ledger() {
        let store = Arc::new(FakeStore {
            millis_per_kib: 1,
            ..FakeStore::default()
        });
        let orchestrator = orchestrator(FakeBackend::default(), store)
            .with_ledger_policy(LedgerPolicy::Replace);
        let sink = Arc::new(RecordingSink::default());

        let first = orchestrator
            .submit("p1", &token(), vec![file("old.txt", 32 * KIB)], sink.clone())
            .expect("first");
        let old_key = first.keys()[0];
        let second = orchestrator
            .submit("p1", &token(), vec![file("new.txt", 4 * KIB)], sink.clone())
            .expect("second");

        let first_report = first.wait().await;
        second.wait().await;

        assert!(first_report.outcomes[0].is_success());
        let rows = orchestrator.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file.name, "new.txt");
        assert!(orchestrator.ledger().get(old_key).is_none());
        assert!(
            sink.updates.lock().iter().all(|(key, _)| *key != old_key),
            "no updates published for a cleared row"
        );
        assert_eq!(sink.sources.lock().len(), 2);
    }

    #[tokio::test]
    async fn projects_share_the_pool_but_not_their_rows() {
        let store = Arc::new(FakeStore {
            millis_per_kib: 2,
            ..FakeStore::default()
        });
        let orchestrator = orchestrator(FakeBackend::default(), store)
            .with_ledger_policy(LedgerPolicy::Replace);
        let sink = Arc::new(RecordingSink::default());

        let alpha = orchestrator
            .submit("alpha", &token(), vec![file("a.txt", 16 * KIB)], sink.clone())
            .expect("alpha");
        let beta = orchestrator
            .submit("beta", &token(), vec![file("b.txt", KIB)], sink.clone())
            .expect("beta");
        assert!(orchestrator.has_active_for("alpha"));
        assert_eq!(orchestrator.snapshot_for("alpha").len(), 1);

        beta.wait().await;
        assert!(!orchestrator.has_active_for("beta"));
        alpha.wait().await;

        let beta_rows = orchestrator.snapshot_for("beta");
        assert_eq!(beta_rows.len(), 1);
        assert_eq!(beta_rows[0].file.name, "b.txt");
        assert_eq!(beta_rows[0].project_id, "beta");
        assert_eq!(orchestrator.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn rows_are_listed_before_submit_returns_and_dismissable_once_settled() {
        let store = Arc::new(FakeStore {
            millis_per_kib: 2,
            ..FakeStore::default()
        });
        let orchestrator = orchestrator(FakeBackend::default(), store);
        let sink = Arc::new(RecordingSink::default());

        let handle = orchestrator
            .submit("p1", &token(), vec![file("a.txt", 8 * KIB)], sink)
            .expect("submit");
        let key = handle.keys()[0];
        assert!(orchestrator.has_active());
        assert_eq!(orchestrator.snapshot()[0].state(), &UploadState::Pending);
        assert!(!orchestrator.dismiss(key));

        handle.wait().await;
        assert!(!orchestrator.has_active());
        assert!(orchestrator.dismiss(key));
        assert!(orchestrator.ledger().is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_batches_and_missing_credentials() {
        let orchestrator = orchestrator(FakeBackend::default(), Arc::new(FakeStore::default()));
        let sink: Arc<dyn UploadSink> = Arc::new(RecordingSink::default());

        let empty = orchestrator.submit("p1", &token(), Vec::new(), Arc::clone(&sink));
        assert_eq!(empty.err(), Some(OrchestratorError::EmptyBatch));

        let anonymous = orchestrator.submit(
            "p1",
            &AccessToken::new(""),
            vec![file("a.txt", 1)],
            Arc::clone(&sink),
        );
        assert_eq!(anonymous.err(), Some(OrchestratorError::MissingCredential));

        let nowhere = orchestrator.submit(" ", &token(), vec![file("a.txt", 1)], sink);
        assert_eq!(nowhere.err(), Some(OrchestratorError::MissingProject));
        assert!(orchestrator.ledger().is_empty());
    }
}
