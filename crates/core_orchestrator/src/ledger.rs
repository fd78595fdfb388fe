use core_types::{LedgerPolicy, TaskKey, UploadTask};
use indexmap::IndexMap;
use parking_lot::Mutex;

/// Visible per-file upload state, in submission order. Rows carry their
/// project, so one ledger can serve several open projects.
///
/// All mutation goes through single-key replacement under one mutex, and
/// updates for keys that are no longer listed are dropped.
#[derive(Debug, Default)]
pub struct UploadLedger {
    rows: Mutex<IndexMap<TaskKey, UploadTask>>,
}

impl UploadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn admit(&self, tasks: &[UploadTask], policy: LedgerPolicy) {
        let mut rows = self.rows.lock();
        if policy == LedgerPolicy::Replace {
            rows.retain(|_, row| tasks.iter().all(|task| task.project_id != row.project_id));
        }
        for task in tasks {
            rows.insert(task.key, task.clone());
        }
    }

    /// Applies `change` to the row for `key` and returns a snapshot of the
    /// row when the change took effect.
    pub(crate) fn update(
        &self,
        key: TaskKey,
        change: impl FnOnce(&mut UploadTask) -> bool,
    ) -> Option<UploadTask> {
        let mut rows = self.rows.lock();
        let task = rows.get_mut(&key)?;
        change(task).then(|| task.clone())
    }

    pub fn get(&self, key: TaskKey) -> Option<UploadTask> {
        self.rows.lock().get(&key).cloned()
    }

    pub fn snapshot(&self) -> Vec<UploadTask> {
        self.rows.lock().values().cloned().collect()
    }

    pub fn snapshot_for(&self, project_id: &str) -> Vec<UploadTask> {
        self.rows
            .lock()
            .values()
            .filter(|task| task.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn has_active(&self) -> bool {
        self.rows.lock().values().any(UploadTask::is_active)
    }

    pub fn has_active_for(&self, project_id: &str) -> bool {
        self.rows
            .lock()
            .values()
            .any(|task| task.project_id == project_id && task.is_active())
    }

    /// Removes a settled row. Rows still in flight stay listed.
    pub fn dismiss(&self, key: TaskKey) -> bool {
        let mut rows = self.rows.lock();
        match rows.get(&key) {
            Some(task) if !task.is_active() => rows.shift_remove(&key).is_some(),
            _ => false,
        }
    }

    /// Removes every settled row and returns how many were dropped.
    pub fn clear_settled(&self) -> usize {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|_, task| task.is_active());
        before - rows.len()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}
