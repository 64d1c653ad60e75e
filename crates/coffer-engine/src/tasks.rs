//! Construction-side task ledger
//!
//! The front door accepts a payload, records a task, and processes it in
//! the background. The claim is at-most-once within this process; routing
//! must keep one object's writes on one construction node (or move the
//! claim into the metadata store) before this is replicated.

use coffer_common::{BucketId, ObjectId, VersionId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Lifecycle of one ingest task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Submitted, not yet claimed by a worker
    Pending,
    /// Claimed and processing
    Running,
    /// Finished; the version is committed
    Completed,
    /// Failed; the error message is kept for the caller
    Failed(String),
}

/// Queryable snapshot of a task
#[derive(Clone, Debug)]
pub struct TaskStatus {
    pub bucket_id: BucketId,
    pub object_id: ObjectId,
    pub version_id: VersionId,
    pub state: TaskState,
}

/// At-most-once task claims, keyed by object id
#[derive(Default)]
pub struct TaskLedger {
    tasks: Mutex<HashMap<ObjectId, TaskStatus>>,
}

impl TaskLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new task; rejects an object that is already in flight
    pub fn submit(&self, bucket_id: &BucketId, object_id: &ObjectId, version_id: &VersionId) -> bool {
        let mut tasks = self.tasks.lock();
        match tasks.get(object_id) {
            Some(existing)
                if matches!(existing.state, TaskState::Pending | TaskState::Running) =>
            {
                false
            }
            _ => {
                tasks.insert(
                    object_id.clone(),
                    TaskStatus {
                        bucket_id: bucket_id.clone(),
                        object_id: object_id.clone(),
                        version_id: version_id.clone(),
                        state: TaskState::Pending,
                    },
                );
                true
            }
        }
    }

    /// Claim a pending task; returns false if it was already claimed
    pub fn claim(&self, object_id: &ObjectId) -> bool {
        let mut tasks = self.tasks.lock();
        match tasks.get_mut(object_id) {
            Some(task) if task.state == TaskState::Pending => {
                task.state = TaskState::Running;
                true
            }
            _ => false,
        }
    }

    /// Mark a running task completed
    pub fn complete(&self, object_id: &ObjectId) {
        if let Some(task) = self.tasks.lock().get_mut(object_id) {
            task.state = TaskState::Completed;
        }
    }

    /// Mark a running task failed
    pub fn fail(&self, object_id: &ObjectId, error: impl Into<String>) {
        if let Some(task) = self.tasks.lock().get_mut(object_id) {
            task.state = TaskState::Failed(error.into());
        }
    }

    /// Current status of a task
    pub fn status(&self, object_id: &ObjectId) -> Option<TaskStatus> {
        self.tasks.lock().get(object_id).cloned()
    }
}
