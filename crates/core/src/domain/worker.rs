// Worker Domain Model

use super::queue_spec::QueueName;

/// One supervised worker process
///
/// Workers are started in their own process group, so `process_group_id`
/// equals the leader's pid and targets the worker plus any descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    pub queue_name: QueueName,
    pub process_id: i32,
    pub process_group_id: i32,
    pub start_time: i64, // millis since epoch
}

impl WorkerHandle {
    pub fn new(
        queue_name: impl Into<String>,
        process_id: i32,
        process_group_id: i32,
        start_time: i64,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            process_id,
            process_group_id,
            start_time,
        }
    }
}

/// Worker bookkeeping owned by the supervisor
///
/// `active` workers are replaced when they die (unless shutdown is pending).
/// `retiring` workers were detached by a reload: they are signalled once and
/// reaped when dead, never replaced.
#[derive(Debug, Default, Clone)]
pub struct WorkerSet {
    pub active: Vec<WorkerHandle>,
    pub retiring: Vec<WorkerHandle>,
}

impl WorkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once every tracked worker has been retired
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.retiring.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.retiring.len()
    }

    /// Queue bindings of the active workers, in start order
    pub fn queue_bindings(&self) -> Vec<QueueName> {
        self.active.iter().map(|h| h.queue_name.clone()).collect()
    }

    /// Every tracked handle (active first, then retiring)
    pub fn all(&self) -> Vec<WorkerHandle> {
        self.active
            .iter()
            .chain(self.retiring.iter())
            .cloned()
            .collect()
    }

    /// Install `fresh` as the active set and move the previous active
    /// workers to the retiring list, returning the moved handles
    pub fn replace_active(&mut self, fresh: Vec<WorkerHandle>) -> Vec<WorkerHandle> {
        let moved = std::mem::replace(&mut self.active, fresh);
        self.retiring.extend(moved.iter().cloned());
        moved
    }
}
