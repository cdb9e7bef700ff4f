// Worker Launcher Port
// Abstraction over the external worker process (start / is-alive / signal)

use crate::domain::WorkerHandle;
use async_trait::async_trait;
use thiserror::Error;

/// Process-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Spawn failed for queue {queue}: {reason}")]
    SpawnFailed { queue: String, reason: String },

    /// Target process or group no longer exists (not a failure)
    #[error("Process {0} already gone")]
    AlreadyGone(i32),

    #[error("Signal delivery to {target} failed: {reason}")]
    SignalFailed { target: i32, reason: String },
}

/// Worker Launcher trait
///
/// Implementations:
/// - SubprocessLauncher: spawns the configured worker command (infra-system)
/// - MockWorkerLauncher: in-memory process table (tests)
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// Start a worker bound to `queue` in a new process group
    ///
    /// The returned handle's `process_group_id` must address the worker
    /// and every process it forks.
    ///
    /// # Errors
    /// - ProcessError::SpawnFailed if the process cannot be started
    async fn spawn(&self, queue: &str, max_load: usize) -> Result<WorkerHandle, ProcessError>;

    /// Check if the worker process is still alive (reaps it when exited)
    fn is_alive(&self, handle: &WorkerHandle) -> bool;

    /// Send SIGTERM (or SIGKILL when `force`) to the worker process
    ///
    /// # Errors
    /// - ProcessError::AlreadyGone if no such process exists
    /// - ProcessError::SignalFailed for any other OS failure
    fn terminate(&self, handle: &WorkerHandle, force: bool) -> Result<(), ProcessError>;

    /// Send SIGKILL to the worker's whole process group
    ///
    /// # Errors
    /// - ProcessError::AlreadyGone if the group no longer exists
    /// - ProcessError::SignalFailed for any other OS failure
    fn kill_group(&self, handle: &WorkerHandle) -> Result<(), ProcessError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Signal observed by the mock
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SentSignal {
        Terminate { pid: i32 },
        Kill { pid: i32 },
        KillGroup { pgid: i32 },
    }

    #[derive(Debug, Default)]
    struct ProcessTable {
        next_pid: i32,
        alive: HashMap<i32, bool>,
        spawned: Vec<WorkerHandle>,
        signals: Vec<SentSignal>,
        fail_signals: bool,
        fail_spawns: bool,
        failing_queues: Vec<String>,
        ignore_terminate: bool,
    }

    /// Mock launcher with an in-memory process table
    ///
    /// Signals take effect immediately: a terminated or killed worker is dead
    /// on the next liveness check (unless `ignore_terminate` is set).
    pub struct MockWorkerLauncher {
        table: Mutex<ProcessTable>,
    }

    impl MockWorkerLauncher {
        pub fn new() -> Self {
            Self {
                table: Mutex::new(ProcessTable {
                    next_pid: 1000,
                    ..Default::default()
                }),
            }
        }

        /// Simulate a crash of one worker
        pub fn crash(&self, pid: i32) {
            self.table.lock().unwrap().alive.insert(pid, false);
        }

        /// All handles ever spawned, in spawn order
        pub fn spawned(&self) -> Vec<WorkerHandle> {
            self.table.lock().unwrap().spawned.clone()
        }

        pub fn spawn_count(&self) -> usize {
            self.table.lock().unwrap().spawned.len()
        }

        pub fn signals(&self) -> Vec<SentSignal> {
            self.table.lock().unwrap().signals.clone()
        }

        pub fn live_pids(&self) -> Vec<i32> {
            let table = self.table.lock().unwrap();
            let mut pids: Vec<i32> = table
                .alive
                .iter()
                .filter(|(_, alive)| **alive)
                .map(|(pid, _)| *pid)
                .collect();
            pids.sort_unstable();
            pids
        }

        /// Make every subsequent signal fail with SignalFailed
        pub fn fail_signals(&self) {
            self.table.lock().unwrap().fail_signals = true;
        }

        pub fn fail_spawns(&self) {
            self.table.lock().unwrap().fail_spawns = true;
        }

        /// Make spawns for one queue fail; other queues still start
        pub fn fail_spawns_on(&self, queue: &str) {
            self.table.lock().unwrap().failing_queues.push(queue.to_string());
        }

        /// Workers keep running after SIGTERM (SIGKILL still works)
        pub fn ignore_terminate(&self) {
            self.table.lock().unwrap().ignore_terminate = true;
        }
    }

    impl Default for MockWorkerLauncher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl WorkerLauncher for MockWorkerLauncher {
        async fn spawn(&self, queue: &str, _max_load: usize) -> Result<WorkerHandle, ProcessError> {
            let mut table = self.table.lock().unwrap();
            if table.fail_spawns || table.failing_queues.iter().any(|q| q == queue) {
                return Err(ProcessError::SpawnFailed {
                    queue: queue.to_string(),
                    reason: "mock spawn failure".to_string(),
                });
            }
            table.next_pid += 1;
            let pid = table.next_pid;
            let handle = WorkerHandle::new(queue, pid, pid, 0);
            table.alive.insert(pid, true);
            table.spawned.push(handle.clone());
            Ok(handle)
        }

        fn is_alive(&self, handle: &WorkerHandle) -> bool {
            let table = self.table.lock().unwrap();
            table.alive.get(&handle.process_id).copied().unwrap_or(false)
        }

        fn terminate(&self, handle: &WorkerHandle, force: bool) -> Result<(), ProcessError> {
            let mut table = self.table.lock().unwrap();
            let pid = handle.process_id;
            if table.fail_signals {
                return Err(ProcessError::SignalFailed {
                    target: pid,
                    reason: "EPERM".to_string(),
                });
            }
            table.signals.push(if force {
                SentSignal::Kill { pid }
            } else {
                SentSignal::Terminate { pid }
            });
            if !table.alive.get(&pid).copied().unwrap_or(false) {
                return Err(ProcessError::AlreadyGone(pid));
            }
            if force || !table.ignore_terminate {
                table.alive.insert(pid, false);
            }
            Ok(())
        }

        fn kill_group(&self, handle: &WorkerHandle) -> Result<(), ProcessError> {
            let mut table = self.table.lock().unwrap();
            let pgid = handle.process_group_id;
            if table.fail_signals {
                return Err(ProcessError::SignalFailed {
                    target: pgid,
                    reason: "EPERM".to_string(),
                });
            }
            table.signals.push(SentSignal::KillGroup { pgid });
            // Mock workers never fork, so a dead leader means an empty group
            if !table.alive.get(&pgid).copied().unwrap_or(false) {
                return Err(ProcessError::AlreadyGone(pgid));
            }
            table.alive.insert(pgid, false);
            Ok(())
        }
    }
}
