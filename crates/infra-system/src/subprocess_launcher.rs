// Subprocess worker launcher
// reason: tokio::process for child management, nix for POSIX signals
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use hive_core::application::constants::{WORKER_MAX_LOAD_ENV, WORKER_QUEUE_ENV};
use hive_core::domain::WorkerHandle;
use hive_core::port::{ProcessError, TimeProvider, WorkerLauncher};

/// Environment passed to workers by default
pub const DEFAULT_ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "USER", "LANG"];

/// Subprocess launcher
///
/// Starts the configured worker command once per queue. Every worker gets
/// its own process group (pgid == pid) so that a crashed worker's forked
/// children can be killed with one `killpg`.
pub struct SubprocessLauncher {
    command: Vec<String>,
    env_allowlist: Vec<String>,
    time_provider: Arc<dyn TimeProvider>,
    children: Mutex<HashMap<i32, Child>>,
}

impl SubprocessLauncher {
    /// Create a new launcher
    ///
    /// # Arguments
    /// * `command` - Worker program followed by its arguments
    /// * `env_allowlist` - Parent environment variables passed to workers
    /// * `time_provider` - Clock for worker start times
    ///
    /// # Example
    /// ```ignore
    /// let launcher = SubprocessLauncher::new(
    ///     vec!["my-worker".to_string()],
    ///     vec!["PATH".to_string(), "HOME".to_string()],
    ///     Arc::new(SystemTimeProvider),
    /// );
    /// ```
    pub fn new(
        command: Vec<String>,
        env_allowlist: Vec<String>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            command,
            env_allowlist,
            time_provider,
            children: Mutex::new(HashMap::new()),
        }
    }

    /// Filter environment variables to allowlist only
    fn filter_env(
        &self,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> HashMap<String, String> {
        env.into_iter()
            .filter(|(k, _)| self.env_allowlist.contains(k))
            .collect()
    }

    fn children(&self) -> MutexGuard<'_, HashMap<i32, Child>> {
        self.children.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Map a signal delivery failure; ESRCH means the target is already gone
fn signal_error(target: i32, errno: Errno) -> ProcessError {
    match errno {
        Errno::ESRCH => ProcessError::AlreadyGone(target),
        other => ProcessError::SignalFailed {
            target,
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl WorkerLauncher for SubprocessLauncher {
    async fn spawn(&self, queue: &str, max_load: usize) -> Result<WorkerHandle, ProcessError> {
        let spawn_failed = |reason: String| ProcessError::SpawnFailed {
            queue: queue.to_string(),
            reason,
        };

        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| spawn_failed("worker command is empty".to_string()))?;

        let child = Command::new(program)
            .args(args)
            .env_clear()
            .envs(self.filter_env(std::env::vars()))
            .env(WORKER_QUEUE_ENV, queue)
            .env(WORKER_MAX_LOAD_ENV, max_load.to_string())
            .stdin(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|e| spawn_failed(e.to_string()))?;

        let pid = child
            .id()
            .ok_or_else(|| spawn_failed("process exited before pid was read".to_string()))?
            as i32;

        info!(queue = %queue, pid = %pid, program = %program, "Spawned worker process");
        self.children().insert(pid, child);

        Ok(WorkerHandle::new(
            queue,
            pid,
            pid,
            self.time_provider.now_millis(),
        ))
    }

    fn is_alive(&self, handle: &WorkerHandle) -> bool {
        let pid = handle.process_id;
        let mut children = self.children();

        // Untracked pids were reaped already (or never ours) and may be reused
        let Some(child) = children.get_mut(&pid) else {
            return false;
        };

        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(pid = %pid, status = %status, "Worker process exited");
                children.remove(&pid);
                false
            }
            Err(e) => {
                warn!(pid = %pid, error = %e, "Cannot query worker status, assuming dead");
                children.remove(&pid);
                false
            }
        }
    }

    fn terminate(&self, handle: &WorkerHandle, force: bool) -> Result<(), ProcessError> {
        let pid = handle.process_id;
        if !self.children().contains_key(&pid) {
            return Err(ProcessError::AlreadyGone(pid));
        }
        let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
        debug!(pid = %pid, signal = %signal, "Signalling worker");
        kill(Pid::from_raw(pid), signal).map_err(|e| signal_error(pid, e))
    }

    fn kill_group(&self, handle: &WorkerHandle) -> Result<(), ProcessError> {
        let pgid = handle.process_group_id;
        debug!(pgid = %pgid, "Killing worker process group");
        killpg(Pid::from_raw(pgid), Signal::SIGKILL).map_err(|e| signal_error(pgid, e))
    }
}
