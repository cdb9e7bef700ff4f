// Worker Pool Supervisor - spawn, monitor, respawn, stop
use crate::domain::{QueueName, WorkerHandle, WorkerSet};
use crate::error::Result;
use crate::port::{ProcessError, WorkerLauncher};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one monitor pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub alive: usize,
    pub respawned: usize,
    pub retired: usize,
}

/// Worker pool supervisor
///
/// Applies the respawn/retire policy to a [`WorkerSet`]. The set itself is
/// owned by the master state and handed in under its lock.
pub struct Supervisor {
    launcher: Arc<dyn WorkerLauncher>,
}

impl Supervisor {
    pub fn new(launcher: Arc<dyn WorkerLauncher>) -> Self {
        Self { launcher }
    }

    /// Start one worker per queue name and add it to the active set
    ///
    /// Handles started before a failure stay in the set so they can be
    /// stopped by the caller.
    pub async fn start_all(
        &self,
        workers: &mut WorkerSet,
        queues: &[QueueName],
        max_load: usize,
    ) -> Result<()> {
        for queue in queues {
            let handle = self.launcher.spawn(queue, max_load).await?;
            info!(
                queue = %handle.queue_name,
                pid = %handle.process_id,
                "Worker started"
            );
            workers.active.push(handle);
        }
        Ok(())
    }

    /// Run one monitor pass over the worker set
    ///
    /// - alive: kept
    /// - dead, no shutdown pending: process group killed, replaced in place
    ///   by a new worker on the same queue
    /// - dead, shutdown pending: retired
    ///
    /// Retiring (reload-detached) workers are reaped once dead and never
    /// replaced.
    pub async fn tick(
        &self,
        workers: &mut WorkerSet,
        shutdown_pending: bool,
        max_load: usize,
    ) -> Result<TickReport> {
        let mut report = TickReport::default();

        let mut i = 0;
        while i < workers.active.len() {
            let handle = workers.active[i].clone();

            if self.launcher.is_alive(&handle) {
                report.alive += 1;
                i += 1;
                continue;
            }

            if shutdown_pending {
                debug!(queue = %handle.queue_name, pid = %handle.process_id, "Worker exited");
                workers.active.remove(i);
                report.retired += 1;
                continue;
            }

            warn!(
                queue = %handle.queue_name,
                pid = %handle.process_id,
                "Worker died unexpectedly, spawning replacement"
            );
            // A task may have forked children that outlived the worker
            self.kill_group(&handle)?;
            let replacement = self.launcher.spawn(&handle.queue_name, max_load).await?;
            info!(
                queue = %replacement.queue_name,
                pid = %replacement.process_id,
                replaced_pid = %handle.process_id,
                "Worker respawned"
            );
            workers.active[i] = replacement;
            report.respawned += 1;
            i += 1;
        }

        let before = workers.retiring.len();
        workers.retiring.retain(|h| self.launcher.is_alive(h));
        report.retired += before - workers.retiring.len();
        report.alive += workers.retiring.len();

        Ok(report)
    }

    /// Send termination to the given workers (SIGKILL when `force`)
    ///
    /// Workers that already exited count as stopped.
    ///
    /// # Errors
    /// - AppError::Process(SignalFailed) on any other delivery failure
    pub fn stop(&self, handles: &[WorkerHandle], force: bool) -> Result<()> {
        for handle in handles {
            match self.launcher.terminate(handle, force) {
                Ok(()) => debug!(pid = %handle.process_id, force = %force, "Stop signal sent"),
                Err(ProcessError::AlreadyGone(pid)) => {
                    debug!(pid = %pid, "Worker already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Kill the process group of a dead worker
    fn kill_group(&self, handle: &WorkerHandle) -> Result<()> {
        match self.launcher.kill_group(handle) {
            Ok(()) | Err(ProcessError::AlreadyGone(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
