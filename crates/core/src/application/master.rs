// Master - composes supervisor, lifecycle state machine and manager link

use crate::application::constants::*;
use crate::application::manager_link::ManagerLink;
use crate::application::shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
use crate::application::supervisor::Supervisor;
use crate::domain::{
    parse_queue_spec, LifecycleAction, LifecycleState, ManagerCommand, ManagerEndpoint,
    MasterConfig, MasterSignal, QueueName, StatusReport, WorkerSet,
};
use crate::error::{AppError, Result};
use crate::port::{ConfigSource, HostProbe, ManagerTransport, TimeProvider, WorkerLauncher};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Polling cadence of the master's loops
#[derive(Debug, Clone, Copy)]
pub struct MasterTiming {
    pub monitor_tick: Duration,
    pub status_interval: Duration,
    pub reconnect_backoff: Duration,
}

impl Default for MasterTiming {
    fn default() -> Self {
        Self {
            monitor_tick: MONITOR_TICK,
            status_interval: STATUS_INTERVAL,
            reconnect_backoff: RECONNECT_BACKOFF,
        }
    }
}

/// External collaborators of the master
pub struct MasterDeps {
    pub launcher: Arc<dyn WorkerLauncher>,
    pub config: Arc<dyn ConfigSource>,
    pub host: Arc<dyn HostProbe>,
    pub time_provider: Arc<dyn TimeProvider>,
    pub transport: Arc<dyn ManagerTransport>,
}

#[derive(Debug, Clone, Default)]
pub struct MasterOptions {
    pub timing: MasterTiming,
    /// Queue spec that takes precedence over the per-host assignment
    pub override_queues: Option<String>,
}

/// State shared by the monitor loop, signal handling and the manager link
///
/// Guarded by a single mutex; the shutdown channel mirrors
/// `lifecycle.is_shutdown_pending()` for lock-free polling.
struct MasterState {
    lifecycle: LifecycleState,
    workers: WorkerSet,
    max_load: usize,
}

struct Inner {
    supervisor: Supervisor,
    config: Arc<dyn ConfigSource>,
    host: Arc<dyn HostProbe>,
    time_provider: Arc<dyn TimeProvider>,
    transport: Arc<dyn ManagerTransport>,
    options: MasterOptions,
    started_at: AtomicI64,
    state: Mutex<MasterState>,
    shutdown: ShutdownSender,
    /// First fatal error raised outside the monitor loop
    fatal: std::sync::Mutex<Option<AppError>>,
}

/// Master supervisor process
///
/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct Master {
    inner: Arc<Inner>,
}

impl Master {
    pub fn new(deps: MasterDeps, options: MasterOptions) -> Self {
        let (shutdown, _) = shutdown_channel();
        let started_at = deps.time_provider.now_millis();
        Self {
            inner: Arc::new(Inner {
                supervisor: Supervisor::new(deps.launcher),
                config: deps.config,
                host: deps.host,
                time_provider: deps.time_provider,
                transport: deps.transport,
                options,
                started_at: AtomicI64::new(started_at),
                state: Mutex::new(MasterState {
                    lifecycle: LifecycleState::Running,
                    workers: WorkerSet::new(),
                    max_load: 1,
                }),
                shutdown,
                fatal: std::sync::Mutex::new(None),
            }),
        }
    }

    /// Run the master until every worker has been drained
    ///
    /// Starts the manager link, one worker per resolved queue, then blocks in
    /// the monitor loop. Returns once shutdown was requested and all workers
    /// exited.
    ///
    /// # Errors
    /// - AppError::Domain(InvalidQueueSpec) before any worker is started
    /// - AppError::Process on spawn/signal failures (remaining workers are
    ///   killed best-effort first)
    /// - the first error handed to [`Master::abort`] once the set is drained
    pub async fn run(&self) -> Result<()> {
        info!(pid = %std::process::id(), "Master starting");
        self.inner
            .started_at
            .store(self.inner.time_provider.now_millis(), Ordering::SeqCst);

        let queues = self.resolve_queues(&self.inner.config.current())?;
        info!(queues = ?queues, "Starting to work on queues");

        let link = ManagerLink::new(
            self.clone(),
            Arc::clone(&self.inner.transport),
            self.inner.options.timing,
        );
        let link_handle = tokio::spawn(link.run());

        let result = self.supervise(&queues).await;
        if let Err(e) = &result {
            error!(error = %e, "Supervision failed, killing remaining workers");
            self.abort_workers().await;
        }

        self.inner.shutdown.shutdown();
        let _ = tokio::time::timeout(LINK_JOIN_TIMEOUT, link_handle).await;
        info!("Master stopped");

        match self.take_fatal() {
            Some(fatal) if result.is_ok() => Err(fatal),
            _ => result,
        }
    }

    /// Escalate a fatal error raised by a signal or a manager command
    ///
    /// Every tracked worker is killed and shutdown is requested. `run` keeps
    /// draining the set and then returns the first recorded error.
    pub async fn abort(&self, error: AppError) {
        error!(error = %error, "Fatal supervision error, killing all workers");
        {
            let mut fatal = self.inner.fatal.lock().unwrap_or_else(|e| e.into_inner());
            if fatal.is_none() {
                *fatal = Some(error);
            }
        }
        self.abort_workers().await;
    }

    fn take_fatal(&self) -> Option<AppError> {
        self.inner
            .fatal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    async fn supervise(&self, queues: &[QueueName]) -> Result<()> {
        {
            let mut state = self.inner.state.lock().await;
            state.max_load = self.resolve_max_load(&self.inner.config.current());
            let max_load = state.max_load;
            self.inner
                .supervisor
                .start_all(&mut state.workers, queues, max_load)
                .await?;
        }
        self.monitor_loop().await
    }

    /// Monitor workers until the set is empty
    ///
    /// Runs one supervisor pass per tick. Dead workers are replaced while
    /// running and retired once shutdown is pending.
    pub async fn monitor_loop(&self) -> Result<()> {
        let started = self.inner.time_provider.now_millis();
        loop {
            let drained = {
                let mut guard = self.inner.state.lock().await;
                let state = &mut *guard;
                let pending = state.lifecycle.is_shutdown_pending();
                let report = self
                    .inner
                    .supervisor
                    .tick(&mut state.workers, pending, state.max_load)
                    .await?;
                if report.respawned > 0 || report.retired > 0 {
                    debug!(
                        alive = report.alive,
                        respawned = report.respawned,
                        retired = report.retired,
                        "Monitor pass"
                    );
                }
                state.workers.is_empty()
            };

            if drained {
                debug!("All workers exited");
                return Ok(());
            }

            debug!(
                seconds = (self.inner.time_provider.now_millis() - started) / 1000,
                "Waiting for workers..."
            );
            tokio::time::sleep(self.inner.options.timing.monitor_tick).await;
        }
    }

    /// Apply an OS signal to the lifecycle state machine
    ///
    /// `interactive` is whether stdin is a terminal. Returns the new state.
    pub async fn handle_signal(
        &self,
        signal: MasterSignal,
        interactive: bool,
    ) -> Result<LifecycleState> {
        let (next, action) = {
            let mut state = self.inner.state.lock().await;
            let (next, action) = state.lifecycle.on_signal(signal, interactive);
            debug!(signal = %signal, from = %state.lifecycle, to = %next, "Handling signal");
            state.lifecycle = next;
            if next.is_shutdown_pending() {
                self.inner.shutdown.shutdown();
            }

            match action {
                LifecycleAction::StopGracefully => {
                    warn!("Warm shutdown");
                    self.inner.supervisor.stop(&state.workers.all(), false)?;
                }
                LifecycleAction::KillAll => {
                    warn!("Cold shutdown");
                    self.inner.supervisor.stop(&state.workers.all(), true)?;
                }
                LifecycleAction::Reload | LifecycleAction::Ignore => {}
            }
            (next, action)
        };

        match action {
            LifecycleAction::Reload => {
                warn!("Handling SIGHUP");
                self.reload().await?;
            }
            LifecycleAction::Ignore => debug!(signal = %signal, "Signal ignored"),
            _ => {}
        }
        Ok(next)
    }

    /// Reload configuration and replace the worker set
    ///
    /// New workers are started from the freshly resolved queue list before
    /// the previous workers receive a graceful termination, so consumption
    /// briefly overlaps. The previous workers are reaped by the monitor loop
    /// but never replaced.
    ///
    /// # Errors
    /// - AppError::ReloadUnsupported if the configuration has no backing
    ///   source (no worker is touched)
    /// - AppError::Config / Domain if the new configuration is invalid
    ///   (the current workers keep running)
    /// - AppError::Process if a replacement cannot be started; the partial
    ///   new set is killed and the current workers stay active
    pub async fn reload(&self) -> Result<()> {
        if !self.inner.config.supports_reload() {
            warn!("Reload requested but configuration is not reloadable");
            return Err(AppError::ReloadUnsupported);
        }

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        if state.lifecycle.is_shutdown_pending() {
            warn!("Reload ignored, shutdown pending");
            return Ok(());
        }

        warn!("Reloading workers");
        self.inner.config.reload()?;
        let config = self.inner.config.current();
        let queues = self.resolve_queues(&config)?;
        let max_load = self.resolve_max_load(&config);

        // The current set stays active until every replacement is running
        let mut fresh = WorkerSet::new();
        if let Err(e) = self
            .inner
            .supervisor
            .start_all(&mut fresh, &queues, max_load)
            .await
        {
            error!(error = %e, started = fresh.active.len(), "Reload failed, keeping current workers");
            if let Err(stop_err) = self.inner.supervisor.stop(&fresh.active, true) {
                error!(error = %stop_err, "Failed to kill partially started workers");
            }
            state.workers.retiring.extend(fresh.active);
            return Err(e);
        }

        state.max_load = max_load;
        let previous = state.workers.replace_active(fresh.active);
        info!(queues = ?queues, retiring = previous.len(), "Workers reloaded");

        self.inner.supervisor.stop(&previous, false)
    }

    /// Send termination to every tracked worker
    ///
    /// Without a pending shutdown the monitor loop replaces them, which
    /// amounts to a restart of the pool.
    pub async fn stop_workers(&self, kill: bool) -> Result<()> {
        let state = self.inner.state.lock().await;
        info!(kill = %kill, count = state.workers.len(), "Stopping workers");
        self.inner.supervisor.stop(&state.workers.all(), kill)
    }

    /// Execute a command received from the manager
    pub async fn dispatch(&self, command: ManagerCommand) -> Result<()> {
        match command {
            ManagerCommand::Reload => self.reload().await,
            ManagerCommand::StopWorkers { kill } => self.stop_workers(kill).await,
            ManagerCommand::WarmShutdown => self
                .handle_signal(MasterSignal::Terminate, false)
                .await
                .map(|_| ()),
            ManagerCommand::ColdShutdown => self
                .handle_signal(MasterSignal::Quit, false)
                .await
                .map(|_| ()),
        }
    }

    /// Status report for the manager
    pub fn status(&self) -> StatusReport {
        StatusReport {
            hostname: self.inner.host.hostname(),
            uptime: self.uptime_secs(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        let started = self.inner.started_at.load(Ordering::SeqCst);
        (self.inner.time_provider.now_millis() - started) / 1000
    }

    /// Manager endpoint of the active configuration
    pub fn manager_endpoint(&self) -> ManagerEndpoint {
        self.inner.config.current().manager
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.inner.shutdown.subscribe()
    }

    pub fn is_shutdown_pending(&self) -> bool {
        self.inner.shutdown.is_shutdown()
    }

    pub async fn lifecycle(&self) -> LifecycleState {
        self.inner.state.lock().await.lifecycle
    }

    /// Snapshot of the worker bookkeeping
    pub async fn workers(&self) -> WorkerSet {
        self.inner.state.lock().await.workers.clone()
    }

    /// Resolve the queue list: override, then host assignment, then default
    pub fn resolve_queues(&self, config: &MasterConfig) -> Result<Vec<QueueName>> {
        let hostname = self.inner.host.hostname();
        let spec = match (&self.inner.options.override_queues, config.queues_for_host(&hostname))
        {
            (Some(queues), _) => queues.clone(),
            (None, Some(queues)) => queues.to_string(),
            (None, None) => {
                warn!(
                    hostname = %hostname,
                    queue = DEFAULT_QUEUE,
                    "No queues specified for host, listening on default queue"
                );
                DEFAULT_QUEUE.to_string()
            }
        };
        Ok(parse_queue_spec(&spec, &hostname)?)
    }

    fn resolve_max_load(&self, config: &MasterConfig) -> usize {
        config
            .max_load
            .unwrap_or_else(|| self.inner.host.cpu_count())
            .max(1)
    }

    /// Kill every tracked worker after a fatal supervision failure
    async fn abort_workers(&self) {
        let mut state = self.inner.state.lock().await;
        state.lifecycle = LifecycleState::ColdShutdown;
        self.inner.shutdown.shutdown();
        for handle in state.workers.all() {
            if let Err(e) = self.inner.supervisor.stop(std::slice::from_ref(&handle), true) {
                error!(pid = %handle.process_id, error = %e, "Failed to kill worker");
            }
        }
    }
}
