//! OS signal listener
//!
//! Maps SIGINT, SIGTERM, SIGQUIT and SIGHUP to [`MasterSignal`]s and feeds
//! them to the master. Handlers only forward; the kill/spawn work runs in
//! the master under its state lock.

use anyhow::{bail, Context, Result};
use hive_core::application::Master;
use hive_core::domain::MasterSignal;
use hive_core::AppError;
use std::io::IsTerminal;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, error, warn};

pub struct SignalListener {
    sigint: Signal,
    sigterm: Signal,
    sigquit: Signal,
    sighup: Signal,
}

impl SignalListener {
    /// Register the handlers (must happen before workers are started)
    pub fn install() -> Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt()).context("SIGINT handler")?,
            sigterm: signal(SignalKind::terminate()).context("SIGTERM handler")?,
            sigquit: signal(SignalKind::quit()).context("SIGQUIT handler")?,
            sighup: signal(SignalKind::hangup()).context("SIGHUP handler")?,
        })
    }

    async fn next(&mut self) -> Option<MasterSignal> {
        tokio::select! {
            s = self.sigint.recv() => s.map(|_| MasterSignal::Interrupt),
            s = self.sigterm.recv() => s.map(|_| MasterSignal::Terminate),
            s = self.sigquit.recv() => s.map(|_| MasterSignal::Quit),
            s = self.sighup.recv() => s.map(|_| MasterSignal::HangUp),
        }
    }

    /// Forward signals to the master until the signal streams close
    pub async fn forward(mut self, master: Master) -> Result<()> {
        let interactive = std::io::stdin().is_terminal();
        debug!(interactive = %interactive, "Signal handlers installed");

        loop {
            let Some(received) = self.next().await else {
                master
                    .abort(AppError::Internal("signal stream closed".to_string()))
                    .await;
                bail!("signal stream closed");
            };
            warn!(signal = %received, "Received signal");
            deliver(&master, received, interactive).await;
        }
    }
}

/// Apply one signal; a fatal failure aborts the master, which then drains
/// its workers and reports the error from `run`
async fn deliver(master: &Master, signal: MasterSignal, interactive: bool) {
    match master.handle_signal(signal, interactive).await {
        Ok(state) => debug!(state = %state, "Signal handled"),
        Err(e) if e.is_fatal() => master.abort(e).await,
        Err(e) => error!(signal = %signal, error = %e, "Signal handling failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::application::{MasterDeps, MasterOptions, MasterTiming};
    use hive_core::domain::{LifecycleState, MasterConfig};
    use hive_core::port::config_source::mocks::MockReloadableConfig;
    use hive_core::port::host_probe::mocks::MockHostProbe;
    use hive_core::port::manager_transport::mocks::MockManagerTransport;
    use hive_core::port::time_provider::SystemTimeProvider;
    use hive_core::port::worker_launcher::mocks::MockWorkerLauncher;
    use hive_core::port::ProcessError;
    use std::sync::Arc;
    use std::time::Duration;

    fn config_with(queues: &str) -> Arc<MockReloadableConfig> {
        let mut config = MasterConfig::default();
        config.workers.insert("web1".to_string(), queues.to_string());
        Arc::new(MockReloadableConfig::new(config))
    }

    fn master(config: Arc<MockReloadableConfig>) -> (Master, Arc<MockWorkerLauncher>) {
        let launcher = Arc::new(MockWorkerLauncher::new());
        let master = Master::new(
            MasterDeps {
                launcher: launcher.clone(),
                config,
                host: Arc::new(MockHostProbe::new("web1", 1)),
                time_provider: Arc::new(SystemTimeProvider),
                transport: Arc::new(MockManagerTransport::refusing()),
            },
            MasterOptions {
                timing: MasterTiming {
                    monitor_tick: Duration::from_millis(5),
                    status_interval: Duration::from_millis(5),
                    reconnect_backoff: Duration::from_millis(5),
                },
                override_queues: None,
            },
        );
        (master, launcher)
    }

    #[tokio::test]
    async fn test_failed_hangup_reload_drains_before_run_returns() {
        let (master, launcher) = master(config_with("a,b"));
        let run = tokio::spawn({
            let master = master.clone();
            async move { master.run().await }
        });
        while master.workers().await.active.len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        launcher.fail_spawns();
        deliver(&master, MasterSignal::HangUp, false).await;

        let result = tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .expect("run must drain the workers and return")
            .unwrap();
        assert!(matches!(
            result,
            Err(hive_core::AppError::Process(ProcessError::SpawnFailed { .. }))
        ));
        assert_eq!(master.lifecycle().await, LifecycleState::ColdShutdown);
        assert!(launcher.live_pids().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_reload_keeps_master_running() {
        let config = config_with("a");
        let (master, launcher) = master(config.clone());
        let run = tokio::spawn({
            let master = master.clone();
            async move { master.run().await }
        });
        while master.workers().await.active.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let pid = master.workers().await.active[0].process_id;

        let mut broken = MasterConfig::default();
        broken.workers.insert("web1".to_string(), "x*a".to_string());
        config.set_source(broken);
        deliver(&master, MasterSignal::HangUp, false).await;

        assert_eq!(master.lifecycle().await, LifecycleState::Running);
        assert!(!master.is_shutdown_pending());
        assert_eq!(launcher.live_pids(), vec![pid]);

        deliver(&master, MasterSignal::Quit, false).await;
        tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(launcher.live_pids().is_empty());
    }
}
