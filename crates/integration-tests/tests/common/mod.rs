//! Shared fixtures for the integration tests
//!
//! Every master here runs real worker processes through the subprocess
//! launcher with a fast monitor tick.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hive_core::application::{Master, MasterDeps, MasterOptions, MasterTiming};
use hive_core::domain::{ManagerEndpoint, MasterConfig, WorkerSet};
use hive_core::port::host_probe::mocks::MockHostProbe;
use hive_core::port::time_provider::SystemTimeProvider;
use hive_core::port::{ConfigSource, StaticConfigSource};
use hive_infra_system::subprocess_launcher::DEFAULT_ENV_ALLOWLIST;
use hive_infra_system::{SubprocessLauncher, TcpManagerTransport};

pub const HOSTNAME: &str = "web1";

const POLL_ATTEMPTS: usize = 250;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub fn fast_timing() -> MasterTiming {
    MasterTiming {
        monitor_tick: Duration::from_millis(20),
        status_interval: Duration::from_millis(30),
        reconnect_backoff: Duration::from_millis(50),
    }
}

/// Endpoint with nothing listening on it
pub fn refused_endpoint() -> ManagerEndpoint {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    ManagerEndpoint {
        host: "127.0.0.1".to_string(),
        port,
    }
}

pub fn static_config(manager: ManagerEndpoint) -> Arc<dyn ConfigSource> {
    Arc::new(StaticConfigSource::new(MasterConfig {
        manager,
        max_load: Some(2),
        ..Default::default()
    }))
}

pub fn master(
    command: &[&str],
    config: Arc<dyn ConfigSource>,
    override_queues: Option<&str>,
) -> Master {
    let time_provider = Arc::new(SystemTimeProvider);
    let launcher = Arc::new(SubprocessLauncher::new(
        command.iter().map(|s| s.to_string()).collect(),
        DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
        time_provider.clone(),
    ));

    Master::new(
        MasterDeps {
            launcher,
            config,
            host: Arc::new(MockHostProbe::new(HOSTNAME, 2)),
            time_provider,
            transport: Arc::new(TcpManagerTransport::with_timeout(Duration::from_secs(1))),
        },
        MasterOptions {
            timing: fast_timing(),
            override_queues: override_queues.map(str::to_string),
        },
    )
}

/// Poll the worker bookkeeping until `check` holds
pub async fn wait_for_workers(master: &Master, check: impl Fn(&WorkerSet) -> bool) -> bool {
    for _ in 0..POLL_ATTEMPTS {
        if check(&master.workers().await) {
            return true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    false
}

pub async fn wait_until(check: impl Fn() -> bool) -> bool {
    for _ in 0..POLL_ATTEMPTS {
        if check() {
            return true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    false
}

/// True if the process no longer exists or is a zombie awaiting its reaper
pub fn process_gone(pid: i32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return true;
    };
    // Field 3, after the parenthesised command name
    match stat.rsplit_once(')') {
        Some((_, rest)) => matches!(rest.trim_start().chars().next(), Some('Z') | Some('X')),
        None => false,
    }
}

/// Pid written to `path` by a worker script
pub async fn read_pid_file(path: &Path) -> Option<i32> {
    for _ in 0..POLL_ATTEMPTS {
        if let Some(pid) = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            return Some(pid);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    None
}
