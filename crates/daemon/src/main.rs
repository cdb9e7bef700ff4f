//! Hive Master - Main Entry Point
//! Supervises one worker process per configured queue

mod signals;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hive_core::application::{Master, MasterDeps, MasterOptions};
use hive_core::domain::MasterConfig;
use hive_core::port::time_provider::SystemTimeProvider;
use hive_core::port::{ConfigSource, StaticConfigSource};
use hive_core::VERSION;
use hive_infra_system::subprocess_launcher::DEFAULT_ENV_ALLOWLIST;
use hive_infra_system::{FileConfigSource, SubprocessLauncher, SystemHostProbe, TcpManagerTransport};
use signals::SignalListener;

const DEFAULT_CONFIG_PATH: &str = "~/.hive/config.toml";
const LOG_FILE_NAME: &str = "hive-master.log";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let _log_guard = init_logging()?;

    info!("Hive master v{} starting...", VERSION);

    // 2. Load configuration
    let config = load_config()?;
    let worker_command = worker_command(
        std::env::var("HIVE_WORKER_COMMAND").ok(),
        &config.current(),
    );
    if worker_command.is_empty() {
        anyhow::bail!("No worker command configured (set worker_command or HIVE_WORKER_COMMAND)");
    }
    let override_queues = std::env::var("HIVE_QUEUES").ok().filter(|q| !q.trim().is_empty());

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let launcher = Arc::new(SubprocessLauncher::new(
        worker_command,
        DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
        time_provider.clone(),
    ));

    let master = Master::new(
        MasterDeps {
            launcher,
            config,
            host: Arc::new(SystemHostProbe::new()),
            time_provider,
            transport: Arc::new(TcpManagerTransport::new()),
        },
        MasterOptions {
            override_queues,
            ..Default::default()
        },
    );

    // 4. Install signal handlers before any worker exists
    let signals = SignalListener::install()?;

    // 5. Run until every worker has been drained
    let forwarder = tokio::spawn(signals.forward(master.clone()));
    let result = master.run().await;
    forwarder.abort();
    result.context("Master failed")?;

    info!("Shutdown complete.");

    Ok(())
}

/// Logging: `HIVE_LOG_FORMAT=json|pretty`, optional daily file in `HIVE_LOG_DIR`
fn init_logging() -> Result<Option<WorkerGuard>> {
    let log_format = std::env::var("HIVE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("hive=info"))
        .context("Failed to create env filter")?;

    let (file_layer, guard) = match std::env::var("HIVE_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    match log_format.as_str() {
        // Production: JSON structured logging
        "json" => registry.with(fmt::layer().json()).init(),
        // Development: Pretty formatting with colors
        _ => registry.with(fmt::layer().pretty()).init(),
    }

    Ok(guard)
}

/// Configuration from `HIVE_CONFIG` (reloadable) or built-in defaults
fn load_config() -> Result<Arc<dyn ConfigSource>> {
    let explicit = std::env::var("HIVE_CONFIG").ok();
    let path = explicit
        .clone()
        .unwrap_or_else(|| shellexpand::tilde(DEFAULT_CONFIG_PATH).into_owned());

    if explicit.is_none() && !Path::new(&path).exists() {
        warn!(path = %path, "No configuration file, using defaults (reload disabled)");
        return Ok(Arc::new(StaticConfigSource::new(MasterConfig::default())));
    }

    let source = FileConfigSource::open(&path)?;
    Ok(Arc::new(source))
}

/// Worker command: whitespace-split override, else the configured one
fn worker_command(env_override: Option<String>, config: &MasterConfig) -> Vec<String> {
    match env_override {
        Some(cmd) if !cmd.trim().is_empty() => {
            cmd.split_whitespace().map(str::to_string).collect()
        }
        _ => config.worker_command.clone(),
    }
}
