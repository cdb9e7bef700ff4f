// Master constants (No magic values)
use std::time::Duration;

/// Queue used when the host has no assignment and no override is given
pub const DEFAULT_QUEUE: &str = "default";

/// Interval between two monitor passes over the worker set (1s)
pub const MONITOR_TICK: Duration = Duration::from_secs(1);

/// Interval between two status reports to the manager (1s)
pub const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Wait before reconnecting after a manager link failure (1s)
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Deadline for opening / writing to the manager connection (5s)
pub const MANAGER_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `Master::run` waits for the manager link to stop after drain
pub const LINK_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Environment variable carrying the bound queue name to a worker
pub const WORKER_QUEUE_ENV: &str = "HIVE_QUEUE";

/// Environment variable carrying the max load hint to a worker
pub const WORKER_MAX_LOAD_ENV: &str = "HIVE_MAX_LOAD";
