// Port Layer - Interfaces for external dependencies

pub mod config_source;
pub mod host_probe;
pub mod manager_transport;
pub mod time_provider; // For deterministic testing
pub mod worker_launcher;

// Re-exports
pub use config_source::{ConfigSource, StaticConfigSource};
pub use host_probe::HostProbe;
pub use manager_transport::{LinkError, ManagerConnection, ManagerTransport};
pub use time_provider::TimeProvider;
pub use worker_launcher::{ProcessError, WorkerLauncher};
