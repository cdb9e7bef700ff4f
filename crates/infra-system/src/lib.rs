// Hive Infrastructure - System Adapters
// Implements: WorkerLauncher, HostProbe, ConfigSource, ManagerTransport

pub mod file_config;
pub mod host_probe_impl;
#[cfg(unix)]
pub mod subprocess_launcher; // process groups + POSIX signals
pub mod tcp_manager;

pub use file_config::FileConfigSource;
pub use host_probe_impl::SystemHostProbe;
#[cfg(unix)]
pub use subprocess_launcher::SubprocessLauncher;
pub use tcp_manager::TcpManagerTransport;
