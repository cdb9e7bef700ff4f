// Application Layer - Supervision use cases

pub mod constants;
pub mod manager_link;
pub mod master;
mod shutdown;
pub mod supervisor;

// Re-exports
pub use manager_link::ManagerLink;
pub use master::{Master, MasterDeps, MasterOptions, MasterTiming};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use supervisor::{Supervisor, TickReport};
