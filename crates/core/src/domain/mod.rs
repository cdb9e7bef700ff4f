// Domain Layer - Pure supervision logic and entities

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod queue_spec;
pub mod worker;

// Re-exports
pub use config::{ManagerEndpoint, MasterConfig};
pub use error::DomainError;
pub use lifecycle::{LifecycleAction, LifecycleState, MasterSignal};
pub use message::{ManagerCommand, RawCommand, StatusReport};
pub use queue_spec::{parse_queue_spec, QueueName};
pub use worker::{WorkerHandle, WorkerSet};
