// Manager Transport Port
// Persistent stream to the remote manager carrying self-framed messages

use crate::domain::{ManagerEndpoint, RawCommand, StatusReport};
use async_trait::async_trait;
use thiserror::Error;

/// Control-plane link errors (always recoverable by reconnecting)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Cannot connect to manager at {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("Manager connection timed out")]
    Timeout,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Connection closed by manager")]
    Closed,

    /// A complete message arrived but could not be decoded
    #[error("Malformed message: {0}")]
    Decode(String),
}

impl LinkError {
    /// True when the connection is unusable and must be re-established
    pub fn is_connection_level(&self) -> bool {
        !matches!(self, LinkError::Decode(_))
    }
}

/// Manager transport (connection factory)
#[async_trait]
pub trait ManagerTransport: Send + Sync {
    /// Open a connection to the manager
    ///
    /// # Errors
    /// - LinkError::Connect if refused or unreachable
    /// - LinkError::Timeout if the connect deadline passes
    async fn connect(
        &self,
        endpoint: &ManagerEndpoint,
    ) -> Result<Box<dyn ManagerConnection>, LinkError>;
}

/// One open manager connection
#[async_trait]
pub trait ManagerConnection: Send {
    /// Send one complete status message
    async fn send_status(&mut self, report: &StatusReport) -> Result<(), LinkError>;

    /// Non-blocking receive of one complete command
    ///
    /// Returns `Ok(None)` when no complete message is available yet.
    fn try_receive(&mut self) -> Result<Option<RawCommand>, LinkError>;

    async fn close(&mut self);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    #[derive(Default)]
    struct Shared {
        attempts: Mutex<Vec<Instant>>,
        inbound: Mutex<VecDeque<Result<RawCommand, LinkError>>>,
        sent: Mutex<Vec<StatusReport>>,
        closed: Mutex<usize>,
    }

    /// Scripted manager transport
    pub struct MockManagerTransport {
        refuse: AtomicBool,
        shared: Arc<Shared>,
    }

    impl MockManagerTransport {
        /// Transport whose manager accepts connections
        pub fn accepting() -> Self {
            Self {
                refuse: AtomicBool::new(false),
                shared: Arc::new(Shared::default()),
            }
        }

        /// Transport whose manager refuses every connection
        pub fn refusing() -> Self {
            let transport = Self::accepting();
            transport.refuse.store(true, Ordering::SeqCst);
            transport
        }

        pub fn set_refusing(&self, refuse: bool) {
            self.refuse.store(refuse, Ordering::SeqCst);
        }

        /// Queue a command for the master to receive
        pub fn push_command(&self, command: RawCommand) {
            self.shared.inbound.lock().unwrap().push_back(Ok(command));
        }

        /// Queue a receive error (e.g. a reset connection)
        pub fn push_error(&self, error: LinkError) {
            self.shared.inbound.lock().unwrap().push_back(Err(error));
        }

        pub fn connect_attempts(&self) -> Vec<Instant> {
            self.shared.attempts.lock().unwrap().clone()
        }

        pub fn sent(&self) -> Vec<StatusReport> {
            self.shared.sent.lock().unwrap().clone()
        }

        pub fn close_count(&self) -> usize {
            *self.shared.closed.lock().unwrap()
        }
    }

    #[async_trait]
    impl ManagerTransport for MockManagerTransport {
        async fn connect(
            &self,
            endpoint: &ManagerEndpoint,
        ) -> Result<Box<dyn ManagerConnection>, LinkError> {
            self.shared.attempts.lock().unwrap().push(Instant::now());
            if self.refuse.load(Ordering::SeqCst) {
                return Err(LinkError::Connect {
                    endpoint: endpoint.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            Ok(Box::new(MockConnection {
                shared: Arc::clone(&self.shared),
            }))
        }
    }

    struct MockConnection {
        shared: Arc<Shared>,
    }

    #[async_trait]
    impl ManagerConnection for MockConnection {
        async fn send_status(&mut self, report: &StatusReport) -> Result<(), LinkError> {
            self.shared.sent.lock().unwrap().push(report.clone());
            Ok(())
        }

        fn try_receive(&mut self) -> Result<Option<RawCommand>, LinkError> {
            self.shared.inbound.lock().unwrap().pop_front().transpose()
        }

        async fn close(&mut self) {
            *self.shared.closed.lock().unwrap() += 1;
        }
    }
}
