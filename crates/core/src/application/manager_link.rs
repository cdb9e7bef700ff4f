// Manager Link - best-effort control-plane client
//
// Reports status to the remote manager and executes the commands it sends.
// Transport failures never reach the monitor loop: the link reconnects with
// a fixed backoff until shutdown is pending. Supervision failures raised by a
// command abort the master.

use crate::application::master::{Master, MasterTiming};
use crate::application::shutdown::ShutdownToken;
use crate::domain::{ManagerCommand, RawCommand};
use crate::port::{LinkError, ManagerConnection, ManagerTransport};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

pub struct ManagerLink {
    master: Master,
    transport: Arc<dyn ManagerTransport>,
    timing: MasterTiming,
}

impl ManagerLink {
    pub fn new(master: Master, transport: Arc<dyn ManagerTransport>, timing: MasterTiming) -> Self {
        Self {
            master,
            transport,
            timing,
        }
    }

    /// Connect / report / reconnect until shutdown is pending
    pub async fn run(self) {
        let mut shutdown = self.master.shutdown_token();

        while !shutdown.is_shutdown() {
            let endpoint = self.master.manager_endpoint();
            match self.transport.connect(&endpoint).await {
                Ok(mut conn) => {
                    info!(endpoint = %endpoint, "Connected to manager");
                    let result = self.session(conn.as_mut(), &mut shutdown).await;
                    conn.close().await;
                    if let Err(e) = result {
                        warn!(endpoint = %endpoint, error = %e, "Manager connection lost");
                    }
                }
                Err(e) => {
                    debug!(endpoint = %endpoint, error = %e, "Cannot connect to manager");
                }
            }

            tokio::select! {
                _ = sleep(self.timing.reconnect_backoff) => {},
                _ = shutdown.wait() => break,
            }
        }

        debug!("Manager link stopped");
    }

    /// Report status and poll for commands on one open connection
    async fn session(
        &self,
        conn: &mut dyn ManagerConnection,
        shutdown: &mut ShutdownToken,
    ) -> Result<(), LinkError> {
        while !shutdown.is_shutdown() {
            conn.send_status(&self.master.status()).await?;

            match conn.try_receive() {
                Ok(Some(raw)) => self.execute(raw).await,
                Ok(None) => {}
                Err(e) if !e.is_connection_level() => {
                    warn!(error = %e, "Discarding malformed manager message");
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                _ = sleep(self.timing.status_interval) => {},
                _ = shutdown.wait() => break,
            }
        }
        Ok(())
    }

    /// Execute an allow-listed command; anything else is logged and dropped
    async fn execute(&self, raw: RawCommand) {
        let command = match ManagerCommand::try_from(&raw) {
            Ok(command) => command,
            Err(e) => {
                warn!(command = %raw.command, error = %e, "Rejected manager command");
                return;
            }
        };

        info!(command = %command, "Executing manager command");
        match self.master.dispatch(command).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => self.master.abort(e).await,
            Err(e) => error!(command = %command, error = %e, "Manager command failed"),
        }
    }
}
