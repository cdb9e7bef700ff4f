// Master Shutdown Channel
// Monotone: once shutdown is requested it is never reset

use tokio::sync::watch;

/// Shutdown signal observed by the monitor loop and the manager link
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for shutdown signal (returns immediately if already requested)
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|pending| *pending).await;
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Mark shutdown pending for every token holder
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// New token observing this sender
    pub fn subscribe(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_late_subscriber_sees_shutdown() {
        let (tx, token) = shutdown_channel();
        assert!(!token.is_shutdown());

        tx.shutdown();
        let mut late = tx.subscribe();

        assert!(late.is_shutdown());
        tokio::time::timeout(Duration::from_millis(100), late.wait())
            .await
            .expect("wait must return once shutdown is pending");
    }

    #[tokio::test]
    async fn test_wait_wakes_on_shutdown() {
        let (tx, mut token) = shutdown_channel();
        let waiter = tokio::spawn(async move {
            token.wait().await;
            token.is_shutdown()
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.shutdown();

        assert!(waiter.await.unwrap());
        assert!(tx.is_shutdown());
    }
}
