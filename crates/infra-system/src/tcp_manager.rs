// TCP manager transport
// Framing: one JSON document per line in each direction
use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use hive_core::application::constants::MANAGER_IO_TIMEOUT;
use hive_core::domain::{ManagerEndpoint, RawCommand, StatusReport};
use hive_core::port::{LinkError, ManagerConnection, ManagerTransport};

const READ_CHUNK: usize = 4096;
/// Upper bound for one inbound line; longer input is treated as garbage
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Manager transport over plain TCP with newline-delimited JSON
pub struct TcpManagerTransport {
    io_timeout: Duration,
}

impl TcpManagerTransport {
    pub fn new() -> Self {
        Self {
            io_timeout: MANAGER_IO_TIMEOUT,
        }
    }

    pub fn with_timeout(io_timeout: Duration) -> Self {
        Self { io_timeout }
    }
}

impl Default for TcpManagerTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManagerTransport for TcpManagerTransport {
    async fn connect(
        &self,
        endpoint: &ManagerEndpoint,
    ) -> Result<Box<dyn ManagerConnection>, LinkError> {
        let address = (endpoint.host.as_str(), endpoint.port);
        let stream = timeout(self.io_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| LinkError::Timeout)?
            .map_err(|e| LinkError::Connect {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        let _ = stream.set_nodelay(true);

        Ok(Box::new(TcpManagerConnection {
            stream,
            buffer: Vec::new(),
            io_timeout: self.io_timeout,
        }))
    }
}

struct TcpManagerConnection {
    stream: TcpStream,
    buffer: Vec<u8>,
    io_timeout: Duration,
}

impl TcpManagerConnection {
    /// Pull whatever bytes are ready without blocking
    fn fill_buffer(&mut self) -> Result<(), LinkError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.try_read(&mut chunk) {
                Ok(0) => return Err(LinkError::Closed),
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Receive(e.to_string())),
            }
        }
    }

    /// Split off the next complete line, if any
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        Some(line)
    }
}

#[async_trait]
impl ManagerConnection for TcpManagerConnection {
    async fn send_status(&mut self, report: &StatusReport) -> Result<(), LinkError> {
        let mut line =
            serde_json::to_vec(report).map_err(|e| LinkError::Send(e.to_string()))?;
        line.push(b'\n');

        timeout(self.io_timeout, self.stream.write_all(&line))
            .await
            .map_err(|_| LinkError::Timeout)?
            .map_err(|e| LinkError::Send(e.to_string()))
    }

    fn try_receive(&mut self) -> Result<Option<RawCommand>, LinkError> {
        // A close after complete lines still delivers those lines first
        let fill = self.fill_buffer();

        if let Some(line) = self.next_line() {
            return serde_json::from_slice(&line)
                .map(Some)
                .map_err(|e| LinkError::Decode(e.to_string()));
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            self.buffer.clear();
            return Err(LinkError::Decode("line too long".to_string()));
        }

        fill.map(|_| None)
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "Error closing manager connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, ManagerEndpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (
            listener,
            ManagerEndpoint {
                host: "127.0.0.1".to_string(),
                port,
            },
        )
    }

    async fn receive_eventually(conn: &mut dyn ManagerConnection) -> Result<RawCommand, LinkError> {
        for _ in 0..100 {
            if let Some(cmd) = conn.try_receive()? {
                return Ok(cmd);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no command received");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, endpoint) = listener().await;
        drop(listener);

        let result = TcpManagerTransport::new().connect(&endpoint).await;

        assert!(matches!(result, Err(LinkError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_status_is_one_json_line() {
        let (listener, endpoint) = listener().await;
        let mut conn = TcpManagerTransport::new().connect(&endpoint).await.unwrap();
        let (socket, _) = listener.accept().await.unwrap();

        conn.send_status(&StatusReport {
            hostname: "web1".to_string(),
            uptime: 7,
        })
        .await
        .unwrap();

        let mut lines = BufReader::new(socket).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value, serde_json::json!({"hostname": "web1", "uptime": 7}));
    }

    #[tokio::test]
    async fn test_receive_is_non_blocking_and_frames_lines() {
        let (listener, endpoint) = listener().await;
        let mut conn = TcpManagerTransport::new().connect(&endpoint).await.unwrap();
        let (mut socket, _) = listener.accept().await.unwrap();

        assert_eq!(conn.try_receive().unwrap(), None);

        socket
            .write_all(b"{\"command\":\"reload\",\"args\":[],\"kwargs\":{}}\n{\"command\":\"stop_")
            .await
            .unwrap();
        let first = receive_eventually(conn.as_mut()).await.unwrap();
        assert_eq!(first.command, "reload");
        assert_eq!(conn.try_receive().unwrap(), None);

        socket
            .write_all(b"workers\",\"kwargs\":{\"kill\":true}}\n")
            .await
            .unwrap();
        let second = receive_eventually(conn.as_mut()).await.unwrap();
        assert_eq!(second.command, "stop_workers");
        assert_eq!(second.kwargs.get("kill"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn test_malformed_line_is_decode_error() {
        let (listener, endpoint) = listener().await;
        let mut conn = TcpManagerTransport::new().connect(&endpoint).await.unwrap();
        let (mut socket, _) = listener.accept().await.unwrap();

        socket.write_all(b"not json\n").await.unwrap();
        let err = receive_eventually(conn.as_mut()).await.unwrap_err();

        assert!(matches!(err, LinkError::Decode(_)));
        assert!(!err.is_connection_level());
    }

    #[tokio::test]
    async fn test_peer_close_is_reported() {
        let (listener, endpoint) = listener().await;
        let mut conn = TcpManagerTransport::new().connect(&endpoint).await.unwrap();
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);

        let err = receive_eventually(conn.as_mut()).await.unwrap_err();

        assert_eq!(err, LinkError::Closed);
    }
}
