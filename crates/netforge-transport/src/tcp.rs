//! TCP transport implementation over `tokio::net::TcpStream`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, ServiceKind, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Read buffer size per `recv` call.
const READ_CHUNK: usize = 8 * 1024;

/// A TCP [`Transport`] that opens outgoing stream connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl TcpTransport {
    /// Creates a new TCP transport.
    pub fn new() -> Self {
        Self
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    async fn connect(
        &self,
        address: &str,
        port: u16,
    ) -> Result<Self::Connection, TransportError> {
        let stream = TcpStream::connect((address, port))
            .await
            .map_err(TransportError::ConnectFailed)?;
        stream
            .set_nodelay(true)
            .map_err(TransportError::ConnectFailed)?;

        let local = stream.local_addr().ok();
        let remote = stream.peer_addr().ok();
        let (read, write) = stream.into_split();

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, ?remote, "opened TCP connection");

        Ok(TcpConnection {
            id,
            local,
            remote,
            read: Mutex::new(read),
            write: Mutex::new(write),
        })
    }

    fn service_kind(&self) -> ServiceKind {
        ServiceKind::Tcp
    }
}

/// A single outgoing TCP connection.
pub struct TcpConnection {
    id: ConnectionId,
    local: Option<SocketAddr>,
    remote: Option<SocketAddr>,
    read: Mutex<OwnedReadHalf>,
    write: Mutex<OwnedWriteHalf>,
}

impl Connection for TcpConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.write
            .lock()
            .await
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = self
            .read
            .lock()
            .await
            .read(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.write
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote
    }
}
