//! In-process memory transport.
//!
//! [`MemoryTransport::pair`] produces a transport whose single connection
//! is wired to a [`RemoteEnd`] held by the caller. Tests and local demos
//! play the remote peer by pushing and pulling byte chunks on that end —
//! no sockets, no timing dependence on the OS network stack.

use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{Connection, ConnectionId, ServiceKind, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A [`Transport`] backed by in-process byte pipes.
///
/// Holds exactly one pre-wired connection; the first `connect` call hands
/// it out, subsequent calls fail.
pub struct MemoryTransport {
    conn: StdMutex<Option<MemoryConnection>>,
}

impl MemoryTransport {
    /// Creates a connected transport/peer pair.
    pub fn pair() -> (Self, RemoteEnd) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let conn = MemoryConnection {
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            tx: StdMutex::new(Some(out_tx)),
            rx: Mutex::new(in_rx),
        };
        let remote = RemoteEnd {
            tx: StdMutex::new(Some(in_tx)),
            rx: Mutex::new(out_rx),
        };

        (
            Self {
                conn: StdMutex::new(Some(conn)),
            },
            remote,
        )
    }
}

impl Transport for MemoryTransport {
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        _address: &str,
        _port: u16,
    ) -> Result<Self::Connection, TransportError> {
        self.conn
            .lock()
            .expect("memory transport lock poisoned")
            .take()
            .ok_or_else(|| {
                TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "memory endpoint already taken",
                ))
            })
    }

    fn service_kind(&self) -> ServiceKind {
        ServiceKind::Memory
    }
}

/// The channel side of a memory pipe.
pub struct MemoryConnection {
    id: ConnectionId,
    tx: StdMutex<Option<UnboundedSender<Vec<u8>>>>,
    rx: Mutex<UnboundedReceiver<Vec<u8>>>,
}

impl Connection for MemoryConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let tx = self.tx.lock().expect("memory connection lock poisoned");
        match tx.as_ref() {
            Some(tx) if tx.send(data.to_vec()).is_ok() => Ok(()),
            _ => Err(TransportError::ConnectionClosed("memory peer gone".into())),
        }
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.tx
            .lock()
            .expect("memory connection lock poisoned")
            .take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// The peer side of a memory pipe, driven directly by the test/demo.
pub struct RemoteEnd {
    tx: StdMutex<Option<UnboundedSender<Vec<u8>>>>,
    rx: Mutex<UnboundedReceiver<Vec<u8>>>,
}

impl RemoteEnd {
    /// Delivers a chunk of bytes to the channel as if it arrived from the
    /// network. Chunk boundaries are preserved as-is.
    pub fn push(&self, data: impl Into<Vec<u8>>) -> Result<(), TransportError> {
        let tx = self.tx.lock().expect("remote end lock poisoned");
        match tx.as_ref() {
            Some(tx) if tx.send(data.into()).is_ok() => Ok(()),
            _ => Err(TransportError::ConnectionClosed("channel side gone".into())),
        }
    }

    /// Receives the next chunk the channel wrote, or `None` once the
    /// channel side closed.
    pub async fn pull(&self) -> Option<Vec<u8>> {
        self.rx.lock().await.recv().await
    }

    /// Receives the next written chunk without waiting.
    pub fn try_pull(&self) -> Option<Vec<u8>> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }

    /// Closes the remote side; the channel observes a clean EOF.
    pub fn close(&self) {
        self.tx.lock().expect("remote end lock poisoned").take();
    }
}
