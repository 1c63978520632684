//! Client transport abstraction layer for netforge.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! different network protocols. The channel core treats a transport purely
//! as a byte pipe plus a connection-state signal: open it, write byte
//! buffers, read byte buffers, close it. Framing and packet semantics live
//! a layer up.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`
//!
//! The trait methods are declared as `impl Future + Send` rather than
//! `async fn` so the channel core can drive any transport from spawned
//! tasks; implementations still write plain `async fn`.

mod error;
mod memory;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryConnection, MemoryTransport, RemoteEnd};
pub use tcp::{TcpConnection, TcpTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The kind of network service a transport speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// Raw TCP byte stream.
    Tcp,
    /// WebSocket (binary messages).
    WebSocket,
    /// In-process pipe, for tests and local loopback.
    Memory,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::WebSocket => write!(f, "websocket"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// IP address family of an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

impl AddressFamily {
    /// Derives the family from a socket address.
    pub fn of(addr: &SocketAddr) -> Self {
        if addr.is_ipv4() { Self::V4 } else { Self::V6 }
    }
}

/// Opens outgoing connections to a remote host.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Connects to the remote host.
    ///
    /// `address` is a hostname or IP literal; resolution happens here, not
    /// in the channel.
    fn connect(
        &self,
        address: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// The service kind this transport provides.
    fn service_kind(&self) -> ServiceKind;
}

/// A single established connection that can send and receive bytes.
pub trait Connection: Send + Sync + 'static {
    /// Sends data to the remote peer.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next chunk of bytes from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed. Chunk
    /// boundaries carry no meaning — stream transports may split or merge
    /// writes arbitrarily.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The local socket address, if the transport has one.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// The remote socket address, if the transport has one.
    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_service_kind_display() {
        assert_eq!(ServiceKind::Tcp.to_string(), "tcp");
        assert_eq!(ServiceKind::WebSocket.to_string(), "websocket");
        assert_eq!(ServiceKind::Memory.to_string(), "memory");
    }

    #[test]
    fn test_address_family_of() {
        let v4: SocketAddr = "127.0.0.1:80".parse().unwrap();
        let v6: SocketAddr = "[::1]:80".parse().unwrap();
        assert_eq!(AddressFamily::of(&v4), AddressFamily::V4);
        assert_eq!(AddressFamily::of(&v6), AddressFamily::V6);
    }
}
