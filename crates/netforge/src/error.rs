//! Error types for the channel core.
//!
//! Two surfaces exist on purpose: [`ChannelError`] is what the caller gets
//! back synchronously from lifecycle misuse (`connect` on a connected
//! channel, `send` before connect), while [`NetworkErrorCode`] classifies
//! failures delivered asynchronously through the
//! [`ChannelEvents`](crate::ChannelEvents) callback surface during
//! `update`. Nothing in the pipeline panics or tears down the host.

use std::fmt;

use netforge_protocol::ProtocolError;
use netforge_transport::TransportError;

/// Errors returned synchronously by channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The target address could not be parsed.
    #[error("invalid address: {0}")]
    AddressInvalid(String),

    /// `connect` was called while a connection exists or is in flight.
    #[error("channel is already connected")]
    AlreadyConnected,

    /// The operation requires an established connection.
    #[error("channel is not connected")]
    NotConnected,

    /// The bounded send queue is at capacity; the packet was discarded.
    #[error("send queue full ({capacity} packets)")]
    SendQueueFull { capacity: usize },

    /// The channel was shut down and is unusable.
    #[error("channel was shut down")]
    Shutdown,

    /// A channel with this name already exists in the manager.
    #[error("duplicate channel name: {0}")]
    DuplicateChannel(String),

    /// A codec failure surfaced through a synchronous path.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A transport failure surfaced through a synchronous path.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Classification of failures reported through
/// [`ChannelEvents::on_error`](crate::ChannelEvents::on_error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorCode {
    /// Malformed or unresolvable target address.
    AddressInvalid,
    /// Connect called on an already-connected channel.
    AlreadyConnected,
    /// Send or similar called without an established connection.
    NotConnected,
    /// The bounded send queue rejected a packet.
    QueueFull,
    /// The transport failed to establish the connection.
    ConnectFailed,
    /// The transport failed while writing.
    SendFailed,
    /// The transport failed while reading.
    ReceiveFailed,
    /// Corrupt or invalid data on the wire.
    Protocol,
}

impl fmt::Display for NetworkErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AddressInvalid => "address-invalid",
            Self::AlreadyConnected => "already-connected",
            Self::NotConnected => "not-connected",
            Self::QueueFull => "queue-full",
            Self::ConnectFailed => "connect-failed",
            Self::SendFailed => "send-failed",
            Self::ReceiveFailed => "receive-failed",
            Self::Protocol => "protocol",
        };
        f.write_str(s)
    }
}
