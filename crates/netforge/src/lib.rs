//! # Netforge
//!
//! Client-side network channel layer for games and other long-lived
//! connections.
//!
//! A [`NetworkChannel`] owns one logical connection: it queues outgoing
//! packets, reassembles and decodes inbound frames, supervises a
//! heartbeat, and dispatches decoded packets to registered handlers. All
//! of that happens inside [`NetworkChannel::update`], driven by the
//! application's own loop, so handler code never runs on a background
//! thread. The transport underneath (TCP, WebSocket, or an in-process
//! pipe) and the packet codec are both pluggable trait objects from the
//! companion crates.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netforge::{NetworkChannel, NullEvents};
//! use netforge_protocol::LengthPrefixedCodec;
//! use netforge_transport::TcpTransport;
//!
//! # async fn run() -> Result<(), netforge::ChannelError> {
//! let mut channel = NetworkChannel::new(
//!     "game",
//!     TcpTransport,
//!     LengthPrefixedCodec::new(),
//!     Box::new(NullEvents),
//! );
//! channel.connect("127.0.0.1", 7777, None)?;
//! loop {
//!     channel.update(0.016, 0.016);
//!     tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//! }
//! # }
//! ```

mod channel;
mod error;
mod events;
mod heartbeat;
mod manager;
mod registry;

pub use channel::{DEFAULT_SEND_CAPACITY, NetworkChannel};
pub use error::{ChannelError, NetworkErrorCode};
pub use events::{ChannelEvents, NullEvents};
pub use heartbeat::{
    DEFAULT_INTERVAL, DEFAULT_MAX_MISSED, HeartbeatConfig, HeartbeatState, HeartbeatSupervisor,
    HeartbeatTick,
};
pub use manager::NetworkManager;
pub use registry::{DefaultHandler, HandlerRegistry, PacketHandler};
