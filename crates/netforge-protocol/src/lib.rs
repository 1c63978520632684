//! Wire boundary for netforge.
//!
//! This crate defines what travels between a channel and its peer:
//!
//! - **Types** ([`Packet`], [`PacketId`], [`PacketHeader`]) — the message
//!   unit and the fixed frame descriptor.
//! - **Codec** ([`PacketCodec`] trait, [`LengthPrefixedCodec`]) — how
//!   packets become bytes and back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong in between.
//!
//! The protocol layer knows nothing about sockets or channels; it only
//! translates. The channel feeds it buffers and routes whatever comes out.

mod codec;
mod error;
mod types;

pub use codec::{DEFAULT_MAX_BODY, HEADER_LEN, LengthPrefixedCodec, MAGIC, PacketCodec};
pub use error::ProtocolError;
pub use types::{Packet, PacketHeader, PacketId};
