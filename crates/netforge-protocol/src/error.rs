//! Error types for the protocol layer.
//!
//! Codec failures never cross the channel boundary as panics: the channel
//! turns them into error callbacks and keeps draining. A `ProtocolError`
//! always means "this frame/packet", never "this connection".

use crate::PacketId;

/// Errors produced while encoding or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a packet payload failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserializing a packet payload failed.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The leading bytes of a frame are not a frame header.
    ///
    /// Distinct from a truncated header: truncation yields an invalid
    /// [`PacketHeader`](crate::PacketHeader) so the channel waits for more
    /// bytes, while this error means the stream is desynchronized.
    #[error("bad frame magic: {0:02x?}")]
    BadMagic([u8; 2]),

    /// A frame declared a body larger than the codec allows.
    #[error("frame body of {len} bytes exceeds limit of {max}")]
    BodyTooLarge { len: usize, max: usize },

    /// The codec does not know how to serialize this packet.
    #[error("unsupported packet {0}")]
    UnsupportedPacket(PacketId),

    /// A frame body did not decode into well-formed packets.
    #[error("malformed frame body: {0}")]
    MalformedBody(String),
}
