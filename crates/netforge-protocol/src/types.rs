//! Core packet types for the netforge wire boundary.
//!
//! A [`Packet`] is one application-level message: an opcode plus an opaque
//! payload. The channel never looks inside the payload — interpretation
//! belongs to the registered handlers and the codec. A [`PacketHeader`] is
//! the fixed leading descriptor a codec parses off the front of each wire
//! frame to learn how many more bytes to wait for.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[cfg(feature = "json")]
use crate::ProtocolError;

/// Opcode identifying a packet's message type.
///
/// Newtype over `u16` so a packet id can't be confused with a body length
/// or a port. `#[serde(transparent)]` keeps it a plain number on the wire
/// when it appears inside a serialized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketId(pub u16);

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// One application-level message, tagged by its opcode.
///
/// Packets are immutable once constructed: build one, hand it to
/// [`NetworkChannel::send`], and the channel owns it until it is
/// serialized. Received packets are owned by the channel until handler
/// dispatch completes.
///
/// The payload is [`Bytes`], so cloning a packet is cheap and decoded
/// frames can share the receive buffer without copying.
///
/// [`NetworkChannel::send`]: ../netforge/struct.NetworkChannel.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: PacketId,
    payload: Bytes,
}

impl Packet {
    /// Creates a packet from an opcode and a raw payload.
    pub fn new(id: PacketId, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Creates a packet with an empty payload (pure-signal messages).
    pub fn empty(id: PacketId) -> Self {
        Self {
            id,
            payload: Bytes::new(),
        }
    }

    /// Creates a packet whose payload is the JSON encoding of `value`.
    ///
    /// This is the typed seam for applications that don't want to hand-roll
    /// payload bytes: any `Serialize` type becomes a packet body.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    #[cfg(feature = "json")]
    pub fn json<T: Serialize>(id: PacketId, value: &T) -> Result<Self, ProtocolError> {
        let payload = serde_json::to_vec(value).map_err(ProtocolError::Encode)?;
        Ok(Self::new(id, payload))
    }

    /// Decodes the payload as JSON into a typed value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the payload is not valid JSON
    /// for `T`.
    #[cfg(feature = "json")]
    pub fn payload_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_slice(&self.payload).map_err(ProtocolError::Decode)
    }

    /// The packet's opcode.
    pub fn id(&self) -> PacketId {
        self.id
    }

    /// The raw payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload length in bytes.
    pub fn body_len(&self) -> usize {
        self.payload.len()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.id, self.payload.len())
    }
}

/// Fixed leading descriptor of a wire frame.
///
/// Produced by [`PacketCodec::decode_header`] from the first
/// [`PacketCodec::header_len`] bytes of a frame and consumed immediately to
/// decide how many body bytes to await. Never persisted past one parse
/// cycle.
///
/// A header with `valid == false` means the input was truncated — the
/// channel should keep the buffered bytes and wait for more. It is *not* a
/// protocol violation; corrupt input is reported as an error instead.
///
/// [`PacketCodec::decode_header`]: crate::PacketCodec::decode_header
/// [`PacketCodec::header_len`]: crate::PacketCodec::header_len
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Opcode of the packet(s) carried by the frame body.
    pub id: PacketId,
    /// Length of the frame body in bytes. Zero is legal.
    pub body_len: usize,
    /// `false` when the header could not be fully read yet.
    pub valid: bool,
}

impl PacketHeader {
    /// Creates a valid header.
    pub fn new(id: PacketId, body_len: usize) -> Self {
        Self {
            id,
            body_len,
            valid: true,
        }
    }

    /// Creates the "need more bytes" marker header.
    pub fn invalid() -> Self {
        Self {
            id: PacketId(0),
            body_len: 0,
            valid: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_id_display() {
        assert_eq!(PacketId(100).to_string(), "op-100");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_packet_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PacketId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_packet_new_and_accessors() {
        let p = Packet::new(PacketId(7), &b"hello"[..]);
        assert_eq!(p.id(), PacketId(7));
        assert_eq!(p.payload().as_ref(), b"hello");
        assert_eq!(p.body_len(), 5);
    }

    #[test]
    fn test_packet_empty_has_no_body() {
        let p = Packet::empty(PacketId(1));
        assert_eq!(p.body_len(), 0);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_packet_json_round_trip() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Login {
            user: String,
            token: u64,
        }

        let msg = Login {
            user: "kae".into(),
            token: 99,
        };
        let p = Packet::json(PacketId(10), &msg).unwrap();
        let decoded: Login = p.payload_json().unwrap();
        assert_eq!(decoded, msg);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_packet_payload_json_rejects_garbage() {
        let p = Packet::new(PacketId(10), &b"not json"[..]);
        let result: Result<u32, _> = p.payload_json();
        assert!(result.is_err());
    }

    #[test]
    fn test_header_invalid_marker() {
        let h = PacketHeader::invalid();
        assert!(!h.valid);
        assert_eq!(h.body_len, 0);
    }

    #[test]
    fn test_header_new_is_valid() {
        let h = PacketHeader::new(PacketId(3), 128);
        assert!(h.valid);
        assert_eq!(h.id, PacketId(3));
        assert_eq!(h.body_len, 128);
    }
}
