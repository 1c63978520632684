//! The pluggable codec boundary between packets and wire bytes.
//!
//! A codec owns the wire format; the channel owns the pipeline. The channel
//! asks the codec to (a) serialize outbound packets, (b) parse a
//! [`PacketHeader`] off the front of the inbound buffer, and (c) turn a
//! complete frame body into zero or more packets. Swapping the codec swaps
//! the wire format — length-prefixed binary here, JSON lines or protobuf
//! elsewhere — without touching channel logic.
//!
//! Two failure modes are deliberately kept apart:
//! - *truncation* (not enough bytes yet) → an invalid header, the channel
//!   waits for the next tick;
//! - *corruption* (bytes that can never be a frame) → a [`ProtocolError`],
//!   surfaced through the channel's error callback while later buffered
//!   frames keep flowing.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Packet, PacketHeader, PacketId, ProtocolError};

/// Strategy trait translating packets to and from wire frames.
///
/// Implementations must be `Send + Sync + 'static`: the channel is driven
/// from one thread, but transports may move the codec's output across task
/// boundaries.
pub trait PacketCodec: Send + Sync + 'static {
    /// Size in bytes of the fixed frame header this codec writes.
    ///
    /// The channel will not call [`decode_header`](Self::decode_header)
    /// semantics into a shorter prefix — but codecs must still tolerate
    /// being handed fewer bytes and answer with an invalid header.
    fn header_len(&self) -> usize;

    /// Serializes one packet, appending its full frame to `dst`.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the packet cannot be represented in
    /// this wire format. The channel reports the failure and moves on; it
    /// never aborts the send loop.
    fn encode(&self, packet: &Packet, dst: &mut BytesMut) -> Result<(), ProtocolError>;

    /// Parses a frame header from the leading bytes of `src`.
    ///
    /// Truncated input is not an error: return
    /// [`PacketHeader::invalid`] so the channel retains the buffer and
    /// waits for more bytes.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] only for bytes that can never become a
    /// valid header (corruption). The channel will resynchronize the
    /// stream.
    fn decode_header(&self, src: &[u8]) -> Result<PacketHeader, ProtocolError>;

    /// Decodes a complete frame body into packets, appending to `out`.
    ///
    /// `body` holds at least `header.body_len` bytes. Appending zero
    /// packets is valid — pure-control frames carry no application
    /// messages.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] for malformed bodies. One bad frame
    /// must not poison the next: the channel consumes the frame's bytes
    /// either way.
    fn decode_body(
        &self,
        out: &mut Vec<Packet>,
        header: &PacketHeader,
        body: &[u8],
    ) -> Result<(), ProtocolError>;

    /// The keepalive packet this codec's protocol uses, if any.
    ///
    /// The codec owns the wire protocol, so it also owns the shape of the
    /// liveness probe. Returning `None` disables probe sending; the
    /// channel still counts missed heartbeats.
    fn heartbeat_packet(&self) -> Option<Packet> {
        None
    }
}

// ---------------------------------------------------------------------------
// LengthPrefixedCodec
// ---------------------------------------------------------------------------

/// Size of the [`LengthPrefixedCodec`] frame header:
/// magic (2) + id (2) + body length (4).
pub const HEADER_LEN: usize = 8;

/// Magic bytes marking the start of every frame: "NF".
pub const MAGIC: [u8; 2] = [0x4E, 0x46];

/// Default maximum frame body size: 16 MiB.
pub const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

/// The default binary wire format: a fixed 8-byte header followed by the
/// raw payload.
///
/// ```text
/// ┌────────────┬──────────┬───────────────┬──────────────────┐
/// │ Magic (2B) │ Id (2B)  │ BodyLen (4B)  │ Payload          │
/// │ 0x4E 0x46  │ LE       │ LE            │ (BodyLen bytes)  │
/// └────────────┴──────────┴───────────────┴──────────────────┘
/// ```
///
/// Frames whose id equals the configured control id decode to zero
/// packets — they exist only to prove the peer is alive. The same id is
/// what [`heartbeat_packet`](PacketCodec::heartbeat_packet) emits.
#[derive(Debug, Clone)]
pub struct LengthPrefixedCodec {
    max_body: usize,
    control_id: Option<PacketId>,
}

impl LengthPrefixedCodec {
    /// Creates a codec with the default body limit and no control id.
    pub fn new() -> Self {
        Self {
            max_body: DEFAULT_MAX_BODY,
            control_id: None,
        }
    }

    /// Sets the maximum accepted frame body size.
    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }

    /// Sets the opcode used for heartbeat/control frames.
    pub fn with_control_id(mut self, id: PacketId) -> Self {
        self.control_id = Some(id);
        self
    }
}

impl Default for LengthPrefixedCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketCodec for LengthPrefixedCodec {
    fn header_len(&self) -> usize {
        HEADER_LEN
    }

    fn encode(&self, packet: &Packet, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let body_len = packet.body_len();
        if body_len > self.max_body || body_len > u32::MAX as usize {
            return Err(ProtocolError::BodyTooLarge {
                len: body_len,
                max: self.max_body.min(u32::MAX as usize),
            });
        }
        dst.reserve(HEADER_LEN + body_len);
        dst.put_slice(&MAGIC);
        dst.put_u16_le(packet.id().0);
        dst.put_u32_le(body_len as u32);
        dst.put_slice(packet.payload());
        Ok(())
    }

    fn decode_header(&self, src: &[u8]) -> Result<PacketHeader, ProtocolError> {
        if src.len() < HEADER_LEN {
            return Ok(PacketHeader::invalid());
        }
        if src[0..2] != MAGIC {
            return Err(ProtocolError::BadMagic([src[0], src[1]]));
        }
        let id = u16::from_le_bytes([src[2], src[3]]);
        let body_len = u32::from_le_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if body_len > self.max_body {
            return Err(ProtocolError::BodyTooLarge {
                len: body_len,
                max: self.max_body,
            });
        }
        Ok(PacketHeader::new(PacketId(id), body_len))
    }

    fn decode_body(
        &self,
        out: &mut Vec<Packet>,
        header: &PacketHeader,
        body: &[u8],
    ) -> Result<(), ProtocolError> {
        if body.len() < header.body_len {
            return Err(ProtocolError::MalformedBody(format!(
                "expected {} body bytes, got {}",
                header.body_len,
                body.len()
            )));
        }
        // Control frames carry no application packets.
        if self.control_id == Some(header.id) {
            return Ok(());
        }
        let payload = Bytes::copy_from_slice(&body[..header.body_len]);
        out.push(Packet::new(header.id, payload));
        Ok(())
    }

    fn heartbeat_packet(&self) -> Option<Packet> {
        self.control_id.map(Packet::empty)
    }
}
