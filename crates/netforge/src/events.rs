//! The channel's outward notification surface.
//!
//! A channel never calls arbitrary application code directly; everything it
//! has to say goes through the five hooks on [`ChannelEvents`]. The
//! embedding application implements the trait once and hands the sink to
//! the channel at construction. All hooks run on the thread driving
//! `update` — no cross-thread delivery, no locks needed inside.

use std::any::Any;

use netforge_protocol::ProtocolError;

use crate::error::NetworkErrorCode;

/// Callback sink for channel lifecycle and error notifications.
///
/// Every method has a no-op default, so implementors subscribe only to
/// what they care about.
pub trait ChannelEvents: Send + 'static {
    /// The transport connection was established.
    ///
    /// `user_data` is whatever the caller passed to `connect`.
    fn on_connected(&mut self, _name: &str, _user_data: Option<&(dyn Any + Send)>) {}

    /// The channel closed — locally, by the remote peer, or because the
    /// heartbeat limit was reached. Fires exactly once per connection.
    fn on_closed(&mut self, _name: &str) {}

    /// A heartbeat interval elapsed without traffic; `missed` is the
    /// consecutive miss count.
    fn on_miss_heartbeat(&mut self, _name: &str, _missed: u32) {}

    /// A lifecycle, transport, or framing failure.
    fn on_error(&mut self, _name: &str, _code: NetworkErrorCode, _message: &str) {}

    /// A codec-defined failure while encoding or decoding a packet body.
    /// The pipeline continues; only the offending packet is lost.
    fn on_custom_error(&mut self, _name: &str, _error: &ProtocolError) {}
}

/// A sink that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvents;

impl ChannelEvents for NullEvents {}
