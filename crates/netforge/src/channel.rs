//! The network channel: one logical duplex connection to a remote host.
//!
//! A channel owns its send/receive queues, the frame reassembly buffer,
//! the heartbeat supervisor, and the handler registry. It performs work
//! only inside [`update`](NetworkChannel::update), which the owner must
//! call on a steady cadence (once per frame, or on a fixed timer). The
//! transport runs on spawned tokio tasks and hands results back through
//! queues that `update` drains, so handler and heartbeat logic never
//! leaves the driving thread.
//!
//! ```text
//! send(packet) ──► send queue ──► codec.encode ──► writer task ──► wire
//! wire ──► reader task ──► byte buffer ──► codec.decode ──► handlers
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use netforge_protocol::{Packet, PacketCodec};
use netforge_transport::{
    AddressFamily, Connection, ServiceKind, Transport, TransportError,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

use crate::error::{ChannelError, NetworkErrorCode};
use crate::events::ChannelEvents;
use crate::heartbeat::{HeartbeatConfig, HeartbeatState, HeartbeatSupervisor, HeartbeatTick};
use crate::registry::{HandlerRegistry, PacketHandler};

/// Default bound on the send queue, in packets.
pub const DEFAULT_SEND_CAPACITY: usize = 1024;

/// What the I/O tasks report back to the update loop.
enum TransportEvent {
    /// The connect attempt succeeded.
    Connected {
        local: Option<SocketAddr>,
        remote: Option<SocketAddr>,
    },
    /// A chunk of inbound bytes arrived.
    Data(Vec<u8>),
    /// The remote peer closed cleanly.
    Closed,
    /// The connect attempt failed.
    ConnectFailed(TransportError),
    /// Reading or writing failed on an established connection.
    Io(TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    /// No connection and none in flight.
    Inactive,
    /// Connect attempt in flight.
    Connecting,
    /// Transport established.
    Connected,
    /// Shut down; permanently unusable.
    ShutDown,
}

/// One logical client connection, generic over its codec and transport.
pub struct NetworkChannel<C: PacketCodec, T: Transport> {
    name: String,
    codec: C,
    transport: Arc<T>,
    state: ChannelState,
    local: Option<SocketAddr>,
    remote: Option<SocketAddr>,
    user_data: Option<Box<dyn Any + Send>>,

    send_queue: VecDeque<Packet>,
    send_capacity: usize,
    recv_queue: VecDeque<Packet>,
    recv_buf: BytesMut,
    /// Set while skipping garbage after a corrupt header, so one corrupt
    /// region produces one error callback.
    resyncing: bool,

    event_rx: Option<UnboundedReceiver<TransportEvent>>,
    write_tx: Option<UnboundedSender<Bytes>>,

    heartbeat: HeartbeatSupervisor,
    registry: HandlerRegistry,
    events: Box<dyn ChannelEvents>,

    sent_count: u64,
    received_count: u64,
}

impl<C: PacketCodec, T: Transport> NetworkChannel<C, T> {
    /// Creates a channel with default heartbeat and queue settings.
    pub fn new(
        name: impl Into<String>,
        transport: T,
        codec: C,
        events: Box<dyn ChannelEvents>,
    ) -> Self {
        Self {
            name: name.into(),
            codec,
            transport: Arc::new(transport),
            state: ChannelState::Inactive,
            local: None,
            remote: None,
            user_data: None,
            send_queue: VecDeque::new(),
            send_capacity: DEFAULT_SEND_CAPACITY,
            recv_queue: VecDeque::new(),
            recv_buf: BytesMut::new(),
            resyncing: false,
            event_rx: None,
            write_tx: None,
            heartbeat: HeartbeatSupervisor::new(HeartbeatConfig::default()),
            registry: HandlerRegistry::new(),
            events,
            sent_count: 0,
            received_count: 0,
        }
    }

    /// Replaces the heartbeat configuration.
    pub fn with_heartbeat(mut self, config: HeartbeatConfig) -> Self {
        self.heartbeat = HeartbeatSupervisor::new(config);
        self
    }

    /// Sets the send queue bound. Packets offered past the bound are
    /// rejected with [`ChannelError::SendQueueFull`] — the queue never
    /// grows without limit and never silently drops accepted packets.
    pub fn with_send_capacity(mut self, capacity: usize) -> Self {
        self.send_capacity = capacity.max(1);
        self
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Initiates an asynchronous connection to `address:port`.
    ///
    /// Fails fast if the address cannot be parsed or the channel already
    /// has a connection (in flight or established). Success or transport
    /// failure is reported later, during [`update`](Self::update), through
    /// [`ChannelEvents::on_connected`] / [`ChannelEvents::on_error`].
    ///
    /// `user_data` is handed back verbatim in `on_connected`.
    ///
    /// Must be called from within a tokio runtime: the transport I/O runs
    /// on spawned tasks.
    ///
    /// # Errors
    /// [`ChannelError::AddressInvalid`], [`ChannelError::AlreadyConnected`],
    /// or [`ChannelError::Shutdown`].
    pub fn connect(
        &mut self,
        address: &str,
        port: u16,
        user_data: Option<Box<dyn Any + Send>>,
    ) -> Result<(), ChannelError> {
        if self.state == ChannelState::ShutDown {
            return Err(ChannelError::Shutdown);
        }
        if matches!(self.state, ChannelState::Connecting | ChannelState::Connected) {
            self.events.on_error(
                &self.name,
                NetworkErrorCode::AlreadyConnected,
                "connect on a connected channel",
            );
            return Err(ChannelError::AlreadyConnected);
        }
        if let Err(e) = validate_address(address, port) {
            self.events
                .on_error(&self.name, NetworkErrorCode::AddressInvalid, &e.to_string());
            return Err(e);
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        self.event_rx = Some(event_rx);
        self.write_tx = Some(write_tx);
        self.user_data = user_data;
        // A partial frame from a previous connection must not leak into
        // this one.
        self.recv_buf.clear();
        self.resyncing = false;
        self.state = ChannelState::Connecting;

        info!(
            channel = %self.name,
            address,
            port,
            kind = %self.transport.service_kind(),
            "connecting"
        );

        tokio::spawn(run_io(
            Arc::clone(&self.transport),
            address.to_string(),
            port,
            event_tx,
            write_rx,
        ));
        Ok(())
    }

    /// Enqueues a packet for transmission. Never blocks; the packet goes
    /// out on a later [`update`](Self::update) tick.
    ///
    /// # Errors
    /// [`ChannelError::NotConnected`] before a successful connect or after
    /// close (the packet is discarded), [`ChannelError::SendQueueFull`] at
    /// the configured bound. Both are mirrored through
    /// [`ChannelEvents::on_error`].
    pub fn send(&mut self, packet: Packet) -> Result<(), ChannelError> {
        if self.state != ChannelState::Connected {
            self.events.on_error(
                &self.name,
                NetworkErrorCode::NotConnected,
                "send on an unconnected channel",
            );
            return Err(match self.state {
                ChannelState::ShutDown => ChannelError::Shutdown,
                _ => ChannelError::NotConnected,
            });
        }
        if self.send_queue.len() >= self.send_capacity {
            self.events.on_error(
                &self.name,
                NetworkErrorCode::QueueFull,
                "send queue at capacity, packet discarded",
            );
            return Err(ChannelError::SendQueueFull {
                capacity: self.send_capacity,
            });
        }
        self.send_queue.push_back(packet);
        Ok(())
    }

    /// Advances the channel by one tick. The single driving entry point.
    ///
    /// `elapsed_seconds` is logical time (game/app time), and
    /// `real_elapsed_seconds` is wall-clock time; the heartbeat probes on
    /// the logical clock but uses the real clock for its hard liveness
    /// limit, so a slow or paused frame loop is not mistaken for a silent
    /// wire. Callers without a dilated clock pass the same value for both.
    ///
    /// Per tick, in order: drain transport events, heartbeat bookkeeping,
    /// flush the send queue through codec and transport, parse complete
    /// inbound frames (partial frames are retained), dispatch parsed
    /// packets to handlers.
    pub fn update(&mut self, elapsed_seconds: f32, real_elapsed_seconds: f32) {
        self.drain_transport_events();
        self.tick_heartbeat(elapsed_seconds, real_elapsed_seconds);
        self.flush_send_queue();
        self.parse_frames();
        self.dispatch_packets();
    }

    /// Closes the connection. Idempotent: closing an already-closed
    /// channel is a no-op, and [`ChannelEvents::on_closed`] fires exactly
    /// once per connection.
    ///
    /// Safe to call mid-connect; the in-flight attempt finds its reporting
    /// queue gone and quietly drops the connection.
    pub fn close(&mut self) {
        if !matches!(self.state, ChannelState::Connecting | ChannelState::Connected) {
            return;
        }
        self.state = ChannelState::Inactive;
        // Dropping the pipes ends the I/O tasks.
        self.write_tx = None;
        self.event_rx = None;
        self.local = None;
        self.remote = None;
        self.heartbeat.stop();
        info!(channel = %self.name, "closed");
        self.events.on_closed(&self.name);
    }

    /// Closes and releases every internal buffer, queue, and handler
    /// binding. The channel is unusable afterward.
    pub fn shutdown(&mut self) {
        self.close();
        self.state = ChannelState::ShutDown;
        self.send_queue.clear();
        self.send_queue.shrink_to_fit();
        self.recv_queue.clear();
        self.recv_queue.shrink_to_fit();
        self.recv_buf = BytesMut::new();
        self.registry.clear();
        self.user_data = None;
        debug!(channel = %self.name, "shut down");
    }

    // -- Handlers -----------------------------------------------------------

    /// Registers a packet handler under its own id; a second handler for
    /// the same id appends rather than replaces.
    pub fn register_handler(&mut self, handler: Arc<dyn PacketHandler>) {
        self.registry.register(handler);
    }

    /// Removes a handler by `Arc` identity. Returns `true` if found.
    pub fn unregister_handler(&mut self, handler: &Arc<dyn PacketHandler>) -> bool {
        self.registry.unregister(handler)
    }

    /// Sets the fallback handler for unmapped packet ids.
    pub fn set_default_handler(&mut self, handler: impl Fn(&Packet) + Send + Sync + 'static) {
        self.registry.set_default(handler);
    }

    /// Injects an already-decoded packet into the dispatch pipeline,
    /// bypassing the wire. Delivered on the next [`update`](Self::update)
    /// pass, after anything already queued. Counts as a received packet
    /// but leaves heartbeat state alone — it never crossed the wire.
    ///
    /// A no-op once the channel is shut down.
    pub fn fire_receive_packet(&mut self, packet: Packet) {
        if self.state == ChannelState::ShutDown {
            return;
        }
        self.received_count += 1;
        self.recv_queue.push_back(packet);
    }

    // -- Observability ------------------------------------------------------

    /// The channel's name (unique within its owning manager).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the transport connection is established.
    pub fn connected(&self) -> bool {
        self.state == ChannelState::Connected
    }

    /// The service kind of the underlying transport.
    pub fn service_kind(&self) -> ServiceKind {
        self.transport.service_kind()
    }

    /// Local socket address, while connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }

    /// Remote socket address, while connected.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote
    }

    /// IP address family of the connection, while connected.
    pub fn address_family(&self) -> Option<AddressFamily> {
        self.remote.or(self.local).map(|a| AddressFamily::of(&a))
    }

    /// Packets queued but not yet handed to the transport. Heartbeat
    /// probes share the queue and are counted.
    pub fn send_packet_count(&self) -> usize {
        self.send_queue.len()
    }

    /// Cumulative packets serialized and handed to the transport,
    /// heartbeat probes included.
    pub fn sent_packet_count(&self) -> u64 {
        self.sent_count
    }

    /// Packets received (or injected) but not yet dispatched.
    pub fn receive_packet_count(&self) -> usize {
        self.recv_queue.len()
    }

    /// Cumulative packets received or injected.
    pub fn received_packet_count(&self) -> u64 {
        self.received_count
    }

    /// Consecutive missed heartbeats on the current connection.
    pub fn miss_heart_beat_count(&self) -> u32 {
        self.heartbeat.missed()
    }

    /// Packets dispatched with no matching handler and no default.
    pub fn unhandled_packet_count(&self) -> u64 {
        self.registry.unhandled_count()
    }

    /// Observable heartbeat state.
    pub fn heartbeat_state(&self) -> HeartbeatState {
        self.heartbeat.state()
    }

    /// Seconds of silence before a heartbeat probe is sent.
    pub fn heartbeat_interval(&self) -> f32 {
        self.heartbeat.interval()
    }

    /// Logical seconds accumulated toward the next heartbeat probe.
    pub fn heartbeat_elapsed_seconds(&self) -> f32 {
        self.heartbeat.elapsed()
    }

    /// Changes the heartbeat probe interval.
    pub fn set_heartbeat_interval(&mut self, interval: f32) {
        self.heartbeat.set_interval(interval);
    }

    /// Whether received packets reset the heartbeat miss state.
    pub fn reset_heartbeat_on_receive(&self) -> bool {
        self.heartbeat.reset_on_receive()
    }

    /// Sets whether received packets reset the heartbeat miss state.
    pub fn set_reset_heartbeat_on_receive(&mut self, reset: bool) {
        self.heartbeat.set_reset_on_receive(reset);
    }

    // -- Pipeline stages ----------------------------------------------------

    fn drain_transport_events(&mut self) {
        let Some(rx) = self.event_rx.as_mut() else {
            return;
        };
        let mut pending = Vec::new();
        while let Ok(event) = rx.try_recv() {
            pending.push(event);
        }
        for event in pending {
            self.handle_transport_event(event);
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { local, remote } => {
                if self.state != ChannelState::Connecting {
                    return; // stale completion after close
                }
                self.state = ChannelState::Connected;
                self.local = local;
                self.remote = remote;
                self.heartbeat.start();
                info!(channel = %self.name, ?remote, "connected");
                self.events.on_connected(&self.name, self.user_data.as_deref());
            }
            TransportEvent::Data(data) => {
                trace!(channel = %self.name, len = data.len(), "inbound bytes");
                self.recv_buf.extend_from_slice(&data);
            }
            TransportEvent::Closed => {
                debug!(channel = %self.name, "remote closed connection");
                self.close();
            }
            TransportEvent::ConnectFailed(e) => {
                if self.state != ChannelState::Connecting {
                    return;
                }
                self.state = ChannelState::Inactive;
                self.event_rx = None;
                self.write_tx = None;
                warn!(channel = %self.name, error = %e, "connect failed");
                self.events.on_error(
                    &self.name,
                    NetworkErrorCode::ConnectFailed,
                    &e.to_string(),
                );
            }
            TransportEvent::Io(e) => {
                let code = match &e {
                    TransportError::SendFailed(_) => NetworkErrorCode::SendFailed,
                    _ => NetworkErrorCode::ReceiveFailed,
                };
                warn!(channel = %self.name, error = %e, "transport error");
                self.events.on_error(&self.name, code, &e.to_string());
                self.close();
            }
        }
    }

    fn tick_heartbeat(&mut self, elapsed: f32, real_elapsed: f32) {
        if self.state != ChannelState::Connected {
            return;
        }
        match self.heartbeat.tick(elapsed, real_elapsed) {
            HeartbeatTick::Quiet => {}
            HeartbeatTick::Probe { missed } => {
                if let Some(probe) = self.codec.heartbeat_packet() {
                    // Probes skip the caller-facing bound but share the
                    // queue, so they appear in the send metrics.
                    self.send_queue.push_back(probe);
                }
                warn!(channel = %self.name, missed, "missed heartbeat");
                self.events.on_miss_heartbeat(&self.name, missed);
            }
            HeartbeatTick::Expired { missed } => {
                warn!(
                    channel = %self.name,
                    missed,
                    "heartbeat limit exceeded, closing channel"
                );
                self.events.on_miss_heartbeat(&self.name, missed);
                self.close();
            }
        }
    }

    fn flush_send_queue(&mut self) {
        if self.state != ChannelState::Connected {
            return;
        }
        let Some(tx) = self.write_tx.as_ref() else {
            return;
        };
        while let Some(packet) = self.send_queue.pop_front() {
            let mut frame = BytesMut::new();
            match self.codec.encode(&packet, &mut frame) {
                Ok(()) => {
                    if tx.send(frame.freeze()).is_err() {
                        // Writer task gone; its close/error event arrives
                        // next tick. Keep the packet queued.
                        self.send_queue.push_front(packet);
                        return;
                    }
                    trace!(channel = %self.name, id = %packet.id(), "sent packet");
                    self.sent_count += 1;
                }
                Err(e) => {
                    // One unserializable packet must not stall the rest.
                    debug!(channel = %self.name, error = %e, "encode failed");
                    self.events.on_custom_error(&self.name, &e);
                }
            }
        }
    }

    fn parse_frames(&mut self) {
        loop {
            if self.recv_buf.is_empty() {
                return;
            }
            let header = match self.codec.decode_header(&self.recv_buf) {
                Ok(header) => header,
                Err(e) => {
                    if !self.resyncing {
                        self.resyncing = true;
                        warn!(
                            channel = %self.name,
                            error = %e,
                            "corrupt frame header, resynchronizing"
                        );
                        self.events.on_error(
                            &self.name,
                            NetworkErrorCode::Protocol,
                            &e.to_string(),
                        );
                    }
                    // Skip forward until the codec recognizes a header.
                    self.recv_buf.advance(1);
                    continue;
                }
            };
            if !header.valid {
                return; // incomplete header, wait for more bytes
            }
            self.resyncing = false;

            let total = self.codec.header_len() + header.body_len;
            if self.recv_buf.len() < total {
                return; // incomplete body, wait for more bytes
            }
            self.recv_buf.advance(self.codec.header_len());
            let body = self.recv_buf.split_to(header.body_len);

            let mut decoded = Vec::new();
            match self.codec.decode_body(&mut decoded, &header, &body) {
                Ok(()) => {
                    // Any complete frame proves the peer is alive, even a
                    // zero-packet control frame.
                    self.heartbeat.on_receive();
                    for packet in decoded {
                        trace!(channel = %self.name, id = %packet.id(), "received packet");
                        self.received_count += 1;
                        self.recv_queue.push_back(packet);
                    }
                }
                Err(e) => {
                    // The frame's bytes are consumed either way; the next
                    // frame is unaffected.
                    debug!(channel = %self.name, error = %e, "body decode failed");
                    self.events.on_custom_error(&self.name, &e);
                }
            }
        }
    }

    fn dispatch_packets(&mut self) {
        while let Some(packet) = self.recv_queue.pop_front() {
            self.registry.dispatch(&packet);
        }
    }
}

/// Fast-fail address validation; actual resolution happens in the
/// transport.
fn validate_address(address: &str, port: u16) -> Result<(), ChannelError> {
    if address.is_empty() || port == 0 || address.chars().any(char::is_whitespace) {
        return Err(ChannelError::AddressInvalid(format!("{address}:{port}")));
    }
    if address.parse::<std::net::IpAddr>().is_ok() {
        return Ok(());
    }
    let hostname_ok = address
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !hostname_ok {
        return Err(ChannelError::AddressInvalid(format!("{address}:{port}")));
    }
    Ok(())
}

/// Drives one connection: connect, then pump bytes both ways until either
/// side goes away. Runs detached; the channel observes it only through the
/// event queue, so a channel closed mid-connect simply orphans this task
/// and it exits on the first failed event send.
async fn run_io<T: Transport>(
    transport: Arc<T>,
    address: String,
    port: u16,
    events: UnboundedSender<TransportEvent>,
    mut write_rx: UnboundedReceiver<Bytes>,
) {
    let conn = match transport.connect(&address, port).await {
        Ok(conn) => conn,
        Err(e) => {
            let _ = events.send(TransportEvent::ConnectFailed(e));
            return;
        }
    };

    if events
        .send(TransportEvent::Connected {
            local: conn.local_addr(),
            remote: conn.remote_addr(),
        })
        .is_err()
    {
        // Channel closed while we were connecting.
        let _ = conn.close().await;
        return;
    }

    let conn = Arc::new(conn);

    let writer_conn = Arc::clone(&conn);
    let writer_events = events.clone();
    let writer = tokio::spawn(async move {
        while let Some(bytes) = write_rx.recv().await {
            if let Err(e) = writer_conn.send(&bytes).await {
                let _ = writer_events.send(TransportEvent::Io(e));
                break;
            }
        }
        let _ = writer_conn.close().await;
    });

    loop {
        tokio::select! {
            // A local close drops the event receiver; stop reading rather
            // than waiting on a peer that may never send another byte.
            _ = events.closed() => break,
            result = conn.recv() => match result {
                Ok(Some(data)) => {
                    if events.send(TransportEvent::Data(data)).is_err() {
                        break; // channel gone
                    }
                }
                Ok(None) => {
                    let _ = events.send(TransportEvent::Closed);
                    break;
                }
                Err(e) => {
                    let _ = events.send(TransportEvent::Io(e));
                    break;
                }
            },
        }
    }

    writer.abort();
}
