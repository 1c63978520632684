//! Packet handler registration and dispatch.
//!
//! Handlers bind to one opcode each. Dispatch invokes every handler
//! registered for the packet's exact id, in registration order; the
//! default handler runs only when *zero* exact handlers exist for that id.
//! Packets nobody wants are counted, not errors — a server pushing a
//! message type the client doesn't care about is normal.

use std::collections::HashMap;
use std::sync::Arc;

use netforge_protocol::{Packet, PacketId};
use tracing::trace;

/// A callback bound to one packet id.
///
/// Handlers are shared `Arc`s: the same handler instance can be registered
/// on several channels, and unregistration is by `Arc` identity.
pub trait PacketHandler: Send + Sync + 'static {
    /// The opcode this handler reacts to.
    fn id(&self) -> PacketId;

    /// Handles one received packet. Runs on the thread driving `update`.
    fn handle(&self, packet: &Packet);
}

/// Fallback invoked for ids with no registered handler.
pub type DefaultHandler = Box<dyn Fn(&Packet) + Send + Sync>;

/// Maps packet ids to ordered handler lists, plus one optional fallback.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<PacketId, Vec<Arc<dyn PacketHandler>>>,
    default: Option<DefaultHandler>,
    unhandled: u64,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its own id. A second handler for the same
    /// id appends rather than replaces.
    pub fn register(&mut self, handler: Arc<dyn PacketHandler>) {
        self.handlers.entry(handler.id()).or_default().push(handler);
    }

    /// Removes a previously registered handler, matched by `Arc` identity.
    /// Returns `true` if it was found.
    pub fn unregister(&mut self, handler: &Arc<dyn PacketHandler>) -> bool {
        let id = handler.id();
        let Some(list) = self.handlers.get_mut(&id) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| !Arc::ptr_eq(h, handler));
        let removed = list.len() < before;
        if list.is_empty() {
            self.handlers.remove(&id);
        }
        removed
    }

    /// Sets the fallback for unmapped ids, replacing any previous one.
    pub fn set_default(&mut self, handler: impl Fn(&Packet) + Send + Sync + 'static) {
        self.default = Some(Box::new(handler));
    }

    /// Removes the fallback handler.
    pub fn clear_default(&mut self) {
        self.default = None;
    }

    /// Routes one packet. Returns `true` if any handler ran.
    pub fn dispatch(&mut self, packet: &Packet) -> bool {
        if let Some(list) = self.handlers.get(&packet.id()) {
            for handler in list {
                handler.handle(packet);
            }
            return true;
        }
        if let Some(default) = &self.default {
            default(packet);
            return true;
        }
        self.unhandled += 1;
        trace!(id = %packet.id(), "no handler for packet");
        false
    }

    /// Number of handlers registered for `id`.
    pub fn handler_count(&self, id: PacketId) -> usize {
        self.handlers.get(&id).map_or(0, Vec::len)
    }

    /// Packets dispatched with neither an exact nor a default handler.
    pub fn unhandled_count(&self) -> u64 {
        self.unhandled
    }

    /// Drops every handler binding, including the default.
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.default = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Test handler that appends its label to a shared log.
    struct Recorder {
        id: PacketId,
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl PacketHandler for Recorder {
        fn id(&self) -> PacketId {
            self.id
        }

        fn handle(&self, _packet: &Packet) {
            self.log.lock().unwrap().push(self.label);
        }
    }

    fn recorder(
        id: u16,
        label: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn PacketHandler> {
        Arc::new(Recorder {
            id: PacketId(id),
            label,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = HandlerRegistry::new();
        reg.register(recorder(100, "h1", &log));
        reg.register(recorder(100, "h2", &log));

        let handled = reg.dispatch(&Packet::empty(PacketId(100)));
        assert!(handled);
        assert_eq!(*log.lock().unwrap(), vec!["h1", "h2"]);
    }

    #[test]
    fn test_default_skipped_when_exact_handler_exists() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = HandlerRegistry::new();
        reg.register(recorder(100, "h1", &log));
        let default_log = Arc::clone(&log);
        reg.set_default(move |_| default_log.lock().unwrap().push("default"));

        reg.dispatch(&Packet::empty(PacketId(100)));
        assert_eq!(*log.lock().unwrap(), vec!["h1"]);
    }

    #[test]
    fn test_default_runs_for_unmapped_id() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let mut reg = HandlerRegistry::new();
        let default_log = Arc::clone(&log);
        reg.set_default(move |_| default_log.lock().unwrap().push("default"));

        let handled = reg.dispatch(&Packet::empty(PacketId(200)));
        assert!(handled);
        assert_eq!(*log.lock().unwrap(), vec!["default"]);
        assert_eq!(reg.unhandled_count(), 0);
    }

    #[test]
    fn test_unhandled_is_counted_not_an_error() {
        let mut reg = HandlerRegistry::new();
        assert!(!reg.dispatch(&Packet::empty(PacketId(9))));
        assert!(!reg.dispatch(&Packet::empty(PacketId(9))));
        assert_eq!(reg.unhandled_count(), 2);
    }

    #[test]
    fn test_unregister_by_identity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = HandlerRegistry::new();
        let h1 = recorder(100, "h1", &log);
        let h2 = recorder(100, "h2", &log);
        reg.register(Arc::clone(&h1));
        reg.register(Arc::clone(&h2));

        assert!(reg.unregister(&h1));
        assert_eq!(reg.handler_count(PacketId(100)), 1);

        reg.dispatch(&Packet::empty(PacketId(100)));
        assert_eq!(*log.lock().unwrap(), vec!["h2"]);

        // Unregistering again finds nothing.
        assert!(!reg.unregister(&h1));
    }

    #[test]
    fn test_clear_drops_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = HandlerRegistry::new();
        reg.register(recorder(1, "h", &log));
        reg.set_default(|_| {});

        reg.clear();
        assert_eq!(reg.handler_count(PacketId(1)), 0);
        assert!(!reg.dispatch(&Packet::empty(PacketId(1))));
    }
}
