use crate::state::PeerState;
use drizzle_wire::Packet;
use std::net::SocketAddr;

/// A named application-level capability registered with a [`crate::Node`].
///
/// The core only dispatches to handlers by name (spec §1: "Application-level
/// payload handlers (pluggable); the core only dispatches to them by name").
/// Implementations must not block: the node is a single-threaded event loop,
/// and a handler that blocks stalls keep-alives and arbitration for every
/// peer, not just the one it's handling.
pub trait Handler: Send {
    /// The name this handler registers under, and that remote peers name in
    /// a DATA packet's `handler` attribute.
    fn name(&self) -> &str;

    /// A DATA packet named this handler and was accepted (peer in a
    /// connected state). `peer` identifies the sender.
    fn on_receive(&mut self, peer: SocketAddr, pkt: &Packet);

    /// `peer` just transitioned to `new_state`. Called synchronously with
    /// the transition, for every registered handler, regardless of whether
    /// the handler has exchanged DATA with that peer (spec §4.2).
    fn on_state_change(&mut self, peer: SocketAddr, new_state: PeerState) {
        let _ = (peer, new_state);
    }
}
