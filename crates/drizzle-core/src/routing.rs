//! ROUTE forwarding and best-effort next-hop selection (spec §4.4).

use crate::node::Node;
use crate::state::PeerState;
use crate::wireaddr;
use drizzle_wire::AttrValue;
use std::net::SocketAddr;

impl Node {
    /// Deliver, forward, or drop a ROUTE packet.
    ///
    /// If `dest` names one of our own addresses, the embedded `data` is
    /// decoded and fed through the same path as a direct datagram, tagged
    /// with the embedded `src` as its apparent sender — reproducing the
    /// original's `Recv(pkt.data, pkt.src)` reentry rather than unwrapping
    /// it into a distinct "delivered" event (spec §4.4).
    ///
    /// Otherwise, if we're already directly peered with `dest`, the packet
    /// is handed straight to them without spending a hop off the TTL — one
    /// more send and they'll see themselves as `dest` and deliver it
    /// locally. Failing that, it's relayed through a DIRECT peer that
    /// reports DIRECT reachability to `dest`, or any DIRECT peer as a
    /// flood-style fallback, with the TTL decremented for that hop.
    pub(crate) async fn route_packet(&mut self, from: SocketAddr, pkt: drizzle_wire::Packet) {
        let Some(ttl) = pkt.get("ttl").and_then(AttrValue::as_int) else {
            return;
        };
        if ttl < 0 {
            return;
        }

        let Some(dest) = pkt.get("dest").and_then(wireaddr::from_attr) else {
            return;
        };

        if self.self_addrs.contains(&dest) {
            let Some(src) = pkt.get("src").and_then(wireaddr::from_attr) else {
                return;
            };
            let data = pkt.get("data").and_then(AttrValue::as_bytes).unwrap_or(&[]);
            tracing::debug!(%src, %dest, via = %from, "routed packet delivered locally");
            self.on_datagram(data, src).await;
            return;
        }

        let directly_peered = self
            .get_peer_existing(dest)
            .map(|p| p.state() == PeerState::Direct)
            .unwrap_or(false);
        if directly_peered {
            tracing::debug!(%from, %dest, "routed packet handed to its destination directly");
            let _ = self.send_packet(dest, pkt).await;
            return;
        }

        let Some(relay) = self.select_relay(dest) else {
            tracing::debug!(%dest, "no route to destination; dropping");
            return;
        };
        let ttl = ttl - 1;
        if ttl < 0 {
            tracing::debug!(%dest, "routed packet expired (ttl exhausted); dropping");
            return;
        }

        tracing::debug!(%from, %dest, %relay, ttl, "relaying routed packet");
        let forwarded = pkt.with("ttl", ttl);
        let _ = self.send_packet(relay, forwarded).await;
    }

    /// Pick a relay toward `dest`: a DIRECT peer whose last PEERS report
    /// claims DIRECT reachability to `dest` is preferred; failing that, any
    /// DIRECT peer at all acts as a flood-style fallback. `None` means there
    /// is nothing to forward through.
    fn select_relay(&self, dest: SocketAddr) -> Option<SocketAddr> {
        self.peers
            .values()
            .find(|p| {
                p.state() == PeerState::Direct
                    && p.neighbor_states.get(&dest) == Some(&PeerState::Direct)
            })
            .or_else(|| self.peers.values().find(|p| p.state() == PeerState::Direct))
            .map(|p| p.addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::Peer;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn prefers_a_peer_that_reports_direct_reachability() {
        let mut near = Peer::new(addr(2), PeerState::Direct);
        near.neighbor_states.insert(addr(3), PeerState::Indirect);
        let mut best = Peer::new(addr(4), PeerState::Direct);
        best.neighbor_states.insert(addr(3), PeerState::Direct);

        let mut peers = std::collections::HashMap::new();
        peers.insert(near.addr(), near);
        peers.insert(best.addr(), best);

        let hop = peers
            .values()
            .find(|p| {
                p.state() == PeerState::Direct
                    && p.neighbor_states.get(&addr(3)) == Some(&PeerState::Direct)
            })
            .map(|p| p.addr());
        assert_eq!(hop, Some(addr(4)));
    }
}
