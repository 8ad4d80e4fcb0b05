//! Per-command handlers for the peer state machine (spec §4.2, §4.3).
//!
//! [`Node::dispatch_command`] is the single entry point: it looks up the
//! command's gate and required attributes from [`crate::dispatch::TABLE`],
//! drops the packet if either check fails, and otherwise calls the matching
//! handler below. Each handler assumes its gate and required attributes
//! already hold.

use crate::dispatch;
use crate::node::Node;
use crate::state::PeerState;
use crate::wireaddr;
use drizzle_wire::{AttrValue, Command, Packet};
use std::net::SocketAddr;

impl Node {
    /// Validate the dispatch table's gate and required attributes for
    /// `pkt.cmd`, then hand it to the matching command handler.
    pub(crate) async fn dispatch_command(&mut self, src: SocketAddr, pkt: Packet) {
        let entry = dispatch::entry_for(pkt.cmd);

        let state = match self.peers.get(&src) {
            Some(p) => p.state(),
            None => return,
        };
        if !entry.gate.accepts(state) {
            tracing::warn!(
                cmd = %pkt.cmd, state = %state, %src,
                "packet not expected in this state; dropping"
            );
            return;
        }
        if !pkt.has(entry.required) {
            tracing::warn!(
                cmd = %pkt.cmd, required = ?entry.required, %src,
                "packet missing required attributes; dropping"
            );
            return;
        }

        match pkt.cmd {
            Command::Keepalive => self.cmd_keepalive(src, pkt).await,
            Command::Sync => self.cmd_sync(src, pkt).await,
            Command::Desync => self.cmd_desync(src, pkt).await,
            Command::Arbitrate => self.cmd_arbitrate(src, pkt).await,
            Command::Peers => self.cmd_peers(src, pkt).await,
            Command::Handlers => self.cmd_handlers(src, pkt).await,
            Command::Data => self.cmd_data(src, pkt).await,
            Command::Route => self.cmd_route(src, pkt).await,
        }
    }

    /// KEEPALIVE: echo with `response=1` unless this is already a response;
    /// either way the activity timestamp was already refreshed by the
    /// caller before dispatch.
    async fn cmd_keepalive(&mut self, src: SocketAddr, pkt: Packet) {
        if !pkt.has_one("response") {
            let reply = pkt.with("response", 1i64);
            let _ = self.send_packet(src, reply).await;
        }
    }

    /// SYNC: classify the peer as DIRECT or DIRECT_LOCAL, absorb an
    /// externally-observed self-address if offered, and either trigger an
    /// immediate state refresh (if this is a response) or reply in kind.
    async fn cmd_sync(&mut self, src: SocketAddr, pkt: Packet) {
        let new_state = if pkt.has_one("local") {
            tracing::info!(%src, "synchronizing locally");
            PeerState::DirectLocal
        } else {
            PeerState::Direct
        };
        self.transition_peer(src, new_state);

        if let Some(you) = pkt.get("you").and_then(wireaddr::from_attr) {
            tracing::info!(%src, peer_apparent_addr = %you, "peer-observed address");
            if self.self_addrs.len() >= crate::node::MAX_SELVES {
                tracing::error!(
                    max = crate::node::MAX_SELVES,
                    addr = %you,
                    "(MAX_SELVES) too many recognized self-addresses; possible attack?"
                );
            } else {
                self.self_addrs.insert(you);
            }
        }

        if pkt.has_one("response") {
            self.request_state_refresh(src).await;
        } else {
            let reply = pkt
                .with("response", 1i64)
                .with("you", wireaddr::to_attr(src));
            let _ = self.send_packet(src, reply).await;
        }
    }

    /// DESYNC: unconditional transition to NOT_CONNECTED.
    async fn cmd_desync(&mut self, src: SocketAddr, _pkt: Packet) {
        self.transition_peer(src, PeerState::NotConnected);
    }

    /// ARBITRATE: dispatch to one of the four phases in spec §4.3, by which
    /// attribute combination the packet carries.
    async fn cmd_arbitrate(&mut self, src: SocketAddr, pkt: Packet) {
        if let Some(remote) = pkt.get("remote").and_then(wireaddr::from_attr) {
            self.arbitrate_remote(src, remote).await;
        } else if let Some(behalf) = pkt.get("behalf").and_then(wireaddr::from_attr) {
            self.arbitrate_behalf(src, behalf).await;
        } else if let Some(respond) = pkt.get("respond").and_then(wireaddr::from_attr) {
            self.arbitrate_respond(src, respond).await;
        } else if let (Some(success), Some(arbitrated)) = (
            pkt.get("success").and_then(AttrValue::as_int),
            pkt.get("arbitrated").and_then(wireaddr::from_attr),
        ) {
            self.arbitrate_result(success != 0, arbitrated).await;
        } else {
            tracing::warn!(%src, "invalid arbitration packet; dropping");
        }
    }

    /// Phase 1 (I→B): validate the target and forward the introduction, or
    /// tell the initiator arbitration failed.
    async fn arbitrate_remote(&mut self, initiator: SocketAddr, target: SocketAddr) {
        let target_ok = target != initiator
            && self
                .get_peer_existing(target)
                .map(|p| p.state() == PeerState::Direct)
                .unwrap_or(false);

        if !target_ok {
            tracing::debug!(
                %initiator, %target,
                "arbitration failed: target not directly connected, is self, or is us"
            );
            let pkt = Packet::empty(Command::Arbitrate)
                .with("success", 0i64)
                .with("arbitrated", wireaddr::to_attr(target));
            let _ = self.send_packet(initiator, pkt).await;
            return;
        }

        tracing::debug!(%initiator, %target, "arbitrating, outbound phase");
        let pkt = Packet::empty(Command::Arbitrate).with("behalf", wireaddr::to_attr(initiator));
        let _ = self.send_packet(target, pkt).await;
    }

    /// Phase 2 result, observed by T (B→T carrying `behalf`): create an
    /// ARBITRATING record for the initiator, punch outbound to it, and tell
    /// the broker we're ready.
    async fn arbitrate_behalf(&mut self, broker: SocketAddr, initiator: SocketAddr) {
        if let Some(existing) = self.get_peer_existing(initiator) {
            if existing.state() == PeerState::Blocked {
                tracing::info!(%initiator, "dropping arbitration request on behalf of blocked peer");
                return;
            }
        }
        if self.insert_peer(initiator, PeerState::Arbitrating).is_none() {
            return;
        }
        tracing::debug!(%initiator, via = %broker, "arbitration request received");
        let _ = self
            .send_packet(initiator, Packet::empty(Command::Keepalive))
            .await;
        let pkt = Packet::empty(Command::Arbitrate).with("respond", wireaddr::to_attr(initiator));
        let _ = self.send_packet(broker, pkt).await;
    }

    /// Phase 3 result, observed by B (T→B carrying `respond`): relay success
    /// back to the initiator.
    async fn arbitrate_respond(&mut self, target: SocketAddr, initiator: SocketAddr) {
        if self.get_peer_existing(initiator).is_none() {
            tracing::warn!(%initiator, "could not find arbitration response peer");
            return;
        }
        tracing::debug!(%initiator, via = %target, "arbitrating, return phase");
        let pkt = Packet::empty(Command::Arbitrate)
            .with("success", 1i64)
            .with("arbitrated", wireaddr::to_attr(target));
        let _ = self.send_packet(initiator, pkt).await;
    }

    /// Phase 4, observed by I (B→I carrying `success`/`arbitrated`): on
    /// success, complete the handshake with a direct SYNC; on failure,
    /// demote the target back to INDIRECT. Treats a target we no longer
    /// have a record for as a drop rather than a crash (spec §9 open
    /// question).
    async fn arbitrate_result(&mut self, success: bool, target: SocketAddr) {
        if self.get_peer_existing(target).is_none() {
            tracing::warn!(%target, "could not find arbitration target peer");
            return;
        }
        if success {
            tracing::debug!(%target, "arbitration succeeded; syncing");
            let pkt = Packet::empty(Command::Sync).with("you", wireaddr::to_attr(target));
            let _ = self.send_packet(target, pkt).await;
        } else {
            tracing::debug!(%target, "arbitration failed");
            self.transition_peer(target, PeerState::Indirect);
        }
    }

    /// PEERS: absorb a neighbor report, or answer a query with our own.
    async fn cmd_peers(&mut self, src: SocketAddr, pkt: Packet) {
        if pkt.has(&["peers", "states"]) {
            self.absorb_peers_report(src, &pkt);
        } else {
            let peers: Vec<AttrValue> = self.peers.keys().map(|a| wireaddr::to_attr(*a)).collect();
            let states: Vec<AttrValue> = self
                .peers
                .values()
                .map(|p| AttrValue::Int(p.state().as_wire()))
                .collect();
            let reply = pkt
                .with("peers", AttrValue::List(peers))
                .with("states", AttrValue::List(states));
            let _ = self.send_packet(src, reply).await;
        }
    }

    fn absorb_peers_report(&mut self, src: SocketAddr, pkt: &Packet) {
        let addrs = pkt.get("peers").map(wireaddr::list_from_attr).unwrap_or_default();
        let states: Vec<PeerState> = pkt
            .get("states")
            .and_then(AttrValue::as_list)
            .map(|items| items.iter().filter_map(AttrValue::as_int).map(PeerState::from_wire).collect())
            .unwrap_or_default();

        let pairs: Vec<(SocketAddr, PeerState)> = addrs.iter().copied().zip(states.iter().copied()).collect();
        if let Some(peer) = self.peers.get_mut(&src) {
            peer.absorb_peers_report(pairs);
        }

        for (addr, reported) in addrs.into_iter().zip(states) {
            if self.self_addrs.contains(&addr) {
                continue;
            }
            let current = match self.get_or_create_peer(addr) {
                Some(p) => p.state(),
                None => continue,
            };
            if !matches!(current, PeerState::NotConnected | PeerState::Indirect) {
                continue;
            }
            match reported {
                PeerState::Direct => self.transition_peer(addr, PeerState::Indirect),
                PeerState::Indirect | PeerState::DirectLocal => {
                    self.transition_peer(addr, PeerState::IndirectRemote)
                }
                _ => {}
            }
        }
    }

    /// HANDLERS: absorb a capability report, or answer a query with ours.
    async fn cmd_handlers(&mut self, src: SocketAddr, pkt: Packet) {
        if let Some(names) = pkt.get("handlers").and_then(AttrValue::as_list) {
            let set: std::collections::HashSet<String> = names
                .iter()
                .filter_map(AttrValue::as_str)
                .map(str::to_string)
                .collect();
            if let Some(peer) = self.peers.get_mut(&src) {
                peer.handlers = set;
            }
        } else {
            let names: Vec<AttrValue> = self
                .handlers
                .keys()
                .map(|n| AttrValue::Str(n.clone()))
                .collect();
            let reply = pkt.with("handlers", AttrValue::List(names));
            let _ = self.send_packet(src, reply).await;
        }
    }

    /// DATA: hand the packet to the named local handler, if registered.
    /// Silently dropped if the handler name is unknown (spec §4.2).
    async fn cmd_data(&mut self, src: SocketAddr, pkt: Packet) {
        let Some(name) = pkt.get("handler").and_then(AttrValue::as_str) else {
            return;
        };
        if let Some(handler) = self.handlers.get_mut(name) {
            handler.on_receive(src, &pkt);
        }
    }

    /// ROUTE: deliver locally, forward toward a next hop, or drop past TTL
    /// (spec §4.4). Delegated to [`crate::routing`].
    async fn cmd_route(&mut self, src: SocketAddr, pkt: Packet) {
        self.route_packet(src, pkt).await;
    }
}
