use crate::error::CoreError;
use crate::handler::Handler;
use crate::peer::Peer;
use crate::security::SecMode;
use crate::state::PeerState;
use crate::timer::{Timer, TimerKind};
use crate::wireaddr;
use drizzle_wire::{Command, Packet};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;

/// Maximum number of direct connections to hold (spec §3).
pub const MAX_CONNECTIONS: usize = 256;
/// Maximum number of peers to know about at all, regardless of state.
pub const MAX_PEERS: usize = 4096;
/// Maximum number of addresses the node will attribute to itself.
pub const MAX_SELVES: usize = 8;
/// Maximum number of arbitrations to start in a single connection sweep.
pub const MAX_ARBITRATIONS: usize = 25;
/// Default minimum cryptographic strength this node will admit without the
/// security mode downgrading or rejecting the peer.
pub const DEFAULT_SEC_LEVEL: u16 = 32;

/// Maximum UDP datagram size read per `recv_from` (spec §4.5).
pub const DEFAULT_MTU: usize = 65536;
/// Timeout on each socket read; also the upper bound on timer resolution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Keep-alive resend interval for a connected peer.
pub const KA_INTERVAL: Duration = Duration::from_secs(5);
/// How long a connected peer can go without inbound traffic before it's
/// considered dead.
pub const KA_DROP: Duration = Duration::from_secs(30);
/// How often a connected peer's HANDLERS/PEERS are refreshed.
pub const STATE_UPDATE: Duration = Duration::from_secs(30);
/// Scheduling resolution on which per-peer timers are evaluated.
pub const PT_RESOLUTION: Duration = Duration::from_secs(1);
/// Interval between automatic connection-sweep arbitration passes.
pub const CONNECT_INTERVAL: Duration = Duration::from_secs(10);

/// A handle that can stop a running [`Node`] from outside its event loop.
///
/// Cloning is cheap; every clone controls the same node. This is the
/// `running` boolean named in spec §5, made shareable so a signal handler
/// (SIGINT, ctrl-c) running on a different task can flip it.
#[derive(Clone, Debug)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Request that the owning node's loop exit after its current
    /// iteration.
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// True if the node is still supposed to be running.
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The mesh node: owns the UDP socket, the peer table, the handler table,
/// the timer set, the self-address set, and the security policy (spec §3).
pub struct Node {
    socket: UdpSocket,
    pub(crate) peers: HashMap<SocketAddr, Peer>,
    pub(crate) handlers: HashMap<String, Box<dyn Handler>>,
    pub(crate) self_addrs: HashSet<SocketAddr>,
    timers: Vec<Timer>,
    pub(crate) secmode: SecMode,
    pub(crate) sec_level: u16,
    running: Arc<AtomicBool>,
    mtu: usize,
    recv_timeout: Duration,
}

impl Node {
    /// Wrap an already-bound UDP socket in a node. The socket's local
    /// address becomes the node's first self-address.
    pub fn new(socket: UdpSocket) -> std::io::Result<Self> {
        let local = socket.local_addr()?;
        let mut self_addrs = HashSet::new();
        self_addrs.insert(local);
        Ok(Self {
            socket,
            peers: HashMap::new(),
            handlers: HashMap::new(),
            self_addrs,
            timers: vec![
                Timer::new(TimerKind::PeerTick, PT_RESOLUTION),
                Timer::new(TimerKind::ConnectionSweep, CONNECT_INTERVAL),
            ],
            secmode: SecMode::default(),
            sec_level: DEFAULT_SEC_LEVEL,
            running: Arc::new(AtomicBool::new(false)),
            mtu: DEFAULT_MTU,
            recv_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Bind a fresh UDP socket on `addr` and wrap it in a node.
    pub async fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        Self::new(UdpSocket::bind(addr).await?)
    }

    /// The node's primary (bound) self-address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// All addresses the node currently believes identify it.
    pub fn self_addrs(&self) -> &HashSet<SocketAddr> {
        &self.self_addrs
    }

    /// A shareable handle that can stop this node's `run` loop.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.running.clone())
    }

    /// Override the read buffer size. Exposed for tests that want a tighter
    /// loop; production callers should leave this at [`DEFAULT_MTU`].
    pub fn set_mtu(&mut self, mtu: usize) {
        self.mtu = mtu;
    }

    /// Override the socket read timeout (and thus timer resolution).
    pub fn set_recv_timeout(&mut self, timeout: Duration) {
        self.recv_timeout = timeout;
    }

    /// Set the security policy mode (spec §4.6).
    pub fn set_secmode(&mut self, mode: SecMode) {
        self.secmode = mode;
    }

    /// Set the minimum cryptographic strength threshold (spec §4.6).
    pub fn set_sec_level(&mut self, level: u16) {
        self.sec_level = level;
    }

    /// Register an application-level handler. Replaces any prior handler
    /// registered under the same name.
    pub fn register_handler(&mut self, handler: Box<dyn Handler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    /// The names of all registered handlers.
    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Look up an existing peer record without creating one.
    pub fn get_peer(&self, addr: SocketAddr) -> Option<&Peer> {
        self.peers.get(&addr)
    }

    /// Fetch a peer record, refusing (`None`, logged) if `addr` is one of
    /// our own addresses (spec invariant 1).
    pub fn get_peer_existing(&self, addr: SocketAddr) -> Option<&Peer> {
        if self.self_addrs.contains(&addr) {
            tracing::warn!(%addr, "attempted to reference a peer at one of our own addresses");
            return None;
        }
        self.peers.get(&addr)
    }

    /// Fetch or lazily create a peer record at `addr`, refusing self-
    /// addresses and enforcing `MAX_PEERS` (spec §3 invariants 1 and 5).
    pub fn get_or_create_peer(&mut self, addr: SocketAddr) -> Option<&mut Peer> {
        if self.self_addrs.contains(&addr) {
            tracing::warn!(%addr, "attempted to create a peer at one of our own addresses");
            return None;
        }
        if !self.peers.contains_key(&addr) {
            if self.peers.len() >= MAX_PEERS {
                tracing::error!(
                    max = MAX_PEERS,
                    %addr,
                    "(MAX_PEERS) too many peers; not creating peer"
                );
                return None;
            }
            tracing::info!(%addr, "creating peer");
            self.peers
                .insert(addr, Peer::new(addr, PeerState::NotConnected));
        }
        self.peers.get_mut(&addr)
    }

    /// Insert a peer record directly in the given state, refusing a
    /// self-address and enforcing `MAX_PEERS` the same way
    /// [`Node::get_or_create_peer`] does. Used by the ARBITRATE `behalf`
    /// phase, which creates the peer record for the initiator up front.
    pub(crate) fn insert_peer(&mut self, addr: SocketAddr, state: PeerState) -> Option<()> {
        if self.self_addrs.contains(&addr) {
            tracing::warn!(%addr, "refusing to create arbitration peer at our own address");
            return None;
        }
        if !self.peers.contains_key(&addr) && self.peers.len() >= MAX_PEERS {
            tracing::error!(max = MAX_PEERS, %addr, "(MAX_PEERS) too many peers");
            return None;
        }
        self.peers.insert(addr, Peer::new(addr, state));
        Some(())
    }

    /// Transition `addr`'s peer to `new_state`, logging and notifying every
    /// registered handler synchronously (spec §4.2: "Transitions notify
    /// every registered handler's state-change callback").
    pub fn transition_peer(&mut self, addr: SocketAddr, new_state: PeerState) {
        let Some(peer) = self.peers.get_mut(&addr) else {
            return;
        };
        if peer.state() == new_state {
            return;
        }
        tracing::info!(%addr, from = %peer.state(), to = %new_state, "peer state transition");
        peer.set_state(new_state);
        for handler in self.handlers.values_mut() {
            handler.on_state_change(addr, new_state);
        }
    }

    /// Encode and send a packet to `addr`, marking the peer's last-outbound
    /// timestamp if a peer record exists there. Does not require a peer
    /// record to exist (the ARBITRATE `behalf` punch sends to an address
    /// before any local record is guaranteed, though in practice this
    /// implementation always creates one first).
    pub async fn send_packet(&mut self, addr: SocketAddr, pkt: Packet) -> Result<(), CoreError> {
        let wire = drizzle_wire::encode(&pkt).map_err(|e| {
            tracing::error!(%addr, error = %e, "failed to encode outbound packet");
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;
        self.socket.send_to(&wire, addr).await?;
        if let Some(peer) = self.peers.get_mut(&addr) {
            peer.mark_outbound();
        }
        Ok(())
    }

    /// Create (if needed) a peer at `addr` and send it `SYNC{you=addr}`
    /// (spec §4.2's `SyncTo` API).
    pub async fn sync_to(&mut self, addr: SocketAddr) -> Result<(), CoreError> {
        if self.self_addrs.contains(&addr) {
            return Err(CoreError::SelfAddress(addr));
        }
        if self.get_or_create_peer(addr).is_none() {
            return Err(CoreError::TooManyPeers(MAX_PEERS, addr));
        }
        tracing::info!(%addr, "SyncTo");
        let pkt = Packet::empty(Command::Sync).with("you", wireaddr::to_attr(addr));
        self.send_packet(addr, pkt).await
    }

    /// Send DESYNC to every currently-DIRECT (or DIRECT_LOCAL) peer, without
    /// waiting for any acknowledgement (spec §5: "does not wait for
    /// acknowledgement").
    pub async fn desync_all(&mut self) {
        tracing::info!("desyncing all peers");
        let targets: Vec<SocketAddr> = self
            .peers
            .values()
            .filter(|p| p.state().is_connected())
            .map(|p| p.addr())
            .collect();
        for addr in targets {
            let _ = self.send_packet(addr, Packet::empty(Command::Desync)).await;
        }
    }

    /// Gracefully disconnect one peer: send DESYNC if it wasn't already
    /// disconnected, then transition it to NOT_CONNECTED regardless.
    pub async fn disconnect(&mut self, addr: SocketAddr) {
        tracing::info!(%addr, "disconnecting");
        let already_down = self
            .peers
            .get(&addr)
            .map(|p| p.state() == PeerState::NotConnected)
            .unwrap_or(true);
        if !already_down {
            let _ = self.send_packet(addr, Packet::empty(Command::Desync)).await;
        }
        self.transition_peer(addr, PeerState::NotConnected);
    }

    /// Run the event loop: receive one datagram with a bounded timeout, run
    /// every due timer, repeat until [`ShutdownHandle::stop`] is called
    /// (spec §4.5 / §5).
    pub async fn run(&mut self) {
        self.running.store(true, Ordering::SeqCst);
        let mut buf = vec![0u8; self.mtu];
        while self.running.load(Ordering::SeqCst) {
            match tokio::time::timeout(self.recv_timeout, self.socket.recv_from(&mut buf)).await {
                Ok(Ok((n, src))) => self.on_datagram(&buf[..n], src).await,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "socket I/O error; continuing");
                }
                Err(_) => {
                    // Timed out; fall through to the timer sweep below.
                }
            }
            self.run_timers().await;
        }
    }

    /// Handle one inbound datagram: locate or create its peer, drop if
    /// BLOCKED, otherwise decode and dispatch (spec §4.5's `Recv`).
    pub async fn on_datagram(&mut self, data: &[u8], src: SocketAddr) {
        let Some(peer) = self.get_or_create_peer(src) else {
            tracing::warn!(%src, "dropped packet; could not create peer");
            return;
        };
        if peer.state() == PeerState::Blocked {
            tracing::info!(%src, "dropping packet (peer is blocked)");
            return;
        }
        peer.mark_inbound();
        let pkt = drizzle_wire::decode(data);
        self.dispatch_command(src, pkt).await;
    }

    /// Evaluate every timer; run each due timer's duty exactly once and
    /// reschedule it (spec §4.2 / §4.5).
    async fn run_timers(&mut self) {
        let now = Instant::now();
        let mut due = Vec::new();
        for timer in &mut self.timers {
            if timer.is_due(now) {
                due.push(timer.kind());
                timer.reschedule(now);
            }
        }
        for kind in due {
            match kind {
                TimerKind::PeerTick => self.do_peer_timers().await,
                TimerKind::ConnectionSweep => self.do_connection_sweep().await,
            }
        }
    }

    /// Run the keep-alive and state-refresh timers over every known peer.
    async fn do_peer_timers(&mut self) {
        let addrs: Vec<SocketAddr> = self.peers.keys().copied().collect();
        for addr in addrs {
            self.do_ka_timer(addr).await;
            self.do_state_timer(addr).await;
        }
    }

    async fn do_ka_timer(&mut self, addr: SocketAddr) {
        let Some(peer) = self.peers.get(&addr) else {
            return;
        };
        if !peer.state().is_connected() {
            return;
        }
        let now = Instant::now();
        if now.duration_since(peer.last_inbound()) > KA_DROP {
            tracing::info!(%addr, "disconnecting due to keep-alive timeout");
            self.disconnect(addr).await;
        } else if now.duration_since(peer.last_outbound()) > KA_INTERVAL {
            tracing::debug!(%addr, "keep-alive sent");
            let _ = self.send_packet(addr, Packet::empty(Command::Keepalive)).await;
        }
    }

    async fn do_state_timer(&mut self, addr: SocketAddr) {
        let Some(peer) = self.peers.get(&addr) else {
            return;
        };
        if !peer.state().is_connected() {
            return;
        }
        if Instant::now().duration_since(peer.last_refresh()) > STATE_UPDATE {
            self.request_state_refresh(addr).await;
        }
    }

    /// Issue HANDLERS{} then PEERS{} to `addr` and mark the refresh time.
    /// Shared by the periodic state-refresh timer and the immediate burst a
    /// SYNC response triggers (spec §4.2, §9 design note).
    pub(crate) async fn request_state_refresh(&mut self, addr: SocketAddr) {
        tracing::debug!(%addr, "requesting state refresh");
        let _ = self.send_packet(addr, Packet::empty(Command::Handlers)).await;
        let _ = self.send_packet(addr, Packet::empty(Command::Peers)).await;
        if let Some(peer) = self.peers.get_mut(&addr) {
            peer.mark_refresh();
        }
    }

    /// The periodic connection sweep: evict self-addresses, pick a DIRECT
    /// broker, and start arbitrating every INDIRECT peer through it, up to
    /// `MAX_ARBITRATIONS` (spec §4.5).
    async fn do_connection_sweep(&mut self) {
        tracing::debug!("running connection sweep");
        for addr in self.self_addrs.clone() {
            self.peers.remove(&addr);
        }

        let broker = self
            .peers
            .values()
            .find(|p| p.state() == PeerState::Direct)
            .map(|p| p.addr());

        let Some(broker) = broker else {
            tracing::warn!(
                "no directly connected peers; connection sweep has nothing to do"
            );
            return;
        };

        let indirect: Vec<SocketAddr> = self
            .peers
            .values()
            .filter(|p| p.state() == PeerState::Indirect)
            .map(|p| p.addr())
            .collect();

        for (i, addr) in indirect.into_iter().enumerate() {
            if i >= MAX_ARBITRATIONS {
                tracing::warn!(
                    max = MAX_ARBITRATIONS,
                    "(MAX_ARBITRATIONS) hit arbitration limit this sweep"
                );
                break;
            }
            tracing::debug!(%addr, %broker, "arbitrating through broker");
            let pkt = Packet::empty(Command::Arbitrate).with("remote", wireaddr::to_attr(addr));
            let _ = self.send_packet(broker, pkt).await;
            self.transition_peer(addr, PeerState::Arbitrating);
        }
    }
}
