/// A peer's reachability classification.
///
/// Transitions happen only from a command handler or a timer callback
/// (spec §4.2); nothing else is allowed to mutate a peer's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerState {
    /// Known-of only; no traffic.
    NotConnected,
    /// Two-way UDP reachability confirmed by a SYNC exchange.
    Direct,
    /// Reachable via at least one DIRECT intermediary, not directly.
    Indirect,
    /// Hole-punch attempt in progress.
    Arbitrating,
    /// Administratively refused; inbound packets dropped.
    Blocked,
    /// DIRECT, but on the same LAN — must not be advertised for arbitration
    /// to WAN peers.
    DirectLocal,
    /// Learned from a peer's PEERS listing where that peer classifies it as
    /// INDIRECT or DIRECT_LOCAL; not a candidate for arbitration here. May be
    /// upgraded to INDIRECT if a DIRECT holder is found.
    IndirectRemote,
}

impl PeerState {
    /// The two states in which DATA/ROUTE/ARBITRATE/PEERS/HANDLERS/KEEPALIVE
    /// are accepted (spec invariant 3).
    pub const CONNECTED: [PeerState; 2] = [PeerState::Direct, PeerState::DirectLocal];

    /// True if this state is one of the two "connected" states.
    pub fn is_connected(self) -> bool {
        matches!(self, PeerState::Direct | PeerState::DirectLocal)
    }

    /// Wire-compatible integer encoding, used in PEERS `states` lists. Mirrors
    /// the original implementation's `STATE` constants so a mixed-version
    /// mesh still agrees on the ordering.
    pub fn as_wire(self) -> i64 {
        match self {
            PeerState::NotConnected => 0,
            PeerState::Direct => 1,
            PeerState::Indirect => 2,
            PeerState::Arbitrating => 3,
            PeerState::Blocked => 4,
            PeerState::DirectLocal => 5,
            PeerState::IndirectRemote => 6,
        }
    }

    /// Decode a wire-form state integer, defaulting unknown values to
    /// `NotConnected` rather than erroring (permissive, like packet decode).
    pub fn from_wire(v: i64) -> PeerState {
        match v {
            1 => PeerState::Direct,
            2 => PeerState::Indirect,
            3 => PeerState::Arbitrating,
            4 => PeerState::Blocked,
            5 => PeerState::DirectLocal,
            6 => PeerState::IndirectRemote,
            _ => PeerState::NotConnected,
        }
    }

    /// Lowercase-free name for logging.
    pub fn name(self) -> &'static str {
        match self {
            PeerState::NotConnected => "NOT_CONNECTED",
            PeerState::Direct => "DIRECT",
            PeerState::Indirect => "INDIRECT",
            PeerState::Arbitrating => "ARBITRATING",
            PeerState::Blocked => "BLOCKED",
            PeerState::DirectLocal => "DIRECT_LOCAL",
            PeerState::IndirectRemote => "INDIRECT_REMOTE",
        }
    }
}

impl std::fmt::Display for PeerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        for s in [
            PeerState::NotConnected,
            PeerState::Direct,
            PeerState::Indirect,
            PeerState::Arbitrating,
            PeerState::Blocked,
            PeerState::DirectLocal,
            PeerState::IndirectRemote,
        ] {
            assert_eq!(PeerState::from_wire(s.as_wire()), s);
        }
    }

    #[test]
    fn unknown_wire_value_defaults_not_connected() {
        assert_eq!(PeerState::from_wire(99), PeerState::NotConnected);
    }

    #[test]
    fn only_direct_states_are_connected() {
        assert!(PeerState::Direct.is_connected());
        assert!(PeerState::DirectLocal.is_connected());
        assert!(!PeerState::Indirect.is_connected());
        assert!(!PeerState::Arbitrating.is_connected());
    }
}
