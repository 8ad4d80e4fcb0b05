use crate::state::PeerState;
use drizzle_wire::Command;

/// Which peer states a command is accepted in.
///
/// Replaces the original's `@STATE.ONLY(...)` / `@STATE.EXCLUDE(...)`
/// decorators (spec §9 REDESIGN FLAG) with declarative data a dispatch
/// table can hold without needing per-handler attributes bolted onto a
/// function object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateGate {
    /// Accepted regardless of the peer's current state.
    Any,
    /// Accepted only when the peer is DIRECT or DIRECT_LOCAL.
    Connected,
    /// Accepted only when the peer is neither DIRECT nor DIRECT_LOCAL.
    NotYetConnected,
}

impl StateGate {
    /// Whether `state` satisfies this gate.
    pub fn accepts(self, state: PeerState) -> bool {
        match self {
            StateGate::Any => true,
            StateGate::Connected => state.is_connected(),
            StateGate::NotYetConnected => !state.is_connected(),
        }
    }
}

/// One dispatch-table entry: a command's state gate and its required
/// attributes. [`crate::Node::dispatch_command`] checks both before handing
/// the packet to the command's handler, so no individual handler has to
/// remember to do it (spec §4.1 — "Dispatch validates both before invoking
/// the handler").
#[derive(Debug, Clone, Copy)]
pub struct DispatchEntry {
    pub command: Command,
    pub gate: StateGate,
    pub required: &'static [&'static str],
}

/// The full dispatch table, one entry per command, mirroring spec §6's
/// request-attribute table and §4.2's per-command state gates.
pub const TABLE: [DispatchEntry; 8] = [
    DispatchEntry {
        command: Command::Keepalive,
        gate: StateGate::Connected,
        required: &[],
    },
    DispatchEntry {
        command: Command::Sync,
        gate: StateGate::NotYetConnected,
        required: &[],
    },
    DispatchEntry {
        command: Command::Desync,
        gate: StateGate::Any,
        required: &[],
    },
    DispatchEntry {
        command: Command::Arbitrate,
        gate: StateGate::Connected,
        required: &[],
    },
    DispatchEntry {
        command: Command::Peers,
        gate: StateGate::Connected,
        required: &[],
    },
    DispatchEntry {
        command: Command::Handlers,
        gate: StateGate::Connected,
        required: &[],
    },
    DispatchEntry {
        command: Command::Data,
        gate: StateGate::Connected,
        required: &["handler"],
    },
    DispatchEntry {
        command: Command::Route,
        gate: StateGate::Connected,
        required: &["dest", "data", "ttl", "src"],
    },
];

/// Look up the dispatch entry for `cmd`.
pub fn entry_for(cmd: Command) -> &'static DispatchEntry {
    TABLE
        .iter()
        .find(|e| e.command == cmd)
        .expect("TABLE has one entry per Command variant")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_exactly_one_entry() {
        for cmd in Command::ALL {
            let matches = TABLE.iter().filter(|e| e.command == cmd).count();
            assert_eq!(matches, 1, "{cmd} should have exactly one dispatch entry");
        }
    }

    #[test]
    fn data_and_route_require_their_named_attrs() {
        assert_eq!(entry_for(Command::Data).required, &["handler"]);
        assert_eq!(
            entry_for(Command::Route).required,
            &["dest", "data", "ttl", "src"]
        );
    }

    #[test]
    fn sync_only_accepted_before_connected() {
        let gate = entry_for(Command::Sync).gate;
        assert!(gate.accepts(PeerState::NotConnected));
        assert!(!gate.accepts(PeerState::Direct));
        assert!(!gate.accepts(PeerState::DirectLocal));
    }

    #[test]
    fn desync_accepted_in_any_state() {
        let gate = entry_for(Command::Desync).gate;
        for s in [
            PeerState::NotConnected,
            PeerState::Direct,
            PeerState::Indirect,
            PeerState::Arbitrating,
            PeerState::Blocked,
            PeerState::DirectLocal,
            PeerState::IndirectRemote,
        ] {
            assert!(gate.accepts(s));
        }
    }
}
