/// The closed set of command tags carried by a packet's first wire byte.
///
/// Values are fixed by the protocol and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Command {
    /// No-op, sent periodically to avoid timeouts.
    Keepalive = 0,
    /// Synchronize with a peer.
    Sync = 1,
    /// Gracefully desynchronize with a peer.
    Desync = 2,
    /// Request a hole-punching maneuver via a broker.
    Arbitrate = 3,
    /// List or report known peers.
    Peers = 4,
    /// List or report registered handler names.
    Handlers = 5,
    /// Opaque application data for a named handler.
    Data = 6,
    /// Best-effort forwarded delivery.
    Route = 7,
}

impl Command {
    /// All commands, in wire-tag order.
    pub const ALL: [Command; 8] = [
        Command::Keepalive,
        Command::Sync,
        Command::Desync,
        Command::Arbitrate,
        Command::Peers,
        Command::Handlers,
        Command::Data,
        Command::Route,
    ];

    /// Lowercase name used in log messages.
    pub fn name(self) -> &'static str {
        match self {
            Command::Keepalive => "KEEPALIVE",
            Command::Sync => "SYNC",
            Command::Desync => "DESYNC",
            Command::Arbitrate => "ARBITRATE",
            Command::Peers => "PEERS",
            Command::Handlers => "HANDLERS",
            Command::Data => "DATA",
            Command::Route => "ROUTE",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Command {
    type Error = crate::WireError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Command::ALL
            .into_iter()
            .find(|c| *c as u8 == tag)
            .ok_or(crate::WireError::UnknownCommand(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_values_match_spec() {
        assert_eq!(Command::Keepalive as u8, 0);
        assert_eq!(Command::Sync as u8, 1);
        assert_eq!(Command::Desync as u8, 2);
        assert_eq!(Command::Arbitrate as u8, 3);
        assert_eq!(Command::Peers as u8, 4);
        assert_eq!(Command::Handlers as u8, 5);
        assert_eq!(Command::Data as u8, 6);
        assert_eq!(Command::Route as u8, 7);
    }

    #[test]
    fn try_from_round_trips_all_tags() {
        for cmd in Command::ALL {
            assert_eq!(Command::try_from(cmd as u8).unwrap(), cmd);
        }
    }

    #[test]
    fn try_from_rejects_out_of_range() {
        assert!(Command::try_from(8).is_err());
        assert!(Command::try_from(255).is_err());
    }
}
