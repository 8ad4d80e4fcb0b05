/// Errors surfaced by the mesh core.
///
/// Nothing in the protocol layer panics: malformed input, protocol
/// violations, and resource exhaustion are all logged and absorbed (spec
/// §7). This type exists for the handful of operations — socket setup,
/// `SyncTo` against an address the node claims itself — where the caller
/// genuinely needs to know the operation didn't happen.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Binding or reading from the UDP socket failed.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `SyncTo` was asked to connect to one of the node's own addresses.
    #[error("refusing to create a peer at a self-address: {0}")]
    SelfAddress(std::net::SocketAddr),

    /// The peer table is already at `MAX_PEERS`.
    #[error("peer table is full (MAX_PEERS={0}); refusing to add {1}")]
    TooManyPeers(usize, std::net::SocketAddr),
}
