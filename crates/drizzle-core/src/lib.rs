//! The mesh node: peer state machine, dispatch table, arbitration, and
//! routing over a `drizzle-wire` packet stream.

mod commands;
mod dispatch;
mod error;
mod handler;
mod node;
mod peer;
mod routing;
mod security;
mod state;
mod timer;
mod wireaddr;

pub use error::CoreError;
pub use handler::Handler;
pub use node::{Node, ShutdownHandle};
pub use peer::Peer;
pub use security::{CipherKind, HashKind, SecDecision, SecMode};
pub use state::PeerState;

pub use node::{
    CONNECT_INTERVAL, DEFAULT_MTU, DEFAULT_SEC_LEVEL, DEFAULT_TIMEOUT, KA_DROP, KA_INTERVAL,
    MAX_ARBITRATIONS, MAX_CONNECTIONS, MAX_PEERS, MAX_SELVES, PT_RESOLUTION, STATE_UPDATE,
};
