//! CLI argument parsing

use clap::Parser;
use std::net::SocketAddr;

/// Default UDP port a node listens on when none is given.
pub const DEFAULT_PORT: u16 = 9652;

#[derive(Parser)]
#[command(name = "drizzle")]
#[command(author, version, about = "A compact UDP meshnet node", long_about = None)]
pub struct Cli {
    /// Address to bind the UDP socket on
    #[arg(short, long, default_value_t = default_listen())]
    pub listen: SocketAddr,

    /// Peer to synchronize with on startup (host:port), may be repeated
    #[arg(short, long = "peer")]
    pub peers: Vec<SocketAddr>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit startup status lines as JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    /// Minimum accepted cryptographic strength, 0-256
    #[arg(long, default_value_t = drizzle_core::DEFAULT_SEC_LEVEL)]
    pub sec_level: u16,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}
