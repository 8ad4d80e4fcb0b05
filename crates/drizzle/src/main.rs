//! drizzle - a compact UDP meshnet node

mod cli;
mod exit_codes;
mod logging;

use clap::Parser;
use cli::Cli;
use drizzle_core::{Node, SecMode};

/// Print a startup status line unconditionally to stdout — plain text, or a
/// single JSON line under `--json` — independent of the `tracing` verbosity
/// level, so a plain `drizzle` invocation still shows it started (spec §6).
fn print_status(json: bool, plain: &str, as_json: impl FnOnce() -> serde_json::Value) {
    if json {
        println!("{}", as_json());
    } else {
        println!("{plain}");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose, cli.quiet) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(exit_codes::ERROR);
    }

    let mut node = match Node::bind(cli.listen).await {
        Ok(node) => node,
        Err(e) => {
            tracing::error!(error = %e, addr = %cli.listen, "failed to bind socket");
            std::process::exit(exit_codes::BIND_ERROR);
        }
    };

    node.set_secmode(SecMode::AcceptLimited);
    node.set_sec_level(cli.sec_level);

    let local = node
        .local_addr()
        .expect("socket was just bound successfully");
    tracing::info!(%local, "listening");
    print_status(cli.json, &format!("listening on {local}"), || {
        serde_json::json!({"event": "listening", "addr": local.to_string()})
    });

    for peer in &cli.peers {
        match node.sync_to(*peer).await {
            Ok(()) => print_status(cli.json, &format!("syncing to {peer}"), || {
                serde_json::json!({"event": "sync_to", "addr": peer.to_string()})
            }),
            Err(e) => {
                tracing::warn!(%peer, error = %e, "could not start sync");
                print_status(cli.json, &format!("could not sync to {peer}: {e}"), || {
                    serde_json::json!({"event": "sync_failed", "addr": peer.to_string(), "error": e.to_string()})
                });
            }
        }
    }

    tokio::select! {
        _ = node.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received interrupt, desyncing and shutting down");
        }
    }
    node.desync_all().await;

    std::process::exit(exit_codes::SUCCESS);
}
