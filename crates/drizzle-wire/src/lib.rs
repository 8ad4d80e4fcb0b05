//! Wire protocol for the Drizzle mesh: command tag + attribute map.
//!
//! A datagram is one byte of [`Command`] followed by a `postcard`-serialized
//! attribute map (`Attributes`). Decoding is deliberately permissive: a
//! malformed datagram never produces an error, it degrades to a harmless
//! `KEEPALIVE{}` so a flaky link can't take the mesh down. Handlers are
//! responsible for checking which attributes are actually present via
//! [`Packet::has`] / [`Packet::get`].

mod attr;
mod command;
mod error;
mod packet;

pub use attr::{AttrValue, Attributes};
pub use command::Command;
pub use error::WireError;
pub use packet::Packet;

/// Result type for wire-layer operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Encode a packet to its wire form: one command byte, then the serialized
/// attribute map.
pub fn encode(pkt: &Packet) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(1 + 32);
    out.push(pkt.cmd as u8);
    let body = postcard::to_allocvec(pkt.attrs()).map_err(WireError::Encode)?;
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a datagram into a packet. Never fails: a missing command tag byte
/// degrades to `KEEPALIVE`, and an attribute map that won't deserialize
/// degrades to empty. Both cases log a warning.
pub fn decode(data: &[u8]) -> Packet {
    let Some((&tag, rest)) = data.split_first() else {
        tracing::warn!("empty datagram; defaulting to KEEPALIVE{{}}");
        return Packet::new(Command::Keepalive, Attributes::new());
    };

    let cmd = Command::try_from(tag).unwrap_or_else(|_| {
        tracing::warn!(tag, "unrecognized command tag; defaulting to KEEPALIVE{{}}");
        Command::Keepalive
    });

    let attrs: Attributes = postcard::from_bytes(rest).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "malformed attribute map; defaulting to empty");
        Attributes::new()
    });

    Packet::new(cmd, attrs)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `decode` must never panic on arbitrary input, whatever its length
        /// or a valid command tag followed by garbage — a flaky or hostile
        /// link can't be allowed to crash the node.
        #[test]
        fn decode_never_panics_on_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let _ = decode(&data);
        }

        /// An attribute value built from an arbitrary UTF-8 string always
        /// round-trips through encode/decode unchanged.
        #[test]
        fn arbitrary_string_attr_round_trips(s in "\\PC{0,64}") {
            let pkt = Packet::empty(Command::Data).with("handler", s.clone());
            let wire = encode(&pkt).unwrap();
            let decoded = decode(&wire);
            prop_assert_eq!(decoded.get("handler").and_then(|v| v.as_str()), Some(s.as_str()));
        }
    }
}
