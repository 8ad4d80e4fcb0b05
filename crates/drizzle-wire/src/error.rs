/// Errors surfaced by the wire layer.
///
/// Decoding itself never produces one of these — malformed input degrades
/// permissively (see [`crate::decode`]). This type exists for the encode
/// path and for callers that want to reject a command tag explicitly rather
/// than rely on the permissive decoder.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// `postcard` failed to serialize the attribute map.
    #[error("failed to encode attribute map: {0}")]
    Encode(postcard::Error),

    /// A command byte outside the closed {0..=7} set.
    #[error("unrecognized command tag: {0}")]
    UnknownCommand(u8),
}
