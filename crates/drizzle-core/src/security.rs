//! Security-policy gate (spec §4.6).
//!
//! This module classifies cryptographic primitives by a numeric strength so
//! the mesh can refuse to associate weak algorithms with security-tagged
//! application handlers. No cipher or hash is actually implemented here —
//! encryption and hashing are non-goals of this layer (spec §1); this is
//! purely a labeled lookup table the original `netlayer.py` built ad hoc
//! from `AES.strength = 256`-style annotations on the `Crypto` package.

/// A symmetric cipher, labeled by strength only. Carried as a tag so
/// application-level handlers can reason about what the peer offered,
/// without this layer touching key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherKind {
    Aes,
    Cast,
    Des3,
    Des,
    /// Zero-byte-key cipher used as an explicit "no encryption" baseline.
    Null,
}

impl CipherKind {
    /// Strength in [0, 256]. 0 = no security, 16 = known-weak, 128 =
    /// acceptable, 256 = essentially unbreakable in the current setting.
    pub fn strength(self) -> u16 {
        match self {
            CipherKind::Aes => 256,
            CipherKind::Cast => 256,
            CipherKind::Des3 => 128,
            CipherKind::Des => 16,
            CipherKind::Null => 0,
        }
    }
}

/// A hash function, labeled by strength only (see [`CipherKind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKind {
    Sha512,
    Sha1,
    Md5,
    /// Zero-byte-digest hash used as an explicit "no integrity" baseline.
    Null,
}

impl HashKind {
    /// Strength in [0, 256], same scale as [`CipherKind::strength`].
    pub fn strength(self) -> u16 {
        match self {
            HashKind::Sha512 => 256,
            HashKind::Sha1 => 128,
            HashKind::Md5 => 16,
            HashKind::Null => 0,
        }
    }
}

/// The node's posture toward peers offering a primitive below its strength
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecMode {
    /// Reject connections with low security outright.
    Reject,
    /// Accept the connection, but don't let security-tagged application
    /// handlers use it.
    AcceptLimited,
    /// Accept as usual. Not recommended.
    Accept,
}

impl Default for SecMode {
    fn default() -> Self {
        SecMode::AcceptLimited
    }
}

/// Gate decision for a primitive of the given strength under `mode` with the
/// node's configured minimum `threshold`.
///
/// This layer doesn't itself perform encryption (spec §4.6); it only
/// produces the policy decision that an application-level handler should
/// honor before exposing a peer to a security-sensitive capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecDecision {
    /// The primitive meets the threshold, or the mode admits it regardless.
    Admit,
    /// The primitive is below threshold and the mode refuses it outright.
    Reject,
    /// The primitive is below threshold; the peer is usable but must not be
    /// handed to security-tagged handlers.
    LimitedOnly,
}

/// Evaluate the gate for a primitive of the given `strength`.
pub fn evaluate(mode: SecMode, threshold: u16, strength: u16) -> SecDecision {
    if strength >= threshold {
        return SecDecision::Admit;
    }
    match mode {
        SecMode::Reject => SecDecision::Reject,
        SecMode::AcceptLimited => SecDecision::LimitedOnly,
        SecMode::Accept => SecDecision::Admit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strengths_match_original_table() {
        assert_eq!(CipherKind::Aes.strength(), 256);
        assert_eq!(CipherKind::Cast.strength(), 256);
        assert_eq!(CipherKind::Des3.strength(), 128);
        assert_eq!(CipherKind::Des.strength(), 16);
        assert_eq!(CipherKind::Null.strength(), 0);
        assert_eq!(HashKind::Sha512.strength(), 256);
        assert_eq!(HashKind::Sha1.strength(), 128);
        assert_eq!(HashKind::Md5.strength(), 16);
        assert_eq!(HashKind::Null.strength(), 0);
    }

    #[test]
    fn reject_mode_refuses_below_threshold() {
        assert_eq!(evaluate(SecMode::Reject, 32, 16), SecDecision::Reject);
        assert_eq!(evaluate(SecMode::Reject, 32, 256), SecDecision::Admit);
    }

    #[test]
    fn accept_limited_downgrades_instead_of_rejecting() {
        assert_eq!(
            evaluate(SecMode::AcceptLimited, 32, 16),
            SecDecision::LimitedOnly
        );
        assert_eq!(
            evaluate(SecMode::AcceptLimited, 32, 256),
            SecDecision::Admit
        );
    }

    #[test]
    fn accept_admits_everything() {
        assert_eq!(evaluate(SecMode::Accept, 1000, 0), SecDecision::Admit);
    }
}
