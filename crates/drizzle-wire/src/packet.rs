use crate::{AttrValue, Attributes, Command};

/// A decoded command plus its attribute map.
///
/// Packets are value objects: equality is structural and identity is not
/// significant, matching spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The command this packet carries.
    pub cmd: Command,
    attrs: Attributes,
}

impl Packet {
    /// Build a packet from a command and an attribute map.
    pub fn new(cmd: Command, attrs: Attributes) -> Self {
        Self { cmd, attrs }
    }

    /// Build a packet with no attributes.
    pub fn empty(cmd: Command) -> Self {
        Self::new(cmd, Attributes::new())
    }

    /// Borrow the attribute map.
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Mutably borrow the attribute map.
    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    /// True if every named attribute is present.
    pub fn has(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.attrs.contains_key(*k))
    }

    /// True if the named attribute is present.
    pub fn has_one(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    /// Fetch an attribute by name.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Set an attribute, builder-style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Set an attribute in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(key.into(), value.into());
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Packet cmd={} {:?}>", self.cmd, self.attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_requires_all_named_keys() {
        let pkt = Packet::empty(Command::Route)
            .with("src", ("1.2.3.4".to_string(), 9652))
            .with("ttl", 3i64);
        assert!(pkt.has(&["src", "ttl"]));
        assert!(!pkt.has(&["src", "ttl", "dest"]));
    }

    #[test]
    fn builder_and_get_round_trip() {
        let pkt = Packet::empty(Command::Keepalive).with("response", 1i64);
        assert_eq!(pkt.get("response").and_then(|v| v.as_int()), Some(1));
        assert!(pkt.has_one("response"));
        assert!(!pkt.has_one("missing"));
    }
}
