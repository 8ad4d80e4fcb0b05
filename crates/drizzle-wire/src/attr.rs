use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value that can appear in a packet's attribute map.
///
/// This stands in for the external self-describing codec named in the
/// protocol's scope (spec §1): any value the mesh core needs to pass between
/// peers — booleans, integers, byte strings, lists, addresses, and nested
/// maps — is representable here, and serialized with `postcard` rather than
/// a bespoke format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    /// A boolean flag.
    Bool(bool),
    /// A signed integer (covers chunk indices, ttl, states, etc).
    Int(i64),
    /// A UTF-8 string.
    Str(String),
    /// An opaque byte string.
    Bytes(Vec<u8>),
    /// A `(host, port)` tuple, the wire form of a socket address.
    Addr(String, u16),
    /// An ordered list of values.
    List(Vec<AttrValue>),
    /// A nested attribute map.
    Map(Attributes),
}

impl AttrValue {
    /// View this value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// View this value as a `(host, port)` address, if it is one.
    pub fn as_addr(&self) -> Option<(&str, u16)> {
        match self {
            AttrValue::Addr(host, port) => Some((host.as_str(), *port)),
            _ => None,
        }
    }

    /// View this value as a byte string, if it is one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttrValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// View this value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// View this value as a list, if it is one.
    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<(String, u16)> for AttrValue {
    fn from((host, port): (String, u16)) -> Self {
        AttrValue::Addr(host, port)
    }
}

/// A string-keyed attribute map, ordered for deterministic wire encoding.
pub type Attributes = BTreeMap<String, AttrValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variant() {
        assert_eq!(AttrValue::Int(7).as_int(), Some(7));
        assert_eq!(AttrValue::Bool(true).as_int(), None);
        assert_eq!(
            AttrValue::Addr("10.0.0.1".into(), 1234).as_addr(),
            Some(("10.0.0.1", 1234))
        );
        assert_eq!(AttrValue::Bytes(vec![1, 2, 3]).as_bytes(), Some(&[1, 2, 3][..]));
    }
}
