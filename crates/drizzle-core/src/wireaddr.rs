//! Conversions between [`std::net::SocketAddr`] and the wire's `(host, port)`
//! tuple form (spec §6).

use drizzle_wire::AttrValue;
use std::net::SocketAddr;

/// Encode a socket address as the wire's `(host_string, port_int)` tuple.
pub fn to_attr(addr: SocketAddr) -> AttrValue {
    AttrValue::Addr(addr.ip().to_string(), addr.port())
}

/// Decode a wire address tuple back to a socket address, if the value is one
/// and the host string parses as an IP.
pub fn from_attr(v: &AttrValue) -> Option<SocketAddr> {
    let (host, port) = v.as_addr()?;
    let ip = host.parse().ok()?;
    Some(SocketAddr::new(ip, port))
}

/// Decode a wire list of address tuples, skipping any entry that doesn't
/// parse (permissive, matching the packet decoder's posture toward
/// malformed input).
pub fn list_from_attr(v: &AttrValue) -> Vec<SocketAddr> {
    v.as_list()
        .map(|items| items.iter().filter_map(from_attr).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_v4_and_v6() {
        let v4: SocketAddr = "10.0.0.1:9652".parse().unwrap();
        let v6: SocketAddr = "[::1]:9652".parse().unwrap();
        assert_eq!(from_attr(&to_attr(v4)), Some(v4));
        assert_eq!(from_attr(&to_attr(v6)), Some(v6));
    }

    #[test]
    fn rejects_unparseable_host() {
        let bad = AttrValue::Addr("not-an-ip".into(), 1234);
        assert_eq!(from_attr(&bad), None);
    }

    #[test]
    fn non_addr_value_is_not_an_addr() {
        assert_eq!(from_attr(&AttrValue::Int(1)), None);
    }
}
