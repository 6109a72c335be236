//! Client address classification.
//!
//! Resolves the originating address of a submission from the sources a
//! routing layer can offer, normalizes it for exact-string comparison and
//! flags private/loopback and proxied origins.

use std::net::{IpAddr, Ipv4Addr};

use crate::error::{AttendanceError, AttendanceResult};

const IPV4_MAPPED_PREFIX: &str = "::ffff:";
const IPV6_LOOPBACK: &str = "::1";
const IPV4_LOOPBACK: &str = "127.0.0.1";
const LOCALHOST: &str = "localhost";

/// Address information for one request, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientAddress {
    /// Comma-separated forwarding chain, left-most entry closest to the origin.
    pub forwarded_for: Option<String>,
    /// Single client address header set by a fronting proxy.
    pub real_ip: Option<String>,
    /// Transport-level peer address.
    pub peer: Option<IpAddr>,
}

impl ClientAddress {
    pub fn with_forwarded_for(mut self, chain: impl Into<String>) -> Self {
        self.forwarded_for = Some(chain.into());
        self
    }

    pub fn with_real_ip(mut self, address: impl Into<String>) -> Self {
        self.real_ip = Some(address.into());
        self
    }

    pub fn with_peer(mut self, peer: IpAddr) -> Self {
        self.peer = Some(peer);
        self
    }
}

/// Normalized address plus classification flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedAddress {
    pub address: String,
    pub is_private: bool,
    pub is_proxied: bool,
}

/// Classify the first address source that yields a usable entry.
pub fn classify(source: &ClientAddress) -> AttendanceResult<ClassifiedAddress> {
    if let Some(classified) = source.forwarded_for.as_deref().and_then(classify_raw) {
        return Ok(classified);
    }
    if let Some(classified) = source.real_ip.as_deref().and_then(classify_raw) {
        // A single-address header never indicates a chain.
        return Ok(ClassifiedAddress {
            is_proxied: false,
            ..classified
        });
    }
    if let Some(peer) = source.peer {
        let address = normalize(&peer.to_string());
        return Ok(ClassifiedAddress {
            is_private: is_private_address(&address),
            address,
            is_proxied: false,
        });
    }
    Err(AttendanceError::AddressUnresolvable)
}

/// Classify a raw, possibly comma-separated, address value.
///
/// Returns `None` when the value holds no non-empty entry.
pub fn classify_raw(raw: &str) -> Option<ClassifiedAddress> {
    let entries: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();
    let first = entries.first()?;
    let address = normalize(first);
    Some(ClassifiedAddress {
        is_private: is_private_address(&address),
        address,
        is_proxied: entries.len() > 1,
    })
}

/// Strip the IPv4-mapped IPv6 prefix and fold the IPv6 loopback onto IPv4.
pub fn normalize(entry: &str) -> String {
    let trimmed = entry.trim();
    if trimmed == IPV6_LOOPBACK {
        return IPV4_LOOPBACK.to_string();
    }
    match trimmed.get(..IPV4_MAPPED_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(IPV4_MAPPED_PREFIX) => {
            trimmed[IPV4_MAPPED_PREFIX.len()..].to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Loopback, 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16 or the literal `localhost`.
pub fn is_private_address(address: &str) -> bool {
    if address.eq_ignore_ascii_case(LOCALHOST) {
        return true;
    }
    match address.parse::<Ipv4Addr>() {
        Ok(ip) => ip.is_loopback() || ip.is_private(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_forwarding_chain_takes_first_entry() {
        let classified = classify_raw(" 203.0.113.9 , 10.0.0.1, 172.16.0.1").unwrap();
        assert_eq!(classified.address, "203.0.113.9");
        assert!(classified.is_proxied);
        assert!(!classified.is_private);
    }

    #[test]
    fn test_single_entry_is_not_proxied() {
        let classified = classify_raw("203.0.113.9").unwrap();
        assert!(!classified.is_proxied);
    }

    #[test]
    fn test_mapped_prefix_and_loopback_normalization() {
        assert_eq!(normalize("::ffff:192.168.1.20"), "192.168.1.20");
        assert_eq!(normalize("::FFFF:203.0.113.9"), "203.0.113.9");
        assert_eq!(normalize("::1"), "127.0.0.1");
        assert_eq!(normalize("2001:db8::1"), "2001:db8::1");
    }

    #[test]
    fn test_private_ranges() {
        for private in [
            "10.0.0.5",
            "10.255.255.255",
            "172.16.0.1",
            "172.31.255.254",
            "192.168.0.1",
            "127.0.0.1",
            "localhost",
        ] {
            assert!(is_private_address(private), "{} should be private", private);
        }
        for public in ["172.15.255.255", "172.32.0.1", "203.0.113.9", "8.8.8.8", "2001:db8::1"] {
            assert!(!is_private_address(public), "{} should not be private", public);
        }
    }

    #[test]
    fn test_resolution_order() {
        let source = ClientAddress::default()
            .with_forwarded_for("203.0.113.9")
            .with_real_ip("198.51.100.7")
            .with_peer(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(classify(&source).unwrap().address, "203.0.113.9");

        let source = ClientAddress::default()
            .with_forwarded_for("  , ")
            .with_real_ip("198.51.100.7");
        assert_eq!(classify(&source).unwrap().address, "198.51.100.7");

        let source = ClientAddress::default().with_peer(IpAddr::V6(Ipv6Addr::LOCALHOST));
        let classified = classify(&source).unwrap();
        assert_eq!(classified.address, "127.0.0.1");
        assert!(classified.is_private);
    }

    #[test]
    fn test_peer_mapped_address_is_stripped() {
        let mapped = Ipv4Addr::new(203, 0, 113, 9).to_ipv6_mapped();
        let source = ClientAddress::default().with_peer(IpAddr::V6(mapped));
        assert_eq!(classify(&source).unwrap().address, "203.0.113.9");
    }

    #[test]
    fn test_unresolvable_when_no_source() {
        let err = classify(&ClientAddress::default()).unwrap_err();
        assert!(matches!(err, AttendanceError::AddressUnresolvable));

        let blank = ClientAddress::default().with_forwarded_for("").with_real_ip("   ");
        assert!(matches!(
            classify(&blank),
            Err(AttendanceError::AddressUnresolvable)
        ));
    }
}
