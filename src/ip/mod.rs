//! Client IP resolution.
//!
//! Extracts the originating IP for an inbound request. Forwarding headers
//! are consulted only when the transport-layer address is a configured
//! trusted proxy; otherwise they are ignored entirely, so an untrusted
//! client cannot spoof its origin by sending `X-Forwarded-For`. Candidate
//! IPs from trusted headers must be syntactically valid and outside
//! private/reserved ranges.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Forwarding headers scanned when the transport address is trusted, in
/// priority order. First valid public candidate wins.
const FORWARDED_HEADERS: &[&str] = &[
    "client-ip",
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-forwarded",
    "x-cluster-client-ip",
    "x-real-ip",
    "forwarded-for",
    "forwarded",
];

/// An inbound request as seen by the gate: transport address plus raw
/// headers. Immutable per request.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    remote_addr: IpAddr,
    headers: Vec<(String, String)>,
}

impl ClientRequest {
    /// Creates a request from the transport address and raw header pairs.
    /// Header names are stored lowercased for case-insensitive lookup.
    pub fn new<I, K, V>(remote_addr: IpAddr, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            remote_addr,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Creates a request with no headers.
    pub fn from_addr(remote_addr: IpAddr) -> Self {
        Self {
            remote_addr,
            headers: Vec::new(),
        }
    }

    /// The transport-layer peer address.
    pub fn remote_addr(&self) -> IpAddr {
        self.remote_addr
    }

    /// First value of the named header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Resolves the originating client IP for a request.
///
/// Starts from the transport address. Forwarding headers are scanned only
/// when the transport address is in `trusted_proxies`; the first
/// syntactically valid candidate outside private/reserved ranges wins.
/// Falls back to the transport address when no candidate qualifies. Pure
/// function of its inputs.
pub fn resolve_client_ip(request: &ClientRequest, trusted_proxies: &HashSet<IpAddr>) -> IpAddr {
    let transport = request.remote_addr();
    if !trusted_proxies.contains(&transport) {
        return transport;
    }

    for header in FORWARDED_HEADERS {
        let Some(value) = request.header(header) else {
            continue;
        };
        // X-Forwarded-For carries a comma-separated chain; the first entry
        // is normally the real client.
        for candidate in value.split(',') {
            if let Ok(ip) = candidate.trim().parse::<IpAddr>() {
                if !is_private_or_reserved(ip) {
                    log::debug!("Resolved client IP {ip} from trusted {header} header");
                    return ip;
                }
            }
        }
    }

    transport
}

/// Returns true when the address falls in a private, loopback, link-local,
/// or otherwise reserved range that cannot be geolocated.
///
/// Single predicate covering both families:
/// - IPv4: unspecified, loopback, RFC 1918 private, link-local, broadcast,
///   shared CGN (100.64/10), benchmarking (198.18/15), reserved (240/4)
/// - IPv6: unspecified, loopback, unique-local (fc00::/7), link-local
///   (fe80::/10)
///
/// Documentation ranges (TEST-NET) are not included; providers treat them
/// as ordinary public space.
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_or_reserved_v4(v4),
        IpAddr::V6(v6) => is_private_or_reserved_v6(v6),
    }
}

fn is_private_or_reserved_v4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        // Shared address space for carrier-grade NAT, 100.64.0.0/10
        || (octets[0] == 100 && (octets[1] & 0xC0) == 64)
        // Benchmarking, 198.18.0.0/15
        || (octets[0] == 198 && (octets[1] & 0xFE) == 18)
        // Reserved, 240.0.0.0/4 (minus broadcast, handled above)
        || (octets[0] & 0xF0) == 240
}

fn is_private_or_reserved_v6(ip: Ipv6Addr) -> bool {
    let segments = ip.segments();
    ip.is_unspecified()
        || ip.is_loopback()
        // Unique local, fc00::/7
        || (segments[0] & 0xFE00) == 0xFC00
        // Link local, fe80::/10
        || (segments[0] & 0xFFC0) == 0xFE80
}
