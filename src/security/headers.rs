//! Header manipulation for forwarded requests.
//!
//! # Responsibilities
//! - Set X-Forwarded-For to the originating client
//! - Strip hop-by-hop headers before forwarding
//!
//! # Design Decisions
//! - Any inbound X-Forwarded-For is replaced, never appended to
//! - Hop-by-hop list follows RFC 9110 section 7.6.1

use std::net::IpAddr;
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

static HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove headers that only apply to a single connection.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in Connection are hop-by-hop as well.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// Prepare inbound headers for forwarding to a backend.
pub fn prepare_forward_headers(headers: &mut HeaderMap, client_ip: IpAddr) {
    strip_hop_by_hop(headers);
    if let Ok(value) = HeaderValue::from_str(&client_ip.to_string()) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_for_replaces_inbound_value() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("1.2.3.4"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        prepare_forward_headers(&mut headers, "10.1.1.1".parse().unwrap());

        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "10.1.1.1");
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "*/*");
    }

    #[test]
    fn test_strips_connection_named_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-trace", HeaderValue::from_static("abc"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::HOST, HeaderValue::from_static("example.com"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("x-trace").is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert!(headers.get(header::HOST).is_some());
    }
}
