//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Derive the client identifier used for rate limiting
//! - Rewrite the request URI onto the chosen backend

use std::net::SocketAddr;
use axum::http::{HeaderValue, Request, Uri, uri::InvalidUri};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID generator for tower-http's request-id layers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// Rate-limit key for a peer. The port is dropped so every connection
/// from one host shares a bucket.
pub fn client_id(peer: &SocketAddr) -> String {
    peer.ip().to_string()
}

/// Absolute URI on `backend` for an inbound request URI. The backend's
/// base path is prefixed; the inbound path and query are kept.
pub fn upstream_uri(backend: &Url, original: &Uri) -> Result<Uri, InvalidUri> {
    let mut base = backend.clone();
    base.set_query(None);
    base.set_fragment(None);

    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("{}{}", base.as_str().trim_end_matches('/'), path_and_query).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let backend = Url::parse("http://127.0.0.1:9001").unwrap();
        let original: Uri = "/users/7?expand=true".parse().unwrap();

        let uri = upstream_uri(&backend, &original).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:9001/users/7?expand=true");
    }

    #[test]
    fn test_upstream_uri_prefixes_base_path() {
        let backend = Url::parse("http://svc:8000/api/").unwrap();
        let original: Uri = "/items".parse().unwrap();

        let uri = upstream_uri(&backend, &original).unwrap();
        assert_eq!(uri.to_string(), "http://svc:8000/api/items");
    }

    #[test]
    fn test_upstream_uri_for_root() {
        let backend = Url::parse("http://svc:8000").unwrap();
        let original: Uri = "/".parse().unwrap();

        assert_eq!(upstream_uri(&backend, &original).unwrap().to_string(), "http://svc:8000/");
    }

    #[test]
    fn test_client_id_ignores_port() {
        let a: SocketAddr = "192.168.1.5:50000".parse().unwrap();
        let b: SocketAddr = "192.168.1.5:50001".parse().unwrap();
        assert_eq!(client_id(&a), client_id(&b));
        assert_eq!(client_id(&a), "192.168.1.5");
    }

    #[test]
    fn test_request_ids_are_unique() {
        let mut maker = MakeRequestUuid;
        let req = Request::new(());
        let a = maker.make_request_id(&req).unwrap();
        let b = maker.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
