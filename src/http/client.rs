//! Outbound HTTP client shared by forwarding and health checks.

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};

/// Client able to reach both `http` and `https` backends.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build a client that speaks plain HTTP or TLS depending on the URI scheme.
pub fn upstream_client() -> UpstreamClient {
    // Fails only when a provider is already installed, which is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let connector = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();

    Client::builder(TokioExecutor::new()).build(connector)
}
