//! Response handling and transformation.
//!
//! # Responsibilities
//! - Render gate errors as JSON bodies
//! - Tag proxied responses with the balancer header
//! - Strip hop-by-hop headers from backend responses

use axum::{
    Json,
    body::Body,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::security::headers::strip_hop_by_hop;

pub const X_LOAD_BALANCER: &str = "x-load-balancer";
pub const LOAD_BALANCER_NAME: &str = "loadgate";

/// JSON body for every error the gate produces itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: u16,
}

/// Build a JSON error response.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        message: message.to_string(),
        code: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

/// Prepare a backend response for the client.
pub fn finish_upstream<B>(response: axum::http::Response<B>) -> Response
where
    B: axum::body::HttpBody<Data = axum::body::Bytes> + Send + 'static,
    B::Error: Into<axum::BoxError>,
{
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    parts
        .headers
        .insert(X_LOAD_BALANCER, HeaderValue::from_static(LOAD_BALANCER_NAME));
    Response::from_parts(parts, Body::new(body))
}
