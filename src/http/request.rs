//! Per-request context.
//!
//! # Responsibilities
//! - Reconstruct the absolute request URL (scheme + Host + path)
//! - Assign a request ID (client supplied or UUID v4)
//! - Carry the logical path and disconnect token through the chain
//!
//! # Design Decisions
//! - Request ID assigned as early as possible for tracing
//! - The logical path is computed once, before any handler runs

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, Method, Request};
use url::Url;
use uuid::Uuid;

use crate::net::connection::DisconnectToken;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Everything a handler needs to answer one request.
pub struct RequestContext {
    /// The request as received: method, URI, headers, streaming body.
    pub request: Request<Body>,
    /// Absolute URL the request was addressed to.
    pub url: Url,
    /// Path left after stripping the reservation's authority and base path.
    pub logical_path: String,
    pub request_id: String,
    /// Fires when the client connection goes away.
    pub disconnect: DisconnectToken,
}

impl RequestContext {
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// First value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name).and_then(|v| v.to_str().ok())
    }
}

/// Rebuild the absolute URL of a request received on `local_addr`.
///
/// Uses the request-target authority when the client sent absolute-form,
/// then the `Host` header, then the socket address.
pub fn absolute_url<B>(req: &Request<B>, scheme: &str, local_addr: SocketAddr) -> Result<Url, url::ParseError> {
    let authority = match req.uri().authority() {
        Some(authority) => authority.as_str().to_string(),
        None => req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| local_addr.to_string()),
    };
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Url::parse(&format!("{}://{}{}", scheme, authority, path_and_query))
}

/// The client's `X-Request-Id`, or a fresh UUID.
pub fn request_id<B>(req: &Request<B>) -> String {
    req.headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> SocketAddr {
        "127.0.0.1:8655".parse().unwrap()
    }

    #[test]
    fn test_url_from_host_header() {
        let req = Request::builder()
            .uri("/foo/bar?x=1")
            .header("Host", "myhost:8655")
            .body(())
            .unwrap();
        let url = absolute_url(&req, "http", local()).unwrap();
        assert_eq!(url.as_str(), "http://myhost:8655/foo/bar?x=1");
    }

    #[test]
    fn test_url_from_absolute_form() {
        let req = Request::builder()
            .uri("http://other:8655/a")
            .header("Host", "ignored:1")
            .body(())
            .unwrap();
        let url = absolute_url(&req, "http", local()).unwrap();
        assert_eq!(url.host_str(), Some("other"));
    }

    #[test]
    fn test_url_falls_back_to_local_addr() {
        let req = Request::builder().uri("/x").body(()).unwrap();
        let url = absolute_url(&req, "http", local()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8655/x");
    }

    #[test]
    fn test_garbage_host_is_rejected() {
        let req = Request::builder()
            .uri("/x")
            .header("Host", "bad host:80")
            .body(())
            .unwrap();
        assert!(absolute_url(&req, "http", local()).is_err());
    }

    #[test]
    fn test_request_id_prefers_client_value() {
        let req = Request::builder()
            .header(X_REQUEST_ID, "abc-123")
            .body(())
            .unwrap();
        assert_eq!(request_id(&req), "abc-123");

        let req = Request::builder().body(()).unwrap();
        assert!(Uuid::parse_str(&request_id(&req)).is_ok());
    }
}
